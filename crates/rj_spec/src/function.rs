//! Callables carried by spec nodes, together with their declared types.
//!
//! Every function a node holds is a [`TypedFn`]: the closure plus a
//! [`Signature`]. Node constructors compare signatures against the types of
//! neighbouring nodes once, so calls never re-check anything.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use rj_types::{DataType, TypeBindings, Value};
use thiserror::Error;

use crate::Cursor;

// -----------------------------------------------------------------------------
// CallError

/// A node function refused its input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct CallError(Box<str>);

impl CallError {
    #[inline]
    pub fn new(message: impl fmt::Display) -> Self {
        Self(alloc::format!("{message}").into_boxed_str())
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

pub type CallResult<T = Value> = Result<T, CallError>;

// -----------------------------------------------------------------------------
// Signature

/// Declared parameter and return types of a [`TypedFn`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    params: Box<[DataType]>,
    ret: DataType,
}

impl Signature {
    pub fn new(params: impl IntoIterator<Item = DataType>, ret: DataType) -> Self {
        Self {
            params: params.into_iter().collect(),
            ret,
        }
    }

    #[inline]
    pub fn params(&self) -> &[DataType] {
        &self.params
    }

    #[inline]
    pub fn param(&self, index: usize) -> &DataType {
        &self.params[index]
    }

    #[inline]
    pub fn ret(&self) -> &DataType {
        &self.ret
    }

    pub fn substitute(&self, bindings: &TypeBindings) -> Self {
        Self {
            params: self.params.iter().map(|p| p.substitute(bindings)).collect(),
            ret: self.ret.substitute(bindings),
        }
    }

    #[inline]
    pub fn has_variables(&self) -> bool {
        self.ret.has_variables() || self.params.iter().any(DataType::has_variables)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        write!(f, ") -> {}", self.ret)
    }
}

// -----------------------------------------------------------------------------
// TypedFn

/// A shared closure with its declared [`Signature`].
pub struct TypedFn<F: ?Sized> {
    signature: Signature,
    f: Arc<F>,
}

impl<F: ?Sized> TypedFn<F> {
    #[inline]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    #[inline]
    pub fn param(&self, index: usize) -> &DataType {
        self.signature.param(index)
    }

    #[inline]
    pub fn ret(&self) -> &DataType {
        self.signature.ret()
    }

    /// The same closure with a specialized signature.
    pub fn substitute(&self, bindings: &TypeBindings) -> Self {
        Self {
            signature: self.signature.substitute(bindings),
            f: self.f.clone(),
        }
    }
}

impl<F: ?Sized> Clone for TypedFn<F> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            signature: self.signature.clone(),
            f: self.f.clone(),
        }
    }
}

impl<F: ?Sized> fmt::Debug for TypedFn<F> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn{:?}", self.signature)
    }
}

pub type SupplierFn = dyn Fn() -> CallResult + Send + Sync;
pub type FunctionFn = dyn Fn(Value) -> CallResult + Send + Sync;
pub type GetterFn = dyn Fn(&Value) -> CallResult + Send + Sync;
pub type PredicateFn = dyn Fn(&Value) -> bool + Send + Sync;
pub type BiFunctionFn = dyn Fn(Value, Value) -> CallResult + Send + Sync;
pub type TriFunctionFn = dyn Fn(Value, Value, Value) -> CallResult + Send + Sync;
pub type ConstructorFn = dyn Fn(Vec<Value>) -> CallResult + Send + Sync;
pub type EmitFn = dyn Fn(&Value) -> CallResult<Box<dyn Cursor>> + Send + Sync;

/// Produces a value from nothing.
pub type Supplier = TypedFn<SupplierFn>;
/// Consumes a value and produces another.
pub type Function = TypedFn<FunctionFn>;
/// Reads a value out of a borrowed one, such as a record field.
pub type Getter = TypedFn<GetterFn>;
/// Tests a borrowed value.
pub type Predicate = TypedFn<PredicateFn>;
pub type BiFunction = TypedFn<BiFunctionFn>;
pub type TriFunction = TypedFn<TriFunctionFn>;
/// Builds a value from all its components at once.
pub type Constructor = TypedFn<ConstructorFn>;
/// Starts a [`Cursor`] over the elements of a container.
pub type Emit = TypedFn<EmitFn>;

macro_rules! typed_fn_impl {
    ($alias:ident, $fn_ty:ident, ($($arg:ident: $arg_ty:ty),*) -> $out:ty, [$($param:ident),*]) => {
        impl $alias {
            #[inline]
            pub fn new(
                $($param: DataType,)*
                ret: DataType,
                f: impl Fn($($arg_ty),*) -> $out + Send + Sync + 'static,
            ) -> Self {
                Self {
                    signature: Signature::new([$($param),*], ret),
                    f: Arc::new(f),
                }
            }

            #[inline]
            pub fn call(&self, $($arg: $arg_ty),*) -> $out {
                (self.f)($($arg),*)
            }

            /// The closure, for callers that keep it apart from its signature.
            #[inline]
            pub fn function(&self) -> &Arc<$fn_ty> {
                &self.f
            }
        }
    };
}

typed_fn_impl!(Supplier, SupplierFn, () -> CallResult, []);
typed_fn_impl!(Function, FunctionFn, (value: Value) -> CallResult, [param]);
typed_fn_impl!(Getter, GetterFn, (value: &Value) -> CallResult, [param]);
typed_fn_impl!(Predicate, PredicateFn, (value: &Value) -> bool, [param]);
typed_fn_impl!(BiFunction, BiFunctionFn, (a: Value, b: Value) -> CallResult, [first, second]);
typed_fn_impl!(
    TriFunction,
    TriFunctionFn,
    (a: Value, b: Value, c: Value) -> CallResult,
    [first, second, third]
);
typed_fn_impl!(Emit, EmitFn, (value: &Value) -> CallResult<Box<dyn Cursor>>, [param]);

impl Constructor {
    /// A constructor taking one argument per entry of `params`.
    #[inline]
    pub fn new(
        params: impl IntoIterator<Item = DataType>,
        ret: DataType,
        f: impl Fn(Vec<Value>) -> CallResult + Send + Sync + 'static,
    ) -> Self {
        Self {
            signature: Signature::new(params, ret),
            f: Arc::new(f),
        }
    }

    #[inline]
    pub fn call(&self, args: Vec<Value>) -> CallResult {
        (self.f)(args)
    }

    #[inline]
    pub fn function(&self) -> &Arc<ConstructorFn> {
        &self.f
    }
}

#[cfg(test)]
mod tests {
    use rj_types::{DataType, PrimitiveKind, TypeBindings, Value};

    use super::{CallError, Function, Supplier};

    #[test]
    fn calls_and_signatures() {
        let double = Function::new(
            PrimitiveKind::I64.into(),
            PrimitiveKind::I64.into(),
            |v| match v {
                Value::Int(i) => Ok(Value::Int(i * 2)),
                other => Err(CallError::new(format_args!("not an int: {}", other.kind()))),
            },
        );
        assert_eq!(double.call(Value::Int(4)), Ok(Value::Int(8)));
        assert_eq!(
            double.call(Value::Null).unwrap_err().message(),
            "not an int: null"
        );
        assert_eq!(format!("{double:?}"), "fn(i64) -> i64");
    }

    #[test]
    fn substitution_keeps_the_closure() {
        let make = Supplier::new(DataType::var("T"), || Ok(Value::Null));
        let mut bindings = TypeBindings::new();
        bindings.insert("T".into(), DataType::string());
        let specialized = make.substitute(&bindings);
        assert_eq!(specialized.ret(), &DataType::string());
        assert!(!specialized.signature().has_variables());
        assert_eq!(specialized.call(), Ok(Value::Null));
    }
}
