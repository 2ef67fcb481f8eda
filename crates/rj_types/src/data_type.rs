use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use crate::{ClassRef, TypeBindings, builtin};

// -----------------------------------------------------------------------------
// PrimitiveKind

/// Unboxed scalar types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Char,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 8] = [
        Self::Bool,
        Self::I8,
        Self::I16,
        Self::I32,
        Self::I64,
        Self::F32,
        Self::F64,
        Self::Char,
    ];

    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Char => "char",
        }
    }

    #[inline]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::I8 | Self::I16 | Self::I32 | Self::I64)
    }

    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    #[inline]
    pub const fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Inclusive range of an integer kind.
    pub const fn integer_range(self) -> Option<(i64, i64)> {
        match self {
            Self::I8 => Some((i8::MIN as i64, i8::MAX as i64)),
            Self::I16 => Some((i16::MIN as i64, i16::MAX as i64)),
            Self::I32 => Some((i32::MIN as i64, i32::MAX as i64)),
            Self::I64 => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }

    /// The reference class that boxes this primitive.
    pub fn boxed(self) -> ClassRef {
        match self {
            Self::Bool => builtin::boolean(),
            Self::I8 => builtin::byte(),
            Self::I16 => builtin::short(),
            Self::I32 => builtin::integer(),
            Self::I64 => builtin::long(),
            Self::F32 => builtin::float(),
            Self::F64 => builtin::double(),
            Self::Char => builtin::character(),
        }
    }

    /// The inverse of [`boxed`](Self::boxed).
    pub fn unboxed(class: ClassRef) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.boxed() == class)
    }
}

// -----------------------------------------------------------------------------
// Components

/// A class together with its type arguments.
///
/// `args` is either empty (only for non-generic classes) or has exactly one
/// entry per class parameter.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct KnownType {
    class: ClassRef,
    args: Arc<[DataType]>,
}

impl KnownType {
    #[inline]
    pub fn class(&self) -> ClassRef {
        self.class
    }

    #[inline]
    pub fn args(&self) -> &[DataType] {
        &self.args
    }

    /// Bindings of the class parameters to this type's arguments.
    #[inline]
    pub fn bindings(&self) -> TypeBindings {
        self.class.bind_params(&self.args)
    }
}

/// A named type variable with optional bounds.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct TypeVar {
    name: Arc<str>,
    bounds: Arc<[DataType]>,
}

impl TypeVar {
    #[inline]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            bounds: Arc::from([]),
        }
    }

    pub fn bounded(name: &str, bounds: impl IntoIterator<Item = DataType>) -> Self {
        Self {
            name: name.into(),
            bounds: bounds.into_iter().collect(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn name_arc(&self) -> Arc<str> {
        self.name.clone()
    }

    #[inline]
    pub fn bounds(&self) -> &[DataType] {
        &self.bounds
    }

    /// The type an erased use of this variable stands for.
    pub fn erasure(&self) -> DataType {
        match self.bounds.first() {
            Some(bound) => bound.erasure(),
            None => DataType::object(),
        }
    }
}

/// A wildcard with optional upper and lower bounds.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Wildcard {
    upper: Option<Arc<DataType>>,
    lower: Option<Arc<DataType>>,
}

impl Wildcard {
    #[inline]
    pub fn upper(&self) -> Option<&DataType> {
        self.upper.as_deref()
    }

    #[inline]
    pub fn lower(&self) -> Option<&DataType> {
        self.lower.as_deref()
    }

    /// Resolve the wildcard to a concrete upper/lower bound pair.
    pub fn capture(&self) -> CapturedBound {
        CapturedBound {
            upper: self
                .upper
                .clone()
                .unwrap_or_else(|| Arc::new(DataType::object())),
            lower: self.lower.clone(),
        }
    }
}

/// The bound pair a wildcard is captured to before matching.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct CapturedBound {
    upper: Arc<DataType>,
    lower: Option<Arc<DataType>>,
}

impl CapturedBound {
    #[inline]
    pub fn new(upper: DataType, lower: Option<DataType>) -> Self {
        Self {
            upper: Arc::new(upper),
            lower: lower.map(Arc::new),
        }
    }

    #[inline]
    pub fn upper(&self) -> &DataType {
        &self.upper
    }

    #[inline]
    pub fn lower(&self) -> Option<&DataType> {
        self.lower.as_deref()
    }
}

// -----------------------------------------------------------------------------
// RawType

/// The canonical raw representation of a known type: the type with all
/// generic arguments dropped.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum RawType {
    Primitive(PrimitiveKind),
    Array(Box<RawType>),
    Class(ClassRef),
    Null,
}

impl fmt::Display for RawType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(kind) => f.write_str(kind.name()),
            Self::Array(element) => write!(f, "[{element}]"),
            Self::Class(class) => f.write_str(class.name()),
            Self::Null => f.write_str("null"),
        }
    }
}

// -----------------------------------------------------------------------------
// DataType

/// An immutable description of a reflected type.
///
/// Cloning is cheap: nested types are shared.
///
/// # Examples
///
/// ```
/// use rj_types::{builtin, DataType, PrimitiveKind};
///
/// let list_of_strings = DataType::known(builtin::list(), [DataType::string()]);
/// assert_eq!(list_of_strings.to_string(), "List<String>");
/// assert!(list_of_strings.is_known());
///
/// let pattern = DataType::known(builtin::list(), [DataType::var("E")]);
/// assert!(!pattern.is_known());
///
/// let ints = DataType::array(DataType::primitive(PrimitiveKind::I32));
/// assert_eq!(ints.to_string(), "[i32]");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum DataType {
    Primitive(PrimitiveKind),
    Array(Arc<DataType>),
    Known(KnownType),
    Variable(TypeVar),
    Wildcard(Wildcard),
    Captured(CapturedBound),
    /// A generic class used without any arguments.
    Erased(ClassRef),
    /// The type of the `null` literal.
    Null,
}

impl DataType {
    // ------------------------------------------------------------------
    // Constructors

    #[inline]
    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self::Primitive(kind)
    }

    #[inline]
    pub fn array(element: DataType) -> Self {
        Self::Array(Arc::new(element))
    }

    /// A class instantiated with `args`.
    ///
    /// # Panics
    ///
    /// Panics if the number of arguments differs from the number of class
    /// parameters. Use [`erased`](Self::erased) for a generic class without
    /// arguments.
    pub fn known(class: ClassRef, args: impl IntoIterator<Item = DataType>) -> Self {
        let args: Arc<[DataType]> = args.into_iter().collect();
        assert_eq!(
            args.len(),
            class.params().len(),
            "class `{class}` takes {} type arguments",
            class.params().len(),
        );
        Self::Known(KnownType { class, args })
    }

    /// A non-generic class.
    #[inline]
    pub fn class(class: ClassRef) -> Self {
        Self::known(class, [])
    }

    #[inline]
    pub fn erased(class: ClassRef) -> Self {
        Self::Erased(class)
    }

    #[inline]
    pub fn var(name: &str) -> Self {
        Self::Variable(TypeVar::new(name))
    }

    #[inline]
    pub fn bounded_var(name: &str, bounds: impl IntoIterator<Item = DataType>) -> Self {
        Self::Variable(TypeVar::bounded(name, bounds))
    }

    /// The unbounded wildcard.
    #[inline]
    pub fn wildcard() -> Self {
        Self::Wildcard(Wildcard::default())
    }

    /// A wildcard accepting `upper` and its subtypes.
    #[inline]
    pub fn wildcard_below(upper: DataType) -> Self {
        Self::Wildcard(Wildcard {
            upper: Some(Arc::new(upper)),
            lower: None,
        })
    }

    /// A wildcard accepting `lower` and its supertypes.
    #[inline]
    pub fn wildcard_above(lower: DataType) -> Self {
        Self::Wildcard(Wildcard {
            upper: None,
            lower: Some(Arc::new(lower)),
        })
    }

    #[inline]
    pub fn captured(bound: CapturedBound) -> Self {
        Self::Captured(bound)
    }

    #[inline]
    pub fn object() -> Self {
        Self::class(builtin::object())
    }

    #[inline]
    pub fn string() -> Self {
        Self::class(builtin::string())
    }

    // ------------------------------------------------------------------
    // Queries

    /// Known types can be instantiated; unknown ones only take part in
    /// matching. Generic arguments of a known type must be known too.
    pub fn is_known(&self) -> bool {
        match self {
            Self::Primitive(_) | Self::Erased(_) | Self::Null => true,
            Self::Array(element) => element.is_known(),
            Self::Known(known) => known.args.iter().all(DataType::is_known),
            Self::Variable(_) | Self::Wildcard(_) | Self::Captured(_) => false,
        }
    }

    #[inline]
    pub fn is_primitive(&self) -> bool {
        matches!(self, Self::Primitive(_))
    }

    /// Whether any variable occurs in this type.
    pub fn has_variables(&self) -> bool {
        match self {
            Self::Variable(_) => true,
            Self::Primitive(_) | Self::Erased(_) | Self::Null => false,
            Self::Array(element) => element.has_variables(),
            Self::Known(known) => known.args.iter().any(DataType::has_variables),
            Self::Wildcard(w) => {
                w.upper().is_some_and(DataType::has_variables)
                    || w.lower().is_some_and(DataType::has_variables)
            }
            Self::Captured(c) => {
                c.upper().has_variables() || c.lower().is_some_and(DataType::has_variables)
            }
        }
    }

    /// The canonical raw representation, for known variants only.
    pub fn raw(&self) -> Option<RawType> {
        match self {
            Self::Primitive(kind) => Some(RawType::Primitive(*kind)),
            Self::Array(element) => element.raw().map(|raw| RawType::Array(Box::new(raw))),
            Self::Known(known) => Some(RawType::Class(known.class)),
            Self::Erased(class) => Some(RawType::Class(*class)),
            Self::Null => Some(RawType::Null),
            Self::Variable(_) | Self::Wildcard(_) | Self::Captured(_) => None,
        }
    }

    /// The class of a known or erased type.
    #[inline]
    pub fn class_ref(&self) -> Option<ClassRef> {
        match self {
            Self::Known(known) => Some(known.class),
            Self::Erased(class) => Some(*class),
            _ => None,
        }
    }

    #[inline]
    pub fn as_known(&self) -> Option<&KnownType> {
        match self {
            Self::Known(known) => Some(known),
            _ => None,
        }
    }

    /// Type arguments of a known type; empty otherwise.
    #[inline]
    pub fn type_args(&self) -> &[DataType] {
        match self {
            Self::Known(known) => &known.args,
            _ => &[],
        }
    }

    /// Element type of an array type.
    #[inline]
    pub fn element(&self) -> Option<&DataType> {
        match self {
            Self::Array(element) => Some(element),
            _ => None,
        }
    }

    /// The type with generic information dropped.
    pub fn erasure(&self) -> DataType {
        match self {
            Self::Primitive(_) | Self::Erased(_) | Self::Null => self.clone(),
            Self::Array(element) => Self::array(element.erasure()),
            Self::Known(known) if known.class.is_generic() => Self::Erased(known.class),
            Self::Known(_) => self.clone(),
            Self::Variable(var) => var.erasure(),
            Self::Wildcard(w) => w.capture().upper().erasure(),
            Self::Captured(c) => c.upper().erasure(),
        }
    }

    // ------------------------------------------------------------------
    // Substitution

    /// Replace every bound variable by its binding.
    ///
    /// # Panics
    ///
    /// Panics when a variable has no binding; callers substitute only after
    /// a successful match has bound every variable of the pattern.
    pub fn substitute(&self, bindings: &TypeBindings) -> DataType {
        match self {
            Self::Primitive(_) | Self::Erased(_) | Self::Null => self.clone(),
            Self::Array(element) => Self::array(element.substitute(bindings)),
            Self::Known(known) => {
                if known.args.is_empty() {
                    return self.clone();
                }
                Self::Known(KnownType {
                    class: known.class,
                    args: known.args.iter().map(|arg| arg.substitute(bindings)).collect(),
                })
            }
            Self::Variable(var) => match bindings.get(var.name()) {
                Some(bound) => bound.clone(),
                None => panic!("type variable `{}` has no binding", var.name()),
            },
            Self::Wildcard(w) => Self::Wildcard(Wildcard {
                upper: w.upper.as_ref().map(|u| Arc::new(u.substitute(bindings))),
                lower: w.lower.as_ref().map(|l| Arc::new(l.substitute(bindings))),
            }),
            Self::Captured(c) => Self::Captured(CapturedBound {
                upper: Arc::new(c.upper.substitute(bindings)),
                lower: c.lower.as_ref().map(|l| Arc::new(l.substitute(bindings))),
            }),
        }
    }

    /// Collect the names of all variables occurring in this type.
    pub fn variables(&self) -> Vec<Arc<str>> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables(&self, out: &mut Vec<Arc<str>>) {
        match self {
            Self::Primitive(_) | Self::Erased(_) | Self::Null => {}
            Self::Array(element) => element.collect_variables(out),
            Self::Known(known) => known.args.iter().for_each(|a| a.collect_variables(out)),
            Self::Variable(var) => {
                if !out.iter().any(|name| **name == *var.name) {
                    out.push(var.name.clone());
                }
            }
            Self::Wildcard(w) => {
                if let Some(upper) = w.upper() {
                    upper.collect_variables(out);
                }
                if let Some(lower) = w.lower() {
                    lower.collect_variables(out);
                }
            }
            Self::Captured(c) => {
                c.upper().collect_variables(out);
                if let Some(lower) = c.lower() {
                    lower.collect_variables(out);
                }
            }
        }
    }
}

impl From<PrimitiveKind> for DataType {
    #[inline]
    fn from(kind: PrimitiveKind) -> Self {
        Self::Primitive(kind)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(kind) => f.write_str(kind.name()),
            Self::Array(element) => write!(f, "[{element}]"),
            Self::Known(known) => {
                f.write_str(known.class.name())?;
                if let Some((first, rest)) = known.args.split_first() {
                    write!(f, "<{first}")?;
                    for arg in rest {
                        write!(f, ", {arg}")?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
            Self::Variable(var) => f.write_str(var.name()),
            Self::Wildcard(w) => {
                f.write_str("?")?;
                if let Some(upper) = w.upper() {
                    write!(f, " <: {upper}")?;
                }
                if let Some(lower) = w.lower() {
                    write!(f, " :> {lower}")?;
                }
                Ok(())
            }
            Self::Captured(c) => {
                write!(f, "capture<{}", c.upper())?;
                if let Some(lower) = c.lower() {
                    write!(f, " :> {lower}")?;
                }
                f.write_str(">")
            }
            Self::Erased(class) => write!(f, "{class}<erased>"),
            Self::Null => f.write_str("null"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DataType, PrimitiveKind, RawType};
    use crate::{TypeBindings, builtin};

    #[test]
    fn display_forms() {
        let map = DataType::known(
            builtin::map(),
            [DataType::string(), DataType::array(PrimitiveKind::I64.into())],
        );
        assert_eq!(map.to_string(), "Map<String, [i64]>");
        assert_eq!(DataType::wildcard_below(DataType::string()).to_string(), "? <: String");
        assert_eq!(DataType::erased(builtin::list()).to_string(), "List<erased>");
    }

    #[test]
    fn raw_representation() {
        let list = DataType::known(builtin::list(), [DataType::string()]);
        assert_eq!(list.raw(), Some(RawType::Class(builtin::list())));
        assert_eq!(DataType::var("T").raw(), None);
        let nested = DataType::array(DataType::array(PrimitiveKind::Bool.into()));
        assert_eq!(nested.raw().unwrap().to_string(), "[[bool]]");
    }

    #[test]
    fn substitution_reaches_nested_positions() {
        let mut bindings = TypeBindings::new();
        bindings.insert("E".into(), DataType::string());
        let pattern = DataType::array(DataType::known(
            builtin::list(),
            [DataType::wildcard_below(DataType::var("E"))],
        ));
        let result = pattern.substitute(&bindings);
        assert!(!result.has_variables());
        assert_eq!(result.to_string(), "[List<? <: String>]");
    }

    #[test]
    #[should_panic(expected = "has no binding")]
    fn unbound_substitution_panics() {
        DataType::var("Q").substitute(&TypeBindings::new());
    }

    #[test]
    fn erasure_drops_arguments() {
        let list = DataType::known(builtin::list(), [DataType::string()]);
        assert_eq!(list.erasure(), DataType::erased(builtin::list()));
        assert_eq!(DataType::var("T").erasure(), DataType::object());
        let bounded = DataType::bounded_var("N", [DataType::class(builtin::number())]);
        assert_eq!(bounded.erasure(), DataType::class(builtin::number()));
    }

    #[test]
    fn boxing_round_trips() {
        for kind in PrimitiveKind::ALL {
            assert_eq!(PrimitiveKind::unboxed(kind.boxed()), Some(kind));
        }
    }
}
