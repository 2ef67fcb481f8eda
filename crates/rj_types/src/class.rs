use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::ops::Deref;
use std::sync::OnceLock;

use thiserror::Error;

use crate::{DataType, TypeBindings, TypeVar, Value};

// -----------------------------------------------------------------------------
// Error

/// Errors raised while describing classes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TypeError {
    #[error("the shape of class `{0}` has already been defined")]
    AlreadyDefined(ClassRef),

    #[error("class `{class}` declares field `{field}` more than once")]
    DuplicateField { class: ClassRef, field: Box<str> },

    #[error("enum `{class}` declares constant `{constant}` more than once")]
    DuplicateConstant { class: ClassRef, constant: Box<str> },
}

// -----------------------------------------------------------------------------
// Visibility

/// Whether generic rules may instantiate a class without an explicit grant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Visibility {
    #[default]
    Public,
    /// Only rules belonging to a bundle that grants access to the class may
    /// construct it.
    Restricted,
}

// -----------------------------------------------------------------------------
// Field

/// One component of a record class.
///
/// The field type may mention the type parameters of its class; they are
/// replaced by the concrete arguments when a specific instantiation is scanned.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldInfo {
    name: Box<str>,
    ty: DataType,
    default: Option<Value>,
}

impl FieldInfo {
    /// Create a field without a default value.
    #[inline]
    pub fn new(name: &str, ty: DataType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
        }
    }

    /// Declare the value used when the member is absent from the input.
    ///
    /// A field with a default is also omitted from generated output whenever
    /// its value equals the default.
    #[inline]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn ty(&self) -> &DataType {
        &self.ty
    }

    #[inline]
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

// -----------------------------------------------------------------------------
// Shape

/// The structural kind of a class.
#[derive(Clone, Debug, PartialEq)]
pub enum ClassShape {
    /// Nothing is known about the layout; only explicit rules can handle it.
    Opaque,
    /// A fixed set of named fields, constructed from all of them at once.
    Record(Box<[FieldInfo]>),
    /// A closed set of named constants.
    Enum(Box<[Box<str>]>),
}

static OPAQUE: ClassShape = ClassShape::Opaque;

// -----------------------------------------------------------------------------
// ClassInfo

/// Reflected description of a class.
///
/// `ClassInfo` values are created through [`ClassInfo::builder`] and live for
/// the rest of the program, like any other type information. They are always
/// handled through [`ClassRef`], whose equality is identity.
///
/// The shape is set at most once and may be set after the class has been
/// declared, which is how a record refers to itself:
///
/// ```
/// use rj_types::{builtin, ClassInfo, DataType, FieldInfo};
///
/// let node = ClassInfo::builder("Node").declare();
/// let children = DataType::known(builtin::list(), [DataType::class(node)]);
/// node.define_record([
///     FieldInfo::new("name", DataType::string()),
///     FieldInfo::new("children", children),
/// ]).unwrap();
///
/// assert!(node.is_record());
/// assert_eq!(node.field_index("children"), Some(1));
/// ```
pub struct ClassInfo {
    name: Box<str>,
    params: Box<[TypeVar]>,
    supers: Box<[DataType]>,
    visibility: Visibility,
    shape: OnceLock<ClassShape>,
}

impl ClassInfo {
    /// Start describing a new class.
    #[inline]
    pub fn builder(name: &str) -> ClassBuilder {
        ClassBuilder {
            name: name.into(),
            params: Vec::new(),
            supers: Vec::new(),
            visibility: Visibility::Public,
        }
    }
}

// -----------------------------------------------------------------------------
// ClassBuilder

/// Builder for [`ClassInfo`], see [`ClassInfo::builder`].
#[must_use]
pub struct ClassBuilder {
    name: Box<str>,
    params: Vec<TypeVar>,
    supers: Vec<DataType>,
    visibility: Visibility,
}

impl ClassBuilder {
    /// Add an unbounded type parameter.
    pub fn param(mut self, name: &str) -> Self {
        self.params.push(TypeVar::new(name));
        self
    }

    /// Add a type parameter whose bindings must be accepted by every bound.
    pub fn bounded_param(mut self, name: &str, bounds: impl IntoIterator<Item = DataType>) -> Self {
        self.params.push(TypeVar::bounded(name, bounds));
        self
    }

    /// Add a direct supertype. It may mention this class's parameters.
    pub fn extends(mut self, supertype: DataType) -> Self {
        self.supers.push(supertype);
        self
    }

    /// Mark the class as [`Visibility::Restricted`].
    pub fn restricted(mut self) -> Self {
        self.visibility = Visibility::Restricted;
        self
    }

    /// Finish the declaration, leaving the shape undefined.
    ///
    /// An undefined shape reads as [`ClassShape::Opaque`] until one of the
    /// `define_*` methods of [`ClassRef`] is called.
    pub fn declare(self) -> ClassRef {
        let info = ClassInfo {
            name: self.name,
            params: self.params.into_boxed_slice(),
            supers: self.supers.into_boxed_slice(),
            visibility: self.visibility,
            shape: OnceLock::new(),
        };
        ClassRef(Box::leak(Box::new(info)))
    }

    /// Declare a class whose shape is known to be opaque.
    pub fn opaque(self) -> ClassRef {
        let class = self.declare();
        let _ = class.0.shape.set(ClassShape::Opaque);
        class
    }

    /// Declare a record class with the given fields.
    ///
    /// # Panics
    ///
    /// Panics if a field name is repeated.
    pub fn record(self, fields: impl IntoIterator<Item = FieldInfo>) -> ClassRef {
        let class = self.declare();
        if let Err(e) = class.define_record(fields) {
            panic!("{e}");
        }
        class
    }

    /// Declare an enum class with the given constants.
    ///
    /// # Panics
    ///
    /// Panics if a constant is repeated.
    pub fn enumeration<'a>(self, constants: impl IntoIterator<Item = &'a str>) -> ClassRef {
        let class = self.declare();
        if let Err(e) = class.define_enum(constants) {
            panic!("{e}");
        }
        class
    }
}

// -----------------------------------------------------------------------------
// ClassRef

/// A reference to a leaked [`ClassInfo`], compared and hashed by identity.
#[derive(Clone, Copy)]
pub struct ClassRef(&'static ClassInfo);

impl ClassRef {
    #[inline]
    pub fn name(self) -> &'static str {
        &self.0.name
    }

    #[inline]
    pub fn params(self) -> &'static [TypeVar] {
        &self.0.params
    }

    /// Direct supertypes, in declaration order. `Object` is implicit.
    #[inline]
    pub fn supers(self) -> &'static [DataType] {
        &self.0.supers
    }

    #[inline]
    pub fn visibility(self) -> Visibility {
        self.0.visibility
    }

    #[inline]
    pub fn shape(self) -> &'static ClassShape {
        self.0.shape.get().unwrap_or(&OPAQUE)
    }

    #[inline]
    pub fn is_generic(self) -> bool {
        !self.0.params.is_empty()
    }

    #[inline]
    pub fn is_record(self) -> bool {
        matches!(self.shape(), ClassShape::Record(_))
    }

    #[inline]
    pub fn is_enum(self) -> bool {
        matches!(self.shape(), ClassShape::Enum(_))
    }

    /// Record fields, or an empty slice for other shapes.
    pub fn fields(self) -> &'static [FieldInfo] {
        match self.shape() {
            ClassShape::Record(fields) => fields,
            _ => &[],
        }
    }

    pub fn field_index(self, name: &str) -> Option<usize> {
        self.fields().iter().position(|f| f.name() == name)
    }

    /// Enum constants, or an empty slice for other shapes.
    pub fn constants(self) -> &'static [Box<str>] {
        match self.shape() {
            ClassShape::Enum(constants) => constants,
            _ => &[],
        }
    }

    pub fn constant_index(self, name: &str) -> Option<usize> {
        self.constants().iter().position(|c| &**c == name)
    }

    /// Set the shape of a declared class to a record.
    pub fn define_record(
        self,
        fields: impl IntoIterator<Item = FieldInfo>,
    ) -> Result<(), TypeError> {
        let fields: Vec<FieldInfo> = fields.into_iter().collect();
        for (index, field) in fields.iter().enumerate() {
            if fields[..index].iter().any(|f| f.name == field.name) {
                return Err(TypeError::DuplicateField {
                    class: self,
                    field: field.name.clone(),
                });
            }
        }
        self.0
            .shape
            .set(ClassShape::Record(fields.into_boxed_slice()))
            .map_err(|_| TypeError::AlreadyDefined(self))
    }

    /// Set the shape of a declared class to an enum.
    pub fn define_enum<'a>(
        self,
        constants: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), TypeError> {
        let mut list: Vec<Box<str>> = Vec::new();
        for constant in constants {
            if list.iter().any(|c| &**c == constant) {
                return Err(TypeError::DuplicateConstant {
                    class: self,
                    constant: constant.into(),
                });
            }
            list.push(constant.into());
        }
        self.0
            .shape
            .set(ClassShape::Enum(list.into_boxed_slice()))
            .map_err(|_| TypeError::AlreadyDefined(self))
    }

    /// Bind this class's parameters to `args`.
    ///
    /// An empty `args` on a generic class means the class is used erased:
    /// every parameter is bound to its erasure.
    pub fn bind_params(self, args: &[DataType]) -> TypeBindings {
        let mut bindings = TypeBindings::new();
        if args.is_empty() {
            for param in self.params() {
                bindings.insert(param.name_arc(), param.erasure());
            }
        } else {
            debug_assert_eq!(args.len(), self.params().len());
            for (param, arg) in self.params().iter().zip(args) {
                bindings.insert(param.name_arc(), arg.clone());
            }
        }
        bindings
    }

    /// Returns the arguments this class (instantiated with `args`) passes to
    /// `target` along its supertype chain, if `target` is a supertype.
    ///
    /// Every class is considered a subclass of `Object`.
    pub fn supertype_args(self, args: &[DataType], target: ClassRef) -> Option<Arc<[DataType]>> {
        if self == target {
            return Some(args.into());
        }
        if target == crate::builtin::object() {
            return Some(Arc::from([]));
        }
        let bindings = self.bind_params(args);
        for supertype in self.supers() {
            if let DataType::Known(known) = supertype {
                let super_args: Vec<DataType> =
                    known.args().iter().map(|arg| arg.substitute(&bindings)).collect();
                if let Some(found) = known.class().supertype_args(&super_args, target) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Raw subclass test, ignoring type arguments.
    #[inline]
    pub fn is_subclass_of(self, target: ClassRef) -> bool {
        self.supertype_args(&[], target).is_some()
    }
}

impl Deref for ClassRef {
    type Target = ClassInfo;

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.0
    }
}

impl PartialEq for ClassRef {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self.0, other.0)
    }
}

impl Eq for ClassRef {}

impl Hash for ClassRef {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::ptr::hash(self.0, state);
    }
}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassRef({})", self.0.name)
    }
}

impl fmt::Display for ClassRef {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

#[cfg(test)]
mod tests {
    use super::{ClassInfo, ClassShape, FieldInfo, TypeError};
    use crate::{DataType, builtin};

    #[test]
    fn shape_is_set_once() {
        let class = ClassInfo::builder("Once").declare();
        assert_eq!(class.shape(), &ClassShape::Opaque);
        class.define_enum(["A", "B"]).unwrap();
        assert_eq!(class.constant_index("B"), Some(1));
        assert_eq!(class.define_enum(["C"]), Err(TypeError::AlreadyDefined(class)));
    }

    #[test]
    fn duplicate_fields_are_rejected() {
        let class = ClassInfo::builder("Dup").declare();
        let result = class.define_record([
            FieldInfo::new("a", DataType::string()),
            FieldInfo::new("a", DataType::string()),
        ]);
        assert!(matches!(result, Err(TypeError::DuplicateField { .. })));
    }

    #[test]
    fn supertype_arguments_follow_the_chain() {
        let array_list = builtin::array_list();
        let args = [DataType::string()];
        let found = array_list.supertype_args(&args, builtin::list()).unwrap();
        assert_eq!(&*found, &[DataType::string()]);
        assert!(array_list.is_subclass_of(builtin::object()));
        assert!(!builtin::list().is_subclass_of(array_list));
    }

    #[test]
    fn identity_equality() {
        let a = ClassInfo::builder("Same").declare();
        let b = ClassInfo::builder("Same").declare();
        assert_ne!(a, b);
        assert_eq!(a, a);
    }
}
