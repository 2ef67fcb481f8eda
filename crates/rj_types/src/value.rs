use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::{Any, type_name};
use core::fmt;

use crate::ClassRef;

// -----------------------------------------------------------------------------
// CustomValue

/// A user value carried opaquely through the codec.
///
/// Custom values only appear behind conversion nodes, which translate them to
/// and from a representation the codec knows how to read and write.
///
/// Implemented for every `Any + Debug + PartialEq + Send + Sync` type.
pub trait CustomValue: Any + fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;

    fn dyn_eq(&self, other: &dyn CustomValue) -> bool;

    fn type_name(&self) -> &'static str;
}

impl<T: Any + fmt::Debug + PartialEq + Send + Sync> CustomValue for T {
    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn CustomValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }

    #[inline]
    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }
}

/// Shared handle to a [`CustomValue`].
#[derive(Clone)]
pub struct CustomRef(Arc<dyn CustomValue>);

impl CustomRef {
    #[inline]
    pub fn new<T: CustomValue>(value: T) -> Self {
        Self(Arc::new(value))
    }

    #[inline]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref()
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.0.type_name()
    }
}

impl PartialEq for CustomRef {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.0.dyn_eq(&*other.0)
    }
}

impl fmt::Debug for CustomRef {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

// -----------------------------------------------------------------------------
// EnumValue

/// One constant of an enum class.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnumValue {
    class: ClassRef,
    ordinal: usize,
}

impl EnumValue {
    /// Look up the constant called `name`.
    pub fn new(class: ClassRef, name: &str) -> Option<Self> {
        class
            .constant_index(name)
            .map(|ordinal| Self { class, ordinal })
    }

    /// # Panics
    ///
    /// Panics if `ordinal` is out of range for `class`.
    pub fn from_ordinal(class: ClassRef, ordinal: usize) -> Self {
        assert!(
            ordinal < class.constants().len(),
            "enum `{class}` has no constant #{ordinal}"
        );
        Self { class, ordinal }
    }

    #[inline]
    pub fn class(&self) -> ClassRef {
        self.class
    }

    #[inline]
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        &self.class.constants()[self.ordinal]
    }
}

impl fmt::Debug for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.class, self.name())
    }
}

// -----------------------------------------------------------------------------
// Record

/// An instance of a record class: one value per field, in declaration order.
#[derive(Clone, PartialEq)]
pub struct Record {
    class: ClassRef,
    fields: Arc<[Value]>,
}

impl Record {
    /// # Panics
    ///
    /// Panics if the number of values differs from the number of fields.
    pub fn new(class: ClassRef, fields: Vec<Value>) -> Self {
        assert_eq!(
            fields.len(),
            class.fields().len(),
            "record `{class}` has {} fields",
            class.fields().len(),
        );
        Self {
            class,
            fields: fields.into(),
        }
    }

    #[inline]
    pub fn class(&self) -> ClassRef {
        self.class
    }

    #[inline]
    pub fn fields(&self) -> &[Value] {
        &self.fields
    }

    #[inline]
    pub fn field(&self, index: usize) -> Option<&Value> {
        self.fields.get(index)
    }

    /// The value of the field called `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.class
            .field_index(name)
            .and_then(|index| self.fields.get(index))
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(self.class.name());
        for (field, value) in self.class.fields().iter().zip(self.fields.iter()) {
            s.field(field.name(), value);
        }
        s.finish()
    }
}

// -----------------------------------------------------------------------------
// Value

/// A dynamic in-memory value.
///
/// Values are what parsers produce and generators consume. Equality is
/// structural; custom values compare through their own `PartialEq`.
///
/// Containers are shared, so cloning a value never copies its elements.
/// [`Arc::make_mut`] gives in-place access to a uniquely held list or map.
///
/// # Examples
///
/// ```
/// use rj_types::Value;
///
/// let list = Value::list(vec![Value::from(1), Value::from("two")]);
/// assert_eq!(list.as_list().map(|l| l.len()), Some(2));
/// assert_eq!(Value::from(true).as_bool(), Some(true));
/// assert_eq!(Value::none(), Value::Optional(None));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Char(char),
    Str(Arc<str>),
    /// An arbitrary precision number, kept as its JSON numeral.
    Decimal(Arc<str>),
    Enum(EnumValue),
    List(Arc<Vec<Value>>),
    /// Key/value pairs in insertion order.
    Map(Arc<Vec<(Value, Value)>>),
    Record(Record),
    Optional(Option<Box<Value>>),
    Custom(CustomRef),
}

impl Value {
    #[inline]
    pub fn str(s: &str) -> Self {
        Self::Str(s.into())
    }

    #[inline]
    pub fn decimal(numeral: &str) -> Self {
        Self::Decimal(numeral.into())
    }

    #[inline]
    pub fn list(items: Vec<Value>) -> Self {
        Self::List(Arc::new(items))
    }

    #[inline]
    pub fn map(entries: Vec<(Value, Value)>) -> Self {
        Self::Map(Arc::new(entries))
    }

    #[inline]
    pub fn some(value: Value) -> Self {
        Self::Optional(Some(Box::new(value)))
    }

    #[inline]
    pub fn none() -> Self {
        Self::Optional(None)
    }

    #[inline]
    pub fn custom<T: CustomValue>(value: T) -> Self {
        Self::Custom(CustomRef::new(value))
    }

    /// A short name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Char(_) => "char",
            Self::Str(_) => "string",
            Self::Decimal(_) => "decimal",
            Self::Enum(_) => "enum",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Record(_) => "record",
            Self::Optional(_) => "optional",
            Self::Custom(_) => "custom",
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    #[inline]
    pub fn as_char(&self) -> Option<char> {
        match self {
            Self::Char(c) => Some(*c),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    pub fn as_decimal(&self) -> Option<&str> {
        match self {
            Self::Decimal(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    pub fn as_enum(&self) -> Option<EnumValue> {
        match self {
            Self::Enum(e) => Some(*e),
            _ => None,
        }
    }

    #[inline]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    #[inline]
    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    #[inline]
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    /// The content of an optional; `None` for empty optionals and other
    /// variants alike.
    #[inline]
    pub fn as_present(&self) -> Option<&Value> {
        match self {
            Self::Optional(inner) => inner.as_deref(),
            _ => None,
        }
    }

    #[inline]
    pub fn is_empty_optional(&self) -> bool {
        matches!(self, Self::Optional(None))
    }

    #[inline]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Custom(custom) => custom.downcast_ref(),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    #[inline]
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    #[inline]
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    #[inline]
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<f64> for Value {
    #[inline]
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<char> for Value {
    #[inline]
    fn from(value: char) -> Self {
        Self::Char(value)
    }
}

impl From<&str> for Value {
    #[inline]
    fn from(value: &str) -> Self {
        Self::Str(value.into())
    }
}

impl From<String> for Value {
    #[inline]
    fn from(value: String) -> Self {
        Self::Str(value.into())
    }
}

impl From<EnumValue> for Value {
    #[inline]
    fn from(value: EnumValue) -> Self {
        Self::Enum(value)
    }
}

impl From<Record> for Value {
    #[inline]
    fn from(value: Record) -> Self {
        Self::Record(value)
    }
}

impl From<Vec<Value>> for Value {
    #[inline]
    fn from(value: Vec<Value>) -> Self {
        Self::list(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{EnumValue, Record, Value};
    use crate::{ClassInfo, DataType, FieldInfo};

    #[derive(Debug, PartialEq)]
    struct Path(&'static str);

    #[test]
    fn custom_values_compare_by_content() {
        let a = Value::custom(Path("/entities"));
        let b = Value::custom(Path("/entities"));
        let c = Value::custom(7_u32);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.downcast_ref::<Path>(), Some(&Path("/entities")));
        assert_eq!(c.downcast_ref::<Path>(), None);
    }

    #[test]
    fn enum_constants_by_name() {
        let color = ClassInfo::builder("Color").enumeration(["RED", "GREEN"]);
        let green = EnumValue::new(color, "GREEN").unwrap();
        assert_eq!(green.ordinal(), 1);
        assert_eq!(green.name(), "GREEN");
        assert!(EnumValue::new(color, "BLUE").is_none());
        assert_eq!(format!("{green:?}"), "Color::GREEN");
    }

    #[test]
    fn record_fields_by_name() {
        let point = ClassInfo::builder("Point").record([
            FieldInfo::new("x", DataType::primitive(crate::PrimitiveKind::I32)),
            FieldInfo::new("y", DataType::primitive(crate::PrimitiveKind::I32)),
        ]);
        let record = Record::new(point, vec![Value::from(1), Value::from(2)]);
        assert_eq!(record.get("y"), Some(&Value::Int(2)));
        assert_eq!(record.get("z"), None);
        assert_eq!(format!("{record:?}"), "Point { x: Int(1), y: Int(2) }");
    }

    #[test]
    #[should_panic(expected = "has 1 fields")]
    fn record_arity_is_checked() {
        let single = ClassInfo::builder("Single").record([FieldInfo::new("a", DataType::string())]);
        Record::new(single, Vec::new());
    }
}
