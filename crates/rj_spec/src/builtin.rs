//! The bundle every scanner falls back to.
//!
//! Container rules describe their children with the pattern's variables;
//! the scanner substitutes the bindings of the match afterwards.

use alloc::vec::Vec;

use rj_types::{
    ClassRef, DataType, PrimitiveKind, Record, TypeBindings, Value, Visibility, builtin,
};

use crate::{
    Accumulator, BuildError, Bundle, CallError, CallResult, Constructor, Directive, Emitter,
    Function, Getter, MapAccumulator, MapEmitter, Member, Predicate, RuleContext, Spec, SpecNode,
    Supplier,
};

/// Name of the built-in bundle.
pub const BUILTIN: &str = "builtin";

/// Directives for primitives, boxed primitives, strings, big numbers, enums,
/// arrays, lists, sets, maps, optionals and records.
pub fn bundle() -> Bundle {
    Bundle::new(BUILTIN)
        .directive(
            Directive::new("primitive", DataType::var("T"), primitive)
                .guard(|ty, _| ty.is_primitive()),
        )
        .directive(
            Directive::new("boxed", DataType::object(), boxed)
                .subtypes()
                .guard(|ty, _| {
                    ty.as_known()
                        .is_some_and(|k| PrimitiveKind::unboxed(k.class()).is_some())
                }),
        )
        .directive(Directive::new("string", DataType::string(), |_, _| {
            Ok(SpecNode::string())
        }))
        .directive(Directive::new(
            "big integer",
            DataType::class(builtin::big_integer()),
            |_, _| Ok(SpecNode::big_integer()),
        ))
        .directive(Directive::new(
            "big decimal",
            DataType::class(builtin::big_decimal()),
            |_, _| Ok(SpecNode::big_decimal()),
        ))
        .directive(
            Directive::new("enum", DataType::object(), enumeration)
                .subtypes()
                .guard(|ty, _| ty.class_ref().is_some_and(ClassRef::is_enum)),
        )
        .directive(Directive::new(
            "array",
            DataType::array(DataType::var("T")),
            array,
        ))
        .directive(Directive::new("set", collection_pattern(builtin::set()), set).subtypes())
        .directive(Directive::new("list", collection_pattern(builtin::list()), list).subtypes())
        .directive(
            Directive::new("string-keyed map", map_pattern(), uniform_map)
                .subtypes()
                .guard(|_, bindings| bindings.get("K").is_some_and(is_name_type)),
        )
        .directive(Directive::new("map", map_pattern(), entry_array).subtypes())
        .directive(Directive::new("optional", optional_pattern(), optional).subtypes())
        .directive(
            Directive::new("record", DataType::object(), record)
                .subtypes()
                .guard(|ty, _| ty.class_ref().is_some_and(ClassRef::is_record)),
        )
}

// -----------------------------------------------------------------------------
// Patterns

fn collection_pattern(class: ClassRef) -> DataType {
    DataType::known(class, [DataType::var("E")])
}

fn map_pattern() -> DataType {
    DataType::known(builtin::map(), [DataType::var("K"), DataType::var("V")])
}

fn optional_pattern() -> DataType {
    DataType::known(builtin::optional(), [DataType::var("T")])
}

/// Types whose values are written as JSON strings.
fn is_name_type(ty: &DataType) -> bool {
    *ty == DataType::string()
        || ty
            .class_ref()
            .is_some_and(|class| class.is_enum() || class == builtin::character())
}

// -----------------------------------------------------------------------------
// Scalars

type RuleResult = Result<Spec, BuildError>;

fn primitive(_: &RuleContext<'_>, ty: &DataType) -> RuleResult {
    Ok(match ty {
        DataType::Primitive(PrimitiveKind::Bool) => SpecNode::boolean(false),
        DataType::Primitive(PrimitiveKind::Char) => SpecNode::character(false),
        DataType::Primitive(kind) => SpecNode::number(*kind),
        _ => unreachable!("guarded by `is_primitive`"),
    })
}

fn boxed(_: &RuleContext<'_>, ty: &DataType) -> RuleResult {
    let kind = ty.class_ref().and_then(PrimitiveKind::unboxed);
    Ok(match kind {
        Some(PrimitiveKind::Bool) => SpecNode::boolean(true),
        Some(PrimitiveKind::Char) => SpecNode::character(true),
        Some(kind) => SpecNode::boxed_number(kind),
        None => unreachable!("guarded by `PrimitiveKind::unboxed`"),
    })
}

fn enumeration(_: &RuleContext<'_>, ty: &DataType) -> RuleResult {
    match ty.class_ref() {
        Some(class) => SpecNode::enumeration(class),
        None => unreachable!("guarded by `is_enum`"),
    }
}

// -----------------------------------------------------------------------------
// Containers

fn sequence(ty: &DataType, element: &DataType, accumulator: Accumulator) -> RuleResult {
    SpecNode::array(
        ty.clone(),
        SpecNode::type_ref(element.clone()),
        accumulator,
        Emitter::list(ty, element),
    )
}

fn array(_: &RuleContext<'_>, ty: &DataType) -> RuleResult {
    let element = DataType::var("T");
    sequence(ty, &element, Accumulator::list(ty, &element))
}

fn list(_: &RuleContext<'_>, ty: &DataType) -> RuleResult {
    let element = DataType::var("E");
    sequence(ty, &element, Accumulator::list(ty, &element))
}

fn set(_: &RuleContext<'_>, ty: &DataType) -> RuleResult {
    let element = DataType::var("E");
    sequence(ty, &element, Accumulator::set(ty, &element))
}

fn uniform_map(_: &RuleContext<'_>, ty: &DataType) -> RuleResult {
    let (key, value) = (DataType::var("K"), DataType::var("V"));
    SpecNode::uniform_map(
        ty.clone(),
        SpecNode::type_ref(key.clone()),
        SpecNode::type_ref(value.clone()),
        MapAccumulator::map(ty, &key, &value),
        MapEmitter::map(ty, &key, &value),
    )
}

/// Maps whose keys cannot be member names become arrays of `Entry` records.
fn entry_array(_: &RuleContext<'_>, ty: &DataType) -> RuleResult {
    let entry = DataType::known(builtin::entry(), [DataType::var("K"), DataType::var("V")]);
    SpecNode::array(
        ty.clone(),
        SpecNode::type_ref(entry.clone()),
        Accumulator::map_entries(ty, &entry),
        Emitter::map_entries(ty, &entry),
    )
}

// -----------------------------------------------------------------------------
// Optionals

fn unwrap_optional(value: Value) -> CallResult {
    match value {
        Value::Optional(Some(inner)) => Ok(*inner),
        Value::Optional(None) => Err(CallError::new("the optional is empty")),
        other => Err(CallError::new(format_args!(
            "expected an optional, found {}",
            other.kind()
        ))),
    }
}

/// A standalone optional is `null` when empty.
fn optional(_: &RuleContext<'_>, ty: &DataType) -> RuleResult {
    let inner = DataType::var("T");
    SpecNode::converted(
        ty.clone(),
        SpecNode::nullable(SpecNode::type_ref(inner.clone()))?,
        Function::new(inner.clone(), ty.clone(), |value| {
            Ok(match value {
                Value::Null => Value::none(),
                value => Value::some(value),
            })
        }),
        Function::new(ty.clone(), inner, |value| match value {
            Value::Optional(None) => Ok(Value::Null),
            value => unwrap_optional(value),
        }),
    )
}

/// An optional record field is an optional member: absent when empty.
fn optional_member(ty: &DataType) -> RuleResult {
    let inner = ty
        .type_args()
        .first()
        .cloned()
        .unwrap_or_else(DataType::object);
    let present = SpecNode::converted(
        ty.clone(),
        SpecNode::type_ref(inner.clone()),
        Function::new(inner.clone(), ty.clone(), |value| Ok(Value::some(value))),
        Function::new(ty.clone(), inner, unwrap_optional),
    )?;
    let absent = SpecNode::computed(Supplier::new(ty.clone(), || Ok(Value::none())));
    SpecNode::maybe_absent(
        ty.clone(),
        present,
        absent,
        Predicate::new(
            ty.clone(),
            DataType::primitive(PrimitiveKind::Bool),
            |value: &Value| !value.is_empty_optional(),
        ),
    )
}

/// A field with a default is filled in when absent and left out when equal
/// to the default.
fn defaulted_member(ty: &DataType, default: &Value) -> RuleResult {
    let (fill, compare) = (default.clone(), default.clone());
    SpecNode::maybe_absent(
        ty.clone(),
        SpecNode::type_ref(ty.clone()),
        SpecNode::computed(Supplier::new(ty.clone(), move || Ok(fill.clone()))),
        Predicate::new(
            ty.clone(),
            DataType::primitive(PrimitiveKind::Bool),
            move |value: &Value| *value != compare,
        ),
    )
}

// -----------------------------------------------------------------------------
// Records

fn class_bindings(ty: &DataType, class: ClassRef) -> TypeBindings {
    match ty.as_known() {
        Some(known) => known.bindings(),
        None => class.bind_params(&[]),
    }
}

fn record(cx: &RuleContext<'_>, ty: &DataType) -> RuleResult {
    let Some(class) = ty.class_ref() else {
        unreachable!("guarded by `is_record`")
    };
    if class.visibility() == Visibility::Restricted && !cx.is_granted(class) {
        return Err(BuildError::AccessDenied(class));
    }
    let bindings = class_bindings(ty, class);
    let fields = class.fields();

    let mut members = Vec::with_capacity(fields.len());
    let mut phantoms = Vec::new();
    for (index, field) in fields.iter().enumerate() {
        let field_ty = field.ty().substitute(&bindings);
        let field_class = field_ty.class_ref();
        let spec = if let Some(spec) = cx.field_override(class, field.name()) {
            spec.clone()
        } else if field_class == Some(builtin::phantom()) {
            phantoms.push(index);
            continue;
        } else if field_class == Some(builtin::optional()) {
            optional_member(&field_ty)?
        } else if let Some(default) = field.default() {
            defaulted_member(&field_ty, default)?
        } else {
            SpecNode::type_ref(field_ty.clone())
        };
        let accessor = Getter::new(ty.clone(), field_ty, move |value| match value {
            Value::Record(record) => record.field(index).cloned().ok_or_else(|| {
                let class = record.class();
                CallError::new(format_args!("record `{class}` has no field {index}"))
            }),
            other => Err(CallError::new(format_args!(
                "expected a record, found {}",
                other.kind()
            ))),
        });
        members.push(Member::new(field.name(), spec, accessor));
    }

    let params: Vec<DataType> = members
        .iter()
        .map(|m| m.spec().data_type().clone())
        .collect();
    let count = fields.len();
    let finisher = Constructor::new(params, ty.clone(), move |args| {
        let mut args = args.into_iter();
        let mut values = Vec::with_capacity(count);
        for index in 0..count {
            if phantoms.contains(&index) {
                values.push(Value::none());
            } else {
                values.push(
                    args.next()
                        .ok_or_else(|| CallError::new("too few member values"))?,
                );
            }
        }
        Ok(Value::Record(Record::new(class, values)))
    });
    SpecNode::object(ty.clone(), members, finisher)
}

#[cfg(test)]
mod tests {
    use rj_types::{ClassInfo, DataType, FieldInfo, PrimitiveKind, Value, builtin};

    use super::bundle;
    use crate::{CodecConfig, NodeKind, TypeScanner};

    fn directive_for(ty: &DataType) -> String {
        let bundle = bundle();
        let (directive, _) = bundle.find(ty).unwrap();
        directive.name().to_owned()
    }

    #[test]
    fn types_find_their_directive() {
        let color = ClassInfo::builder("Color").enumeration(["RED", "GREEN"]);
        let point =
            ClassInfo::builder("Point").record([FieldInfo::new("x", PrimitiveKind::I32.into())]);
        let string = DataType::string();
        let int = DataType::class(builtin::integer());

        assert_eq!(directive_for(&PrimitiveKind::F64.into()), "primitive");
        assert_eq!(directive_for(&int), "boxed");
        assert_eq!(directive_for(&string), "string");
        assert_eq!(directive_for(&DataType::class(color)), "enum");
        assert_eq!(
            directive_for(&DataType::array(PrimitiveKind::I8.into())),
            "array"
        );
        assert_eq!(
            directive_for(&DataType::known(builtin::set(), [string.clone()])),
            "set"
        );
        let array_list = DataType::known(builtin::array_list(), [string.clone()]);
        assert_eq!(directive_for(&array_list), "list");
        assert_eq!(
            directive_for(&DataType::known(
                builtin::map(),
                [DataType::class(color), int.clone()]
            )),
            "string-keyed map"
        );
        assert_eq!(
            directive_for(&DataType::known(builtin::map(), [int.clone(), int])),
            "map"
        );
        assert_eq!(
            directive_for(&DataType::known(builtin::optional(), [string])),
            "optional"
        );
        assert_eq!(directive_for(&DataType::class(point)), "record");
        assert!(bundle().find(&DataType::object()).is_none());
    }

    #[test]
    fn record_members_follow_field_kinds() {
        let settings = ClassInfo::builder("Settings").record([
            FieldInfo::new("name", DataType::string()),
            FieldInfo::new("limit", PrimitiveKind::I32.into()).with_default(Value::Int(10)),
            FieldInfo::new(
                "note",
                DataType::known(builtin::optional(), [DataType::string()]),
            ),
            FieldInfo::new(
                "cache",
                DataType::known(builtin::phantom(), [DataType::string()]),
            ),
        ]);
        let ty = DataType::class(settings);
        let mut scanner = TypeScanner::new(CodecConfig::new().shallow_scan(true));
        scanner.scan(&ty).unwrap();
        let map = scanner.build().unwrap();
        let spec = map.get(&ty).unwrap();
        let NodeKind::Object(object) = spec.kind() else {
            panic!("not an object: {spec:?}")
        };
        let names: Vec<&str> = object.members().iter().map(|m| m.name()).collect();
        assert_eq!(names, ["name", "limit", "note"]);
        assert!(matches!(
            object.members()[0].spec().kind(),
            NodeKind::TypeRef(_)
        ));
        assert!(matches!(
            object.members()[1].spec().kind(),
            NodeKind::MaybeAbsent(_)
        ));
        assert!(matches!(
            object.members()[2].spec().kind(),
            NodeKind::MaybeAbsent(_)
        ));

        let value = object
            .finisher()
            .call(vec![Value::from("a"), Value::Int(10), Value::none()])
            .unwrap();
        let record = value.as_record().unwrap();
        assert_eq!(record.get("cache"), Some(&Value::none()));
        assert_eq!(
            object.members()[1].accessor().call(&value),
            Ok(Value::Int(10))
        );
    }
}
