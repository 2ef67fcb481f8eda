//! End-to-end behavior, checked against every backend configuration.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use rj_json::{SyntaxError, SyntaxErrorKind};
use rj_spec::{BuildError, CodecConfig, MapAccumulator, MapEmitter, Spec, SpecNode, Supplier};
use rj_spec::{TypeMap, TypeScanner};
use rj_types::{
    ClassInfo, ClassRef, DataType, EnumValue, FieldInfo, PrimitiveKind, Record, Value, builtin,
};

use crate::{Codec, CodecError, Compiler, ContentError, Interpreter, build_codec};

// -----------------------------------------------------------------------------
// Fixture

/// One codec per backend configuration, over the same scanned types.
struct Fixture {
    codecs: Vec<(&'static str, Arc<dyn Codec>)>,
}

fn scan(types: &[DataType], optimize: bool) -> Arc<TypeMap> {
    scan_with(types, optimize, &|_| {})
}

fn scan_with(types: &[DataType], optimize: bool, setup: &dyn Fn(&mut TypeScanner)) -> Arc<TypeMap> {
    let mut scanner = TypeScanner::new(CodecConfig::new().optimize(optimize));
    setup(&mut scanner);
    for ty in types {
        scanner.scan(ty).unwrap();
    }
    Arc::new(scanner.build().unwrap())
}

impl Fixture {
    fn new(types: &[DataType]) -> Self {
        Self::with(types, &|_| {})
    }

    /// Like [`new`](Self::new), with `setup` applied to each scanner first.
    fn with(types: &[DataType], setup: &dyn Fn(&mut TypeScanner)) -> Self {
        let plain = scan_with(types, false, setup);
        let optimized = scan_with(types, true, setup);
        let modes = [
            ("recursive", &plain, CodecConfig::new()),
            ("iterative", &plain, CodecConfig::new().iterative(true)),
            ("compiled", &plain, CodecConfig::new().compiled(true)),
            ("fewer switches", &plain, CodecConfig::new().compiled(true).fewer_switches(true)),
            ("optimized recursive", &optimized, CodecConfig::new()),
            ("optimized compiled", &optimized, CodecConfig::new().compiled(true)),
        ];
        let codecs = modes
            .into_iter()
            .map(|(name, map, config)| (name, build_codec(map.clone(), &config).unwrap()))
            .collect();
        Self { codecs }
    }

    fn parse_each(
        &self,
        ty: &DataType,
        text: &str,
    ) -> Vec<(&'static str, Result<Value, CodecError>)> {
        self.codecs
            .iter()
            .map(|(name, codec)| (*name, codec.parser_for_type(ty).unwrap().parse_str(text)))
            .collect()
    }

    /// Parses with every backend, requiring success and agreement.
    #[track_caller]
    fn parse(&self, ty: &DataType, text: &str) -> Value {
        let results = self.parse_each(ty, text);
        let (_, first) = &results[0];
        let first = first.clone().unwrap_or_else(|e| panic!("{text}: {e}"));
        for (name, result) in &results {
            assert_eq!(result.as_ref(), Ok(&first), "{name} disagrees on {text}");
        }
        first
    }

    /// Parses with every backend, requiring the same error.
    #[track_caller]
    fn parse_error(&self, ty: &DataType, text: &str) -> CodecError {
        let results = self.parse_each(ty, text);
        let (_, first) = &results[0];
        let first = first.clone().expect_err(text);
        for (name, result) in &results {
            assert_eq!(result.as_ref(), Err(&first), "{name} disagrees on {text}");
        }
        first
    }

    /// Generates with every backend, requiring agreement.
    #[track_caller]
    fn generate(&self, ty: &DataType, value: &Value) -> String {
        let mut outputs = self.codecs.iter().map(|(name, codec)| {
            let generator = codec.generator_for_type(ty).unwrap();
            (*name, generator.generate_string(value))
        });
        let (_, first) = outputs.next().unwrap();
        let first = first.unwrap();
        serde_json::from_str::<serde_json::Value>(&first).unwrap();
        for (name, output) in outputs {
            assert_eq!(output.as_ref(), Ok(&first), "{name} disagrees");
        }
        first
    }
}

// -----------------------------------------------------------------------------
// Classes

fn node_class() -> ClassRef {
    static NODE: OnceLock<ClassRef> = OnceLock::new();
    *NODE.get_or_init(|| {
        let node = ClassInfo::builder("Node").declare();
        node.define_record([
            FieldInfo::new("name", DataType::string()),
            FieldInfo::new("children", DataType::known(builtin::list(), [DataType::class(node)])),
        ])
        .unwrap();
        node
    })
}

fn side_table_class() -> ClassRef {
    static SIDE_TABLE: OnceLock<ClassRef> = OnceLock::new();
    *SIDE_TABLE.get_or_init(|| {
        ClassInfo::builder("SideTable").record([
            FieldInfo::new("domain", DataType::string()),
            FieldInfo::new(
                "valuesById",
                DataType::known(builtin::list(), [DataType::class(builtin::long())]),
            ),
        ])
    })
}

fn settings_class() -> ClassRef {
    static SETTINGS: OnceLock<ClassRef> = OnceLock::new();
    *SETTINGS.get_or_init(|| {
        ClassInfo::builder("Settings").record([
            FieldInfo::new("name", DataType::string()),
            FieldInfo::new("limit", PrimitiveKind::I32.into()).with_default(Value::Int(10)),
            FieldInfo::new("note", DataType::known(builtin::optional(), [DataType::string()])),
            FieldInfo::new(
                "ids",
                DataType::known(builtin::set(), [DataType::class(builtin::integer())]),
            ),
        ])
    })
}

/// `Link { label: char, next: Link }`; `next` is made nullable per scan.
fn link_class() -> ClassRef {
    static LINK: OnceLock<ClassRef> = OnceLock::new();
    *LINK.get_or_init(|| {
        let link = ClassInfo::builder("Link").declare();
        link.define_record([
            FieldInfo::new("label", PrimitiveKind::Char.into()),
            FieldInfo::new("next", DataType::class(link)),
        ])
        .unwrap();
        link
    })
}

fn color_class() -> ClassRef {
    static COLOR: OnceLock<ClassRef> = OnceLock::new();
    *COLOR.get_or_init(|| ClassInfo::builder("Color").enumeration(["RED", "GREEN", "GREY"]))
}

fn node(name: &str, children: Vec<Value>) -> Value {
    Value::Record(Record::new(node_class(), vec![Value::from(name), Value::list(children)]))
}

fn link(label: char, next: Value) -> Value {
    Value::Record(Record::new(link_class(), vec![Value::Char(label), next]))
}

fn settings(name: &str, limit: i64, note: Option<&str>, ids: &[i64]) -> Value {
    let note = note.map_or_else(Value::none, |note| Value::some(Value::from(note)));
    let ids = ids.iter().map(|&id| Value::Int(id)).collect();
    Value::Record(Record::new(
        settings_class(),
        vec![Value::from(name), Value::Int(limit), note, Value::list(ids)],
    ))
}

// -----------------------------------------------------------------------------
// Scalars

#[test]
fn booleans_round_trip() {
    let ty = DataType::from(PrimitiveKind::Bool);
    let fixture = Fixture::new(core::slice::from_ref(&ty));
    let value = fixture.parse(&ty, " false ");
    assert_eq!(value, Value::Bool(false));
    assert_eq!(fixture.generate(&ty, &value), "false");
    assert!(matches!(
        fixture.parse_error(&ty, "0"),
        CodecError::Content(ContentError::UnexpectedToken { .. })
    ));
}

#[test]
fn enums_match_constants_by_name() {
    let ty = DataType::class(color_class());
    let fixture = Fixture::new(core::slice::from_ref(&ty));
    let grey = Value::Enum(EnumValue::from_ordinal(color_class(), 2));
    assert_eq!(fixture.parse(&ty, r#""GREY""#), grey);
    assert_eq!(fixture.generate(&ty, &grey), r#""GREY""#);

    for unknown in [r#""GRE""#, r#""GREYS""#, r#""BLUE""#, r#""""#] {
        assert!(matches!(
            fixture.parse_error(&ty, unknown),
            CodecError::Content(ContentError::InvalidValue { .. })
        ));
    }
}

#[test]
fn optionals_are_null_when_empty() {
    let ty = DataType::known(builtin::optional(), [DataType::string()]);
    let fixture = Fixture::new(core::slice::from_ref(&ty));
    assert_eq!(fixture.parse(&ty, "null"), Value::none());
    assert_eq!(fixture.parse(&ty, r#""x""#), Value::some(Value::from("x")));
    assert_eq!(fixture.generate(&ty, &Value::none()), "null");
    assert_eq!(fixture.generate(&ty, &Value::some(Value::from("x"))), r#""x""#);
}

#[test]
fn big_numbers_keep_their_numerals() {
    let integer = DataType::class(builtin::big_integer());
    let decimal = DataType::class(builtin::big_decimal());
    let fixture = Fixture::new(&[integer.clone(), decimal.clone()]);

    let huge = "-123456789012345678901234567890";
    assert_eq!(fixture.parse(&integer, huge), Value::decimal(huge));
    assert_eq!(fixture.generate(&integer, &Value::decimal(huge)), huge);

    for numeral in ["0.1", "-2.50e-3", "7"] {
        assert_eq!(fixture.parse(&decimal, numeral), Value::decimal(numeral));
        assert_eq!(fixture.generate(&decimal, &Value::decimal(numeral)), numeral);
    }

    for fractional in ["1.5", "1e3"] {
        assert!(matches!(
            fixture.parse_error(&integer, fractional),
            CodecError::Content(ContentError::InvalidValue { .. })
        ));
    }
}

// -----------------------------------------------------------------------------
// Objects

#[test]
fn side_tables_keep_member_order() {
    let ty = DataType::class(side_table_class());
    let fixture = Fixture::new(core::slice::from_ref(&ty));
    let text = r#"{"domain":"/entities","valuesById":[]}"#;
    let value = fixture.parse(&ty, text);
    assert_eq!(fixture.generate(&ty, &value), text);

    let reordered = fixture.parse(&ty, r#"{ "valuesById": [3, 1], "domain": "/entities" }"#);
    assert_eq!(
        fixture.generate(&ty, &reordered),
        r#"{"domain":"/entities","valuesById":[3,1]}"#
    );
}

#[test]
fn member_errors_name_the_member() {
    let ty = DataType::class(settings_class());
    let fixture = Fixture::new(core::slice::from_ref(&ty));

    let duplicate = fixture.parse_error(&ty, r#"{"name":"a","ids":[1],"ids":[2]}"#);
    assert!(matches!(
        &duplicate,
        CodecError::Content(ContentError::DuplicateMember { name, .. }) if &**name == "ids"
    ));
    assert!(duplicate.offset().is_some());

    for (text, expected) in [
        (r#"{"name":"a","ids":[],"nam":1}"#, "nam"),
        (r#"{"name":"a","ids":[],"names":1}"#, "names"),
        (r#"{"name":"a","ids":[],"idx":1}"#, "idx"),
        (r#"{"name":"a","ids":[],"":1}"#, ""),
    ] {
        assert!(
            matches!(
                fixture.parse_error(&ty, text),
                CodecError::Content(ContentError::UnknownMember { name, .. }) if &*name == expected
            ),
            "{text}"
        );
    }

    assert!(matches!(
        fixture.parse_error(&ty, r#"{"ids":[]}"#),
        CodecError::Content(ContentError::MissingMember { name, .. }) if &*name == "name"
    ));
}

#[test]
fn defaults_fill_in_and_drop_out() {
    let ty = DataType::class(settings_class());
    let fixture = Fixture::new(core::slice::from_ref(&ty));

    let value = fixture.parse(&ty, r#"{"ids":[],"name":"a"}"#);
    assert_eq!(value, settings("a", 10, None, &[]));
    assert_eq!(fixture.generate(&ty, &value), r#"{"name":"a","ids":[]}"#);

    let full = settings("b", 5, Some("hi"), &[2, 1]);
    let text = fixture.generate(&ty, &full);
    assert_eq!(text, r#"{"name":"b","limit":5,"note":"hi","ids":[2,1]}"#);
    assert_eq!(fixture.parse(&ty, &text), full);
}

#[test]
fn truncated_objects_are_syntax_errors() {
    let ty = DataType::class(settings_class());
    let fixture = Fixture::new(core::slice::from_ref(&ty));
    for text in [
        r#"{"name":"a","ids":[1]"#,
        r#"{"name":"a","ids":[1,"#,
        r#"{"name":"a","#,
        "{",
        "",
    ] {
        let err = fixture.parse_error(&ty, text);
        assert!(
            matches!(
                &err,
                CodecError::Syntax(SyntaxError {
                    kind: SyntaxErrorKind::UnexpectedEnd,
                    ..
                })
            ),
            "{text}: {err}"
        );
        assert_eq!(err.offset(), Some(text.len()), "{text}");
    }
}

#[test]
fn nullable_members_accept_null() {
    let ty = DataType::class(link_class());
    let fixture = Fixture::with(core::slice::from_ref(&ty), &|scanner| {
        let next = SpecNode::nullable(SpecNode::type_ref(DataType::class(link_class()))).unwrap();
        scanner.specify_record_fields(link_class(), "next", next).unwrap();
    });

    let chain = link('a', link('é', Value::Null));
    let text = fixture.generate(&ty, &chain);
    assert_eq!(text, r#"{"label":"a","next":{"label":"é","next":null}}"#);
    assert_eq!(fixture.parse(&ty, &text), chain);
    assert_eq!(fixture.parse(&ty, r#"{"next":null,"label":"\u0041"}"#), link('A', Value::Null));

    for text in [r#"{"label":"ab","next":null}"#, r#"{"label":"","next":null}"#] {
        assert!(matches!(
            fixture.parse_error(&ty, text),
            CodecError::Content(ContentError::InvalidValue { .. })
        ));
    }
    assert!(matches!(
        fixture.parse_error(&ty, r#"{"label":"a"}"#),
        CodecError::Content(ContentError::MissingMember { name, .. }) if &*name == "next"
    ));
}

#[test]
fn sets_reject_duplicates() {
    let ty = DataType::class(settings_class());
    let fixture = Fixture::new(core::slice::from_ref(&ty));
    assert!(matches!(
        fixture.parse_error(&ty, r#"{"name":"a","ids":[1,2,1]}"#),
        CodecError::Content(ContentError::Rejected { .. })
    ));
}

#[test]
fn numbers_are_checked_against_their_type() {
    let ty = DataType::class(settings_class());
    let fixture = Fixture::new(core::slice::from_ref(&ty));
    for text in [
        r#"{"name":"a","ids":[],"limit":2147483648}"#,
        r#"{"name":"a","ids":[],"limit":1.5}"#,
    ] {
        assert!(matches!(
            fixture.parse_error(&ty, text),
            CodecError::Content(ContentError::InvalidValue { .. })
        ));
    }
    assert!(matches!(
        fixture.parse_error(&ty, r#"{"name":"a","ids":[],"limit":"1"}"#),
        CodecError::Content(ContentError::UnexpectedToken { .. })
    ));
}

#[test]
fn names_may_be_escaped_or_utf16() {
    let ty = DataType::class(settings_class());
    let fixture = Fixture::new(core::slice::from_ref(&ty));
    let value = fixture.parse(&ty, r#"{"name":"😀","ids":[]}"#);
    assert_eq!(value, settings("😀", 10, None, &[]));

    let units: Vec<u16> = r#"{"name":"é😀","ids":[]}"#.encode_utf16().collect();
    for (name, codec) in &fixture.codecs {
        let parsed = codec.parser_for_type(&ty).unwrap().parse_utf16(&units);
        assert_eq!(parsed, Ok(settings("é😀", 10, None, &[])), "{name}");
    }
}

// -----------------------------------------------------------------------------
// Recursion

#[test]
fn recursive_types_nest() {
    let ty = DataType::class(node_class());
    let fixture = Fixture::new(core::slice::from_ref(&ty));

    let shared = node("leaf", vec![]);
    let tree = node(
        "root",
        vec![node("left", vec![shared.clone()]), node("right", vec![shared])],
    );
    let text = fixture.generate(&ty, &tree);
    assert_eq!(
        text,
        r#"{"name":"root","children":[{"name":"left","children":[{"name":"leaf","children":[]}]},{"name":"right","children":[{"name":"leaf","children":[]}]}]}"#
    );
    assert_eq!(fixture.parse(&ty, &text), tree);
}

#[test]
fn iterative_drivers_follow_nesting() {
    const DEPTH: usize = 500;
    let ty = DataType::class(node_class());
    let map = scan(core::slice::from_ref(&ty), false);
    let codec = build_codec(map, &CodecConfig::new().iterative(true)).unwrap();

    let mut text = String::new();
    for _ in 0..DEPTH {
        text.push_str(r#"{"name":"n","children":["#);
    }
    for _ in 0..DEPTH {
        text.push_str("]}");
    }
    let value = codec.parser_for_type(&ty).unwrap().parse_str(&text).unwrap();
    let regenerated = codec.generator_for_type(&ty).unwrap().generate_string(&value).unwrap();
    assert_eq!(regenerated, text);
}

// -----------------------------------------------------------------------------
// Maps

#[test]
fn string_keyed_maps_are_objects() {
    let integer = DataType::class(builtin::integer());
    let ty = DataType::known(builtin::map(), [DataType::string(), integer]);
    let fixture = Fixture::new(core::slice::from_ref(&ty));
    let value = fixture.parse(&ty, r#"{"b":2,"a":1}"#);
    assert_eq!(
        value,
        Value::map(vec![(Value::from("b"), Value::Int(2)), (Value::from("a"), Value::Int(1))])
    );
    assert_eq!(fixture.generate(&ty, &value), r#"{"b":2,"a":1}"#);
}

#[test]
fn enum_keyed_maps_are_objects() {
    let ty = DataType::known(builtin::map(), [DataType::class(color_class()), DataType::string()]);
    let fixture = Fixture::new(core::slice::from_ref(&ty));
    let value = fixture.parse(&ty, r#"{"RED":"warm"}"#);
    let red = Value::Enum(EnumValue::from_ordinal(color_class(), 0));
    assert_eq!(value, Value::map(vec![(red, Value::from("warm"))]));
    assert_eq!(fixture.generate(&ty, &value), r#"{"RED":"warm"}"#);
}

#[test]
fn other_maps_are_entry_arrays() {
    let integer = DataType::class(builtin::integer());
    let ty = DataType::known(builtin::map(), [integer, DataType::string()]);
    let fixture = Fixture::new(core::slice::from_ref(&ty));
    let text = r#"[{"key":1,"value":"one"},{"key":2,"value":"two"}]"#;
    let value = fixture.parse(&ty, text);
    assert_eq!(
        value,
        Value::map(vec![(Value::Int(1), Value::from("one")), (Value::Int(2), Value::from("two"))])
    );
    assert_eq!(fixture.generate(&ty, &value), text);
}

#[test]
fn map_keys_must_be_written_as_strings() {
    let key = DataType::class(builtin::integer());
    let ty = DataType::known(builtin::map(), [key.clone(), DataType::string()]);
    let spec = SpecNode::uniform_map(
        ty.clone(),
        SpecNode::type_ref(key.clone()),
        SpecNode::type_ref(DataType::string()),
        MapAccumulator::map(&ty, &key, &DataType::string()),
        MapEmitter::map(&ty, &key, &DataType::string()),
    )
    .unwrap();

    let mut map = TypeMap::new();
    map.insert(DataType::string(), SpecNode::string()).unwrap();
    map.insert(key, SpecNode::boxed_number(PrimitiveKind::I32)).unwrap();
    map.insert(ty.clone(), spec.clone()).unwrap();
    let map = Arc::new(map);

    for config in [CodecConfig::new(), CodecConfig::new().compiled(true)] {
        assert_eq!(
            build_codec(map.clone(), &config).err(),
            Some(BuildError::InvalidKey(ty.clone()))
        );
    }
    let interpreter = Interpreter::new(map, false);
    assert_eq!(
        interpreter.generator_for(&spec).err(),
        Some(BuildError::InvalidKey(ty.clone()))
    );
    assert_eq!(interpreter.parser_for(&spec).err(), Some(BuildError::InvalidKey(ty)));
}

// -----------------------------------------------------------------------------
// Hand-built specs

#[test]
fn computed_values_cannot_be_generated() {
    let fixture = Fixture::new(&[]);
    let spec: Spec = SpecNode::computed(Supplier::new(DataType::string(), || Ok(Value::from("x"))));
    for (name, codec) in &fixture.codecs {
        let result = codec.generator_for(&spec).unwrap().generate_string(&Value::from("x"));
        assert!(
            matches!(result, Err(CodecError::Content(ContentError::Unrepresentable(_)))),
            "{name}"
        );
    }
}

#[test]
fn callbacks_surround_the_child() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);
    let fixture = Fixture::new(&[]);
    let spec = SpecNode::callback(
        SpecNode::string(),
        Supplier::new(DataType::string(), || {
            CALLS.fetch_add(1, Ordering::Relaxed);
            Ok(Value::from("state"))
        }),
        rj_spec::Function::new(DataType::string(), DataType::string(), |state| {
            assert_eq!(state, Value::from("state"));
            CALLS.fetch_add(1, Ordering::Relaxed);
            Ok(Value::Null)
        }),
    )
    .unwrap();

    for (name, codec) in &fixture.codecs {
        let before = CALLS.load(Ordering::Relaxed);
        let value = codec.parser_for(&spec).unwrap().parse_str(r#""text""#);
        assert_eq!(value, Ok(Value::from("text")), "{name}");
        let text = codec.generator_for(&spec).unwrap().generate_string(&Value::from("text"));
        assert_eq!(text.as_deref(), Ok(r#""text""#), "{name}");
        assert_eq!(CALLS.load(Ordering::Relaxed) - before, 4, "{name}");
    }
}

#[test]
fn extra_specs_are_compiled_up_front() {
    let ty = DataType::class(node_class());
    let map = scan(core::slice::from_ref(&ty), false);
    let nullable = SpecNode::nullable(SpecNode::type_ref(ty.clone())).unwrap();
    let codec = Compiler::new(&CodecConfig::new()).compile(map, &[nullable.clone()]).unwrap();

    let parser = codec.parser_for(&nullable).unwrap();
    assert_eq!(parser.parse_str("null"), Ok(Value::Null));
    assert_eq!(
        parser.parse_str(r#"{"name":"n","children":[]}"#),
        Ok(node("n", vec![]))
    );
}

// -----------------------------------------------------------------------------
// Unresolved references

#[test]
fn unresolved_references_fail_per_backend() {
    let handle = ClassInfo::builder("Handle").opaque();
    let ty = DataType::known(builtin::list(), [DataType::class(handle)]);
    let map = scan(core::slice::from_ref(&ty), false);
    assert_eq!(map.unresolved(), [DataType::class(handle)]);

    let compiled = build_codec(map.clone(), &CodecConfig::new().compiled(true));
    assert_eq!(
        compiled.err(),
        Some(BuildError::UnresolvedReference(DataType::class(handle)))
    );

    let interpreter = build_codec(map, &CodecConfig::new()).unwrap();
    let parser = interpreter.parser_for_type(&ty).unwrap();
    assert_eq!(parser.parse_str("[]"), Ok(Value::list(vec![])));
    assert_eq!(
        parser.parse_str("[1]"),
        Err(CodecError::Build(BuildError::MissingType(DataType::class(handle))))
    );
}
