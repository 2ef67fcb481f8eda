use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use rj_types::{ClassRef, DataType, PrimitiveKind, builtin};
use rj_utils::hash::HashMap;

use crate::{
    Accumulator, BuildError, Constructor, Emitter, Function, Getter, MapAccumulator, MapEmitter,
};
use crate::{Predicate, Supplier};

/// A shared spec node.
///
/// Nodes are immutable; the same node may appear under several parents and
/// several type map entries.
pub type Spec = Arc<SpecNode>;

// -----------------------------------------------------------------------------
// Type checks

/// `target` must accept values of type `source`.
pub(crate) fn check_assignable(
    context: &'static str,
    target: &DataType,
    source: &DataType,
) -> Result<(), BuildError> {
    if target.accepts(source, true) {
        Ok(())
    } else {
        Err(BuildError::TypeMismatch {
            context,
            expected: target.clone(),
            found: source.clone(),
        })
    }
}

// -----------------------------------------------------------------------------
// Node payloads

/// A JSON array folded into a container.
#[derive(Clone, Debug)]
pub struct ArrayNode {
    pub element: Spec,
    pub accumulator: Accumulator,
    pub emitter: Emitter,
}

/// A JSON object whose members all share one key spec and one value spec.
#[derive(Clone, Debug)]
pub struct MapNode {
    pub key: Spec,
    pub value: Spec,
    pub accumulator: MapAccumulator,
    pub emitter: MapEmitter,
}

/// One member of a fixed-shape object.
#[derive(Clone, Debug)]
pub struct Member {
    pub(crate) name: Box<str>,
    pub(crate) spec: Spec,
    pub(crate) accessor: Getter,
}

impl Member {
    /// `accessor` reads the member's value out of the object's value.
    #[inline]
    pub fn new(name: &str, spec: Spec, accessor: Getter) -> Self {
        Self {
            name: name.into(),
            spec,
            accessor,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn spec(&self) -> &Spec {
        &self.spec
    }

    #[inline]
    pub fn accessor(&self) -> &Getter {
        &self.accessor
    }
}

/// A JSON object with a fixed set of members, built by a constructor taking
/// every member value in declaration order.
#[derive(Clone, Debug)]
pub struct ObjectNode {
    pub(crate) members: Box<[Member]>,
    pub(crate) index: HashMap<Box<str>, usize>,
    pub(crate) finisher: Constructor,
}

impl ObjectNode {
    #[inline]
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    #[inline]
    pub fn member_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    #[inline]
    pub fn finisher(&self) -> &Constructor {
        &self.finisher
    }
}

/// A value that may be missing from its enclosing object.
///
/// When the member is absent, `absent` (a computed node) supplies the value;
/// when generating, the member is omitted unless `is_present` holds.
#[derive(Clone, Debug)]
pub struct MaybeAbsentNode {
    pub present: Spec,
    pub absent: Spec,
    pub is_present: Predicate,
}

/// A value written in an alternate representation.
///
/// `to` turns a parsed alternate value into the node's value; `from` turns
/// the node's value into the alternate one for generation.
#[derive(Clone, Debug)]
pub struct ConvertedNode {
    pub alternate: Spec,
    pub to: Function,
    pub from: Function,
}

/// Hooks around a child. `before` runs first and returns a state, which is
/// handed to `after` once the child is done. The result of `after` is
/// discarded.
#[derive(Clone, Debug)]
pub struct CallbackNode {
    pub child: Spec,
    pub before: Supplier,
    pub after: Function,
}

// -----------------------------------------------------------------------------
// NodeKind

/// The closed set of node kinds.
#[derive(Clone, Debug)]
pub enum NodeKind {
    Str,
    Bool,
    /// A one-character string.
    Char,
    /// An arbitrary precision numeral; integral for `BigInteger`.
    BigNumber,
    Number(PrimitiveKind),
    BoxedNumber(PrimitiveKind),
    /// An enum constant written by name.
    Enum(ClassRef),
    Array(ArrayNode),
    UniformMap(MapNode),
    Object(ObjectNode),
    Nullable(Spec),
    MaybeAbsent(MaybeAbsentNode),
    Converted(ConvertedNode),
    Callback(CallbackNode),
    /// A value produced without consuming input.
    Computed(Supplier),
    /// Deferred lookup of the spec for a type in the type map.
    TypeRef(DataType),
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Str => "string",
            Self::Bool => "boolean",
            Self::Char => "char",
            Self::BigNumber => "big number",
            Self::Number(_) => "number",
            Self::BoxedNumber(_) => "boxed number",
            Self::Enum(_) => "enum",
            Self::Array(_) => "array",
            Self::UniformMap(_) => "map",
            Self::Object(_) => "object",
            Self::Nullable(_) => "nullable",
            Self::MaybeAbsent(_) => "maybe-absent",
            Self::Converted(_) => "converted",
            Self::Callback(_) => "callback",
            Self::Computed(_) => "computed",
            Self::TypeRef(_) => "reference",
        }
    }
}

// -----------------------------------------------------------------------------
// SpecNode

/// One node of the serialization rule tree: how values of `data_type`
/// correspond to JSON.
///
/// Constructors check that the node's type agrees with the types of its
/// children and functions, so a built tree is well typed.
///
/// # Examples
///
/// ```
/// use rj_spec::{Accumulator, Emitter, NodeKind, SpecNode};
/// use rj_types::{builtin, DataType};
///
/// let list = DataType::known(builtin::list(), [DataType::string()]);
/// let spec = SpecNode::array(
///     list.clone(),
///     SpecNode::string(),
///     Accumulator::list(&list, &DataType::string()),
///     Emitter::list(&list, &DataType::string()),
/// )
/// .unwrap();
/// assert!(matches!(spec.kind(), NodeKind::Array(_)));
///
/// // The element spec must fit the accumulator.
/// let ints = DataType::known(builtin::list(), [DataType::class(builtin::integer())]);
/// assert!(SpecNode::array(
///     ints.clone(),
///     SpecNode::string(),
///     Accumulator::list(&ints, &DataType::class(builtin::integer())),
///     Emitter::list(&ints, &DataType::class(builtin::integer())),
/// )
/// .is_err());
/// ```
pub struct SpecNode {
    data_type: DataType,
    kind: NodeKind,
}

impl SpecNode {
    #[inline]
    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    #[inline]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Scalars read and write a single token and have no children.
    #[inline]
    pub fn is_scalar(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Str
                | NodeKind::Bool
                | NodeKind::Char
                | NodeKind::BigNumber
                | NodeKind::Number(_)
                | NodeKind::BoxedNumber(_)
                | NodeKind::Enum(_)
        )
    }

    /// Whether this node's values are written as JSON strings, so that it
    /// can serve as the key of a uniform map.
    ///
    /// References pass here; [`TypeMap::check_keys`](crate::TypeMap::check_keys)
    /// checks their targets once the map is complete.
    pub fn is_string_keyed(&self) -> bool {
        match &self.kind {
            NodeKind::Str | NodeKind::Char | NodeKind::Enum(_) | NodeKind::TypeRef(_) => true,
            NodeKind::Converted(converted) => converted.alternate.is_string_keyed(),
            _ => false,
        }
    }

    /// Direct children, in declaration order.
    pub fn children(&self) -> Vec<&Spec> {
        match &self.kind {
            NodeKind::Array(array) => alloc::vec![&array.element],
            NodeKind::UniformMap(map) => alloc::vec![&map.key, &map.value],
            NodeKind::Object(object) => object.members.iter().map(|m| &m.spec).collect(),
            NodeKind::Nullable(child) => alloc::vec![child],
            NodeKind::MaybeAbsent(node) => alloc::vec![&node.present, &node.absent],
            NodeKind::Converted(node) => alloc::vec![&node.alternate],
            NodeKind::Callback(node) => alloc::vec![&node.child],
            _ => Vec::new(),
        }
    }

    #[inline]
    pub(crate) fn from_parts(data_type: DataType, kind: NodeKind) -> Spec {
        Arc::new(Self { data_type, kind })
    }

    // ------------------------------------------------------------------
    // Scalars

    #[inline]
    pub fn string() -> Spec {
        Self::from_parts(DataType::string(), NodeKind::Str)
    }

    /// `bool`, or `Boolean` when `boxed`.
    pub fn boolean(boxed: bool) -> Spec {
        let ty = if boxed {
            DataType::class(builtin::boolean())
        } else {
            PrimitiveKind::Bool.into()
        };
        Self::from_parts(ty, NodeKind::Bool)
    }

    /// `char`, or `Character` when `boxed`.
    pub fn character(boxed: bool) -> Spec {
        let ty = if boxed {
            DataType::class(builtin::character())
        } else {
            PrimitiveKind::Char.into()
        };
        Self::from_parts(ty, NodeKind::Char)
    }

    /// A primitive number.
    ///
    /// # Panics
    ///
    /// Panics if `kind` is not numeric.
    pub fn number(kind: PrimitiveKind) -> Spec {
        assert!(kind.is_numeric(), "`{}` is not a number", kind.name());
        Self::from_parts(kind.into(), NodeKind::Number(kind))
    }

    /// The boxed form of a primitive number.
    ///
    /// # Panics
    ///
    /// Panics if `kind` is not numeric.
    pub fn boxed_number(kind: PrimitiveKind) -> Spec {
        assert!(kind.is_numeric(), "`{}` is not a number", kind.name());
        Self::from_parts(DataType::class(kind.boxed()), NodeKind::BoxedNumber(kind))
    }

    #[inline]
    pub fn big_integer() -> Spec {
        Self::from_parts(DataType::class(builtin::big_integer()), NodeKind::BigNumber)
    }

    #[inline]
    pub fn big_decimal() -> Spec {
        Self::from_parts(DataType::class(builtin::big_decimal()), NodeKind::BigNumber)
    }

    /// Constants of an enum class, by name.
    pub fn enumeration(class: ClassRef) -> Result<Spec, BuildError> {
        let ty = DataType::class(class);
        if !class.is_enum() {
            return Err(BuildError::SpecMismatch {
                ty,
                spec: DataType::class(builtin::object()),
            });
        }
        Ok(Self::from_parts(ty, NodeKind::Enum(class)))
    }

    // ------------------------------------------------------------------
    // Containers

    pub fn array(
        ty: DataType,
        element: Spec,
        accumulator: Accumulator,
        emitter: Emitter,
    ) -> Result<Spec, BuildError> {
        let Accumulator {
            creator,
            integrator,
            finisher,
        } = &accumulator;
        check_assignable("array accumulator", integrator.param(0), creator.ret())?;
        check_assignable("array accumulator", integrator.param(0), integrator.ret())?;
        check_assignable("array element", integrator.param(1), element.data_type())?;
        check_assignable("array finisher", finisher.param(0), integrator.ret())?;
        check_assignable("array result", &ty, finisher.ret())?;
        check_assignable("array emitter", emitter.start.param(0), &ty)?;
        check_assignable("array emitter", element.data_type(), emitter.start.ret())?;
        Ok(Self::from_parts(
            ty,
            NodeKind::Array(ArrayNode {
                element,
                accumulator,
                emitter,
            }),
        ))
    }

    pub fn uniform_map(
        ty: DataType,
        key: Spec,
        value: Spec,
        accumulator: MapAccumulator,
        emitter: MapEmitter,
    ) -> Result<Spec, BuildError> {
        if !key.is_string_keyed() {
            return Err(BuildError::InvalidKey(ty));
        }
        let MapAccumulator {
            creator,
            integrator,
            finisher,
        } = &accumulator;
        check_assignable("map accumulator", integrator.param(0), creator.ret())?;
        check_assignable("map accumulator", integrator.param(0), integrator.ret())?;
        check_assignable("map key", integrator.param(1), key.data_type())?;
        check_assignable("map value", integrator.param(2), value.data_type())?;
        check_assignable("map finisher", finisher.param(0), integrator.ret())?;
        check_assignable("map result", &ty, finisher.ret())?;
        check_assignable("map emitter", emitter.start.param(0), &ty)?;
        check_assignable("map emitter", emitter.key.param(0), emitter.start.ret())?;
        check_assignable("map emitter", emitter.value.param(0), emitter.start.ret())?;
        check_assignable("map key", key.data_type(), emitter.key.ret())?;
        check_assignable("map value", value.data_type(), emitter.value.ret())?;
        Ok(Self::from_parts(
            ty,
            NodeKind::UniformMap(MapNode {
                key,
                value,
                accumulator,
                emitter,
            }),
        ))
    }

    /// A fixed-shape object. `finisher` receives one value per member, in
    /// the order of `members`.
    pub fn object(
        ty: DataType,
        members: Vec<Member>,
        finisher: Constructor,
    ) -> Result<Spec, BuildError> {
        let params = finisher.signature().params();
        if params.len() != members.len() {
            return Err(BuildError::ArityMismatch {
                context: "object finisher",
                expected: members.len(),
                found: params.len(),
            });
        }
        let mut index = rj_utils::hash::map_with_capacity(members.len());
        for (i, member) in members.iter().enumerate() {
            if index.insert(member.name.clone(), i).is_some() {
                return Err(BuildError::DuplicateMember {
                    ty,
                    name: member.name.clone(),
                });
            }
            check_assignable("member accessor", member.accessor.param(0), &ty)?;
            check_assignable(
                "member accessor",
                member.spec.data_type(),
                member.accessor.ret(),
            )?;
            check_assignable("object finisher", &params[i], member.spec.data_type())?;
        }
        check_assignable("object result", &ty, finisher.ret())?;
        Ok(Self::from_parts(
            ty,
            NodeKind::Object(ObjectNode {
                members: members.into_boxed_slice(),
                index,
                finisher,
            }),
        ))
    }

    // ------------------------------------------------------------------
    // Wrappers

    /// Accepts `null` in addition to the child's values.
    pub fn nullable(child: Spec) -> Result<Spec, BuildError> {
        if child.data_type().is_primitive() {
            return Err(BuildError::TypeMismatch {
                context: "nullable",
                expected: DataType::object(),
                found: child.data_type().clone(),
            });
        }
        Ok(Self::from_parts(
            child.data_type().clone(),
            NodeKind::Nullable(child),
        ))
    }

    pub fn maybe_absent(
        ty: DataType,
        present: Spec,
        absent: Spec,
        is_present: Predicate,
    ) -> Result<Spec, BuildError> {
        if !matches!(absent.kind, NodeKind::Computed(_)) {
            return Err(BuildError::InvalidAbsent(ty));
        }
        check_assignable("present alternative", &ty, present.data_type())?;
        check_assignable("absent alternative", &ty, absent.data_type())?;
        check_assignable("presence predicate", is_present.param(0), &ty)?;
        Ok(Self::from_parts(
            ty,
            NodeKind::MaybeAbsent(MaybeAbsentNode {
                present,
                absent,
                is_present,
            }),
        ))
    }

    pub fn converted(
        ty: DataType,
        alternate: Spec,
        to: Function,
        from: Function,
    ) -> Result<Spec, BuildError> {
        check_assignable("conversion input", to.param(0), alternate.data_type())?;
        check_assignable("conversion result", &ty, to.ret())?;
        check_assignable("reverse conversion input", from.param(0), &ty)?;
        check_assignable(
            "reverse conversion result",
            alternate.data_type(),
            from.ret(),
        )?;
        Ok(Self::from_parts(
            ty,
            NodeKind::Converted(ConvertedNode {
                alternate,
                to,
                from,
            }),
        ))
    }

    pub fn callback(child: Spec, before: Supplier, after: Function) -> Result<Spec, BuildError> {
        check_assignable("callback state", after.param(0), before.ret())?;
        Ok(Self::from_parts(
            child.data_type().clone(),
            NodeKind::Callback(CallbackNode {
                child,
                before,
                after,
            }),
        ))
    }

    #[inline]
    pub fn computed(supplier: Supplier) -> Spec {
        Self::from_parts(supplier.ret().clone(), NodeKind::Computed(supplier))
    }

    /// A reference to the type map entry for `ty`.
    #[inline]
    pub fn type_ref(ty: DataType) -> Spec {
        Self::from_parts(ty.clone(), NodeKind::TypeRef(ty))
    }
}

impl fmt::Debug for SpecNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::TypeRef(ty) => write!(f, "&{ty}"),
            kind if self.is_scalar() => write!(f, "{}: {}", kind.name(), self.data_type),
            kind => {
                let mut t = f.debug_tuple(&alloc::format!("{}: {}", kind.name(), self.data_type));
                for child in self.children() {
                    t.field(child);
                }
                t.finish()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;

    use rj_types::{DataType, PrimitiveKind, Value, builtin};

    use super::{Member, NodeKind, SpecNode};
    use crate::{BuildError, Constructor, Function, Getter, Predicate, Supplier};

    fn pair_type() -> DataType {
        DataType::known(builtin::entry(), [DataType::string(), DataType::string()])
    }

    fn getter(index: usize) -> Getter {
        Getter::new(pair_type(), DataType::string(), move |v| {
            Ok(v.as_record().unwrap().fields()[index].clone())
        })
    }

    #[test]
    fn object_members_are_unique() {
        let members = vec![
            Member::new("key", SpecNode::string(), getter(0)),
            Member::new("key", SpecNode::string(), getter(1)),
        ];
        let finisher = Constructor::new(
            [DataType::string(), DataType::string()],
            pair_type(),
            |_| Ok(Value::Null),
        );
        let err = SpecNode::object(pair_type(), members, finisher).unwrap_err();
        assert!(matches!(err, BuildError::DuplicateMember { .. }));
    }

    #[test]
    fn object_finisher_arity_is_checked() {
        let members = vec![Member::new("key", SpecNode::string(), getter(0))];
        let finisher = Constructor::new(Vec::<DataType>::new(), pair_type(), |_| Ok(Value::Null));
        let err = SpecNode::object(pair_type(), members, finisher).unwrap_err();
        assert_eq!(
            err,
            BuildError::ArityMismatch {
                context: "object finisher",
                expected: 1,
                found: 0
            }
        );
    }

    #[test]
    fn conversions_are_type_checked() {
        let int = DataType::from(PrimitiveKind::I32);
        let to = Function::new(DataType::string(), int.clone(), Ok);
        let from = Function::new(int.clone(), DataType::string(), Ok);
        let converted =
            SpecNode::converted(int.clone(), SpecNode::string(), to.clone(), from.clone());
        assert!(converted.is_ok());
        let err = SpecNode::converted(int, SpecNode::boolean(false), to, from).unwrap_err();
        assert!(matches!(
            err,
            BuildError::TypeMismatch {
                context: "conversion input",
                ..
            }
        ));
    }

    #[test]
    fn absent_alternative_must_be_computed() {
        let ty = DataType::string();
        let always = Predicate::new(ty.clone(), DataType::primitive(PrimitiveKind::Bool), |_| {
            true
        });
        let err = SpecNode::maybe_absent(
            ty.clone(),
            SpecNode::string(),
            SpecNode::string(),
            always.clone(),
        );
        assert!(matches!(err, Err(BuildError::InvalidAbsent(_))));

        let absent = SpecNode::computed(Supplier::new(ty.clone(), || Ok(Value::from(""))));
        let spec = SpecNode::maybe_absent(ty, SpecNode::string(), absent, always).unwrap();
        assert_eq!(spec.children().len(), 2);
    }

    #[test]
    fn nullable_needs_a_reference_type() {
        assert!(SpecNode::nullable(SpecNode::number(PrimitiveKind::I32)).is_err());
        let boxed = SpecNode::nullable(SpecNode::boxed_number(PrimitiveKind::I32)).unwrap();
        assert_eq!(boxed.data_type(), &DataType::class(builtin::integer()));
    }

    #[test]
    fn shared_children_stay_shared() {
        let leaf = SpecNode::type_ref(DataType::string());
        let nullable = SpecNode::nullable(leaf.clone()).unwrap();
        let NodeKind::Nullable(child) = nullable.kind() else {
            unreachable!()
        };
        assert!(Arc::ptr_eq(child, &leaf));
        assert_eq!(format!("{nullable:?}"), "nullable: String(&String)");
    }
}
