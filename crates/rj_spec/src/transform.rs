//! Structure-preserving rewrites of spec trees.
//!
//! A rewrite visits every node once: a node shared by several parents is
//! rewritten once and the result is shared the same way.

use alloc::sync::Arc;
use alloc::vec::Vec;

use rj_types::{DataType, TypeBindings};
use rj_utils::hash::HashMap;

use crate::node::{
    ArrayNode, CallbackNode, ConvertedNode, MapNode, MaybeAbsentNode, Member, ObjectNode,
};
use crate::{Accumulator, Emitter, MapAccumulator, MapEmitter, NodeKind, Spec, SpecNode, TypedFn};

// -----------------------------------------------------------------------------
// Rewrite

/// What a rewrite changes. Everything else is copied.
pub(crate) trait Rewrite {
    fn data_type(&mut self, ty: &DataType) -> DataType;

    fn function<F: ?Sized>(&mut self, f: &TypedFn<F>) -> TypedFn<F>;

    /// A replacement for a whole node, or `None` to rebuild it from its
    /// rewritten parts.
    #[inline]
    fn replace(&mut self, _spec: &Spec) -> Option<Spec> {
        None
    }
}

pub(crate) struct Rewriter<R> {
    rule: R,
    memo: HashMap<*const SpecNode, Spec>,
}

impl<R: Rewrite> Rewriter<R> {
    #[inline]
    pub fn new(rule: R) -> Self {
        Self {
            rule,
            memo: rj_utils::hash::new_map(),
        }
    }

    pub fn rewrite(&mut self, spec: &Spec) -> Spec {
        let key = Arc::as_ptr(spec);
        if let Some(done) = self.memo.get(&key) {
            return done.clone();
        }
        let out = match self.rule.replace(spec) {
            Some(replacement) => replacement,
            None => self.rebuild(spec),
        };
        self.memo.insert(key, out.clone());
        out
    }

    fn rebuild(&mut self, spec: &Spec) -> Spec {
        let data_type = self.rule.data_type(spec.data_type());
        let kind = match spec.kind() {
            NodeKind::Str => NodeKind::Str,
            NodeKind::Bool => NodeKind::Bool,
            NodeKind::Char => NodeKind::Char,
            NodeKind::BigNumber => NodeKind::BigNumber,
            NodeKind::Number(kind) => NodeKind::Number(*kind),
            NodeKind::BoxedNumber(kind) => NodeKind::BoxedNumber(*kind),
            NodeKind::Enum(class) => NodeKind::Enum(*class),
            NodeKind::Array(array) => NodeKind::Array(ArrayNode {
                element: self.rewrite(&array.element),
                accumulator: Accumulator::new(
                    self.rule.function(&array.accumulator.creator),
                    self.rule.function(&array.accumulator.integrator),
                    self.rule.function(&array.accumulator.finisher),
                ),
                emitter: Emitter::new(self.rule.function(&array.emitter.start)),
            }),
            NodeKind::UniformMap(map) => NodeKind::UniformMap(MapNode {
                key: self.rewrite(&map.key),
                value: self.rewrite(&map.value),
                accumulator: MapAccumulator::new(
                    self.rule.function(&map.accumulator.creator),
                    self.rule.function(&map.accumulator.integrator),
                    self.rule.function(&map.accumulator.finisher),
                ),
                emitter: MapEmitter::new(
                    self.rule.function(&map.emitter.start),
                    self.rule.function(&map.emitter.key),
                    self.rule.function(&map.emitter.value),
                ),
            }),
            NodeKind::Object(object) => {
                let members: Vec<Member> = object
                    .members
                    .iter()
                    .map(|member| Member {
                        name: member.name.clone(),
                        spec: self.rewrite(&member.spec),
                        accessor: self.rule.function(&member.accessor),
                    })
                    .collect();
                NodeKind::Object(ObjectNode {
                    members: members.into_boxed_slice(),
                    index: object.index.clone(),
                    finisher: self.rule.function(&object.finisher),
                })
            }
            NodeKind::Nullable(child) => NodeKind::Nullable(self.rewrite(child)),
            NodeKind::MaybeAbsent(node) => NodeKind::MaybeAbsent(MaybeAbsentNode {
                present: self.rewrite(&node.present),
                absent: self.rewrite(&node.absent),
                is_present: self.rule.function(&node.is_present),
            }),
            NodeKind::Converted(node) => NodeKind::Converted(ConvertedNode {
                alternate: self.rewrite(&node.alternate),
                to: self.rule.function(&node.to),
                from: self.rule.function(&node.from),
            }),
            NodeKind::Callback(node) => NodeKind::Callback(CallbackNode {
                child: self.rewrite(&node.child),
                before: self.rule.function(&node.before),
                after: self.rule.function(&node.after),
            }),
            NodeKind::Computed(supplier) => NodeKind::Computed(self.rule.function(supplier)),
            NodeKind::TypeRef(target) => NodeKind::TypeRef(self.rule.data_type(target)),
        };
        SpecNode::from_parts(data_type, kind)
    }
}

// -----------------------------------------------------------------------------
// Substitution

struct Substitute<'a>(&'a TypeBindings);

impl Rewrite for Substitute<'_> {
    #[inline]
    fn data_type(&mut self, ty: &DataType) -> DataType {
        ty.substitute(self.0)
    }

    #[inline]
    fn function<F: ?Sized>(&mut self, f: &TypedFn<F>) -> TypedFn<F> {
        f.substitute(self.0)
    }

    fn replace(&mut self, spec: &Spec) -> Option<Spec> {
        (!has_variables(spec)).then(|| spec.clone())
    }
}

/// Whether any type in the tree under `spec` mentions a type variable.
pub fn has_variables(spec: &SpecNode) -> bool {
    if spec.data_type().has_variables() {
        return true;
    }
    let own = match spec.kind() {
        NodeKind::Array(array) => {
            array.accumulator.creator.signature().has_variables()
                || array.accumulator.integrator.signature().has_variables()
                || array.accumulator.finisher.signature().has_variables()
                || array.emitter.start.signature().has_variables()
        }
        NodeKind::UniformMap(map) => {
            map.accumulator.creator.signature().has_variables()
                || map.accumulator.integrator.signature().has_variables()
                || map.accumulator.finisher.signature().has_variables()
                || map.emitter.start.signature().has_variables()
                || map.emitter.key.signature().has_variables()
                || map.emitter.value.signature().has_variables()
        }
        NodeKind::Object(object) => {
            object.finisher.signature().has_variables()
                || object
                    .members
                    .iter()
                    .any(|m| m.accessor.signature().has_variables())
        }
        NodeKind::MaybeAbsent(node) => node.is_present.signature().has_variables(),
        NodeKind::Converted(node) => {
            node.to.signature().has_variables() || node.from.signature().has_variables()
        }
        NodeKind::Callback(node) => {
            node.before.signature().has_variables() || node.after.signature().has_variables()
        }
        NodeKind::Computed(supplier) => supplier.signature().has_variables(),
        NodeKind::TypeRef(target) => target.has_variables(),
        _ => false,
    };
    own || spec
        .children()
        .into_iter()
        .any(|child| has_variables(child))
}

/// Replace the variables of every type and signature in the tree.
///
/// Subtrees without variables are kept as they are; shared nodes stay
/// shared.
///
/// # Panics
///
/// Panics if the tree mentions a variable that `bindings` does not bind.
pub fn substitute(spec: &Spec, bindings: &TypeBindings) -> Spec {
    Rewriter::new(Substitute(bindings)).rewrite(spec)
}

// -----------------------------------------------------------------------------
// Walk

/// Calls `visit` with the target of every reference in the tree, once per
/// distinct reference node.
pub fn for_each_reference(spec: &Spec, visit: &mut dyn FnMut(&DataType)) {
    let mut seen = rj_utils::hash::new_set::<*const SpecNode>();
    let mut stack = alloc::vec![spec];
    while let Some(node) = stack.pop() {
        if !seen.insert(Arc::as_ptr(node)) {
            continue;
        }
        if let NodeKind::TypeRef(target) = node.kind() {
            visit(target);
        }
        stack.extend(node.children().into_iter().rev());
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;

    use rj_types::{DataType, TypeBindings, builtin};

    use super::{for_each_reference, has_variables, substitute};
    use crate::{Accumulator, Emitter, NodeKind, SpecNode};

    #[test]
    fn substitution_specializes_and_keeps_sharing() {
        let list = DataType::known(builtin::list(), [DataType::var("E")]);
        let element = SpecNode::type_ref(DataType::var("E"));
        let inner = SpecNode::array(
            list.clone(),
            element.clone(),
            Accumulator::list(&list, &DataType::var("E")),
            Emitter::list(&list, &DataType::var("E")),
        )
        .unwrap();
        let pair = DataType::known(builtin::list(), [list.clone()]);
        let outer = SpecNode::array(
            pair.clone(),
            inner.clone(),
            Accumulator::list(&pair, &list),
            Emitter::list(&pair, &list),
        )
        .unwrap();
        assert!(has_variables(&outer));

        let mut bindings = TypeBindings::new();
        bindings.insert("E".into(), DataType::string());
        let concrete = substitute(&outer, &bindings);
        assert!(!has_variables(&concrete));

        let NodeKind::Array(array) = concrete.kind() else {
            unreachable!()
        };
        assert_eq!(
            array.element.data_type(),
            &DataType::known(builtin::list(), [DataType::string()])
        );
        assert_eq!(
            array.accumulator.integrator.param(1),
            array.element.data_type()
        );

        let mut targets = Vec::new();
        for_each_reference(&concrete, &mut |ty| targets.push(ty.clone()));
        assert_eq!(targets, [DataType::string()]);
    }

    #[test]
    fn concrete_trees_are_returned_unchanged() {
        let spec = SpecNode::nullable(SpecNode::type_ref(DataType::string())).unwrap();
        let same = substitute(&spec, &TypeBindings::new());
        assert!(Arc::ptr_eq(&spec, &same));
    }
}
