//! Post-scan rewrite of a type map.

use rj_types::DataType;

use crate::transform::{Rewrite, Rewriter};
use crate::{NodeKind, Spec, TypeMap, TypedFn};

struct InlineScalars<'a>(&'a TypeMap);

impl Rewrite for InlineScalars<'_> {
    #[inline]
    fn data_type(&mut self, ty: &DataType) -> DataType {
        ty.clone()
    }

    #[inline]
    fn function<F: ?Sized>(&mut self, f: &TypedFn<F>) -> TypedFn<F> {
        f.clone()
    }

    fn replace(&mut self, spec: &Spec) -> Option<Spec> {
        match spec.kind() {
            NodeKind::TypeRef(target) => Some(
                self.0
                    .lookup(target)
                    .filter(|target| target.is_scalar())
                    .unwrap_or(spec)
                    .clone(),
            ),
            _ if spec.is_scalar() => Some(spec.clone()),
            _ => None,
        }
    }
}

/// Replaces every reference to a scalar spec with the scalar itself.
///
/// The result is frozen and maps the same types; nodes shared in `map`
/// remain shared.
pub fn optimize(map: &TypeMap) -> TypeMap {
    let mut rewriter = Rewriter::new(InlineScalars(map));
    let mut out = TypeMap::new();
    for (ty, spec) in map.iter() {
        let spec = rewriter.rewrite(spec);
        // Keys are unique in `map` and `out` is not frozen yet.
        let inserted = out.insert(ty.clone(), spec);
        debug_assert!(inserted.is_ok());
    }
    for ty in map.unresolved() {
        out.mark_unresolved(ty.clone());
    }
    out.freeze();
    log::debug!("optimized {} types", out.len());
    out
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;

    use rj_types::{DataType, builtin};

    use super::optimize;
    use crate::{CodecConfig, NodeKind, TypeScanner};

    #[test]
    fn scalar_references_are_inlined() {
        let names = DataType::known(builtin::list(), [DataType::string()]);
        let mut scanner = TypeScanner::new(CodecConfig::new());
        scanner.scan(&names).unwrap();
        let map = scanner.build().unwrap();

        let optimized = optimize(&map);
        assert!(optimized.is_frozen());
        assert_eq!(optimized.len(), map.len());
        let NodeKind::Array(array) = optimized.get(&names).unwrap().kind() else {
            panic!("not an array")
        };
        assert!(matches!(array.element.kind(), NodeKind::Str));
        assert!(Arc::ptr_eq(
            &array.element,
            optimized.get(&DataType::string()).unwrap()
        ));
    }

    #[test]
    fn references_to_containers_stay() {
        let nested = DataType::known(
            builtin::list(),
            [DataType::known(builtin::list(), [DataType::string()])],
        );
        let mut scanner = TypeScanner::new(CodecConfig::new().optimize(true));
        scanner.scan(&nested).unwrap();
        let map = scanner.build().unwrap();
        let NodeKind::Array(array) = map.get(&nested).unwrap().kind() else {
            panic!("not an array")
        };
        assert!(matches!(array.element.kind(), NodeKind::TypeRef(_)));
    }
}
