use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::vec::Vec;

use rj_types::{ClassRef, DataType};
use rj_utils::hash::{HashMap, HashSet};

use crate::{BuildError, Bundle, CodecConfig, RuleContext, Spec, TypeMap, optimize, transform};

/// Derives specs for types by matching them against bundles of directives.
///
/// Each scanned type is looked up in order among:
///
/// 1. specs registered with [`specify`](Self::specify),
/// 2. the bundles added with [`add_bundle`](Self::add_bundle), in the order
///    they were added,
/// 3. the built-in bundle.
///
/// The first directive that matches produces the type's spec. Every type the
/// spec refers to is scanned in turn, unless the configuration asks for a
/// shallow scan.
///
/// # Examples
///
/// ```
/// use rj_spec::{CodecConfig, NodeKind, TypeScanner};
/// use rj_types::{builtin, DataType};
///
/// let names = DataType::known(builtin::list(), [DataType::string()]);
///
/// let mut scanner = TypeScanner::new(CodecConfig::new());
/// scanner.scan(&names).unwrap();
/// let map = scanner.build().unwrap();
///
/// assert!(matches!(map.get(&names).unwrap().kind(), NodeKind::Array(_)));
/// assert!(matches!(map.get(&DataType::string()).unwrap().kind(), NodeKind::Str));
/// ```
pub struct TypeScanner {
    config: CodecConfig,
    bundles: Vec<Bundle>,
    builtin: Bundle,
    explicit: HashMap<DataType, Spec>,
    overrides: HashMap<(ClassRef, Box<str>), Spec>,
    grants: HashSet<ClassRef>,
    queue: VecDeque<DataType>,
    queued: HashSet<DataType>,
    map: TypeMap,
}

impl TypeScanner {
    pub fn new(config: CodecConfig) -> Self {
        Self {
            config,
            bundles: Vec::new(),
            builtin: crate::builtin::bundle(),
            explicit: rj_utils::hash::new_map(),
            overrides: rj_utils::hash::new_map(),
            grants: rj_utils::hash::new_set(),
            queue: VecDeque::new(),
            queued: rj_utils::hash::new_set(),
            map: TypeMap::new(),
        }
    }

    #[inline]
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Register a bundle. Its pre-scan types are queued immediately.
    pub fn add_bundle(&mut self, bundle: Bundle) {
        log::debug!("adding bundle `{}`", bundle.name());
        self.grants.extend(bundle.grants().iter().copied());
        for ty in bundle.prescan_types() {
            self.enqueue(ty.clone());
        }
        self.bundles.push(bundle);
    }

    /// Use `spec` for `ty` instead of asking the bundles.
    pub fn specify(&mut self, ty: DataType, spec: Spec) -> Result<(), BuildError> {
        if !spec.data_type().accepts(&ty, true) {
            return Err(BuildError::SpecMismatch {
                ty,
                spec: spec.data_type().clone(),
            });
        }
        if self.map.contains(&ty) || self.explicit.contains_key(&ty) {
            return Err(BuildError::AlreadySpecified(ty));
        }
        self.explicit.insert(ty, spec);
        Ok(())
    }

    /// Use `spec` for one member of every record of `class`, keeping the
    /// built-in rule for the others.
    pub fn specify_record_fields(
        &mut self,
        class: ClassRef,
        field: &str,
        spec: Spec,
    ) -> Result<(), BuildError> {
        if class.field_index(field).is_none() {
            return Err(BuildError::UnknownField {
                class,
                field: field.into(),
            });
        }
        self.overrides.insert((class, field.into()), spec);
        Ok(())
    }

    /// Scan `ty` and, unless the scan is shallow, the types it refers to.
    pub fn scan(&mut self, ty: &DataType) -> Result<(), BuildError> {
        self.enqueue(ty.clone());
        self.drain()
    }

    /// Finish scanning and freeze the map.
    ///
    /// # Errors
    ///
    /// [`BuildError::InvalidKey`] if a uniform map's key refers to a type
    /// whose values are not written as strings.
    pub fn build(mut self) -> Result<TypeMap, BuildError> {
        self.drain()?;
        let mut map = self.map;
        map.freeze();
        map.check_all_keys()?;
        log::debug!(
            "scanned {} types, {} unresolved",
            map.len(),
            map.unresolved().len()
        );
        if self.config.optimize {
            map = optimize::optimize(&map);
        }
        Ok(map)
    }

    // ------------------------------------------------------------------
    // Internal

    fn enqueue(&mut self, ty: DataType) {
        if !self.map.contains(&ty) && self.queued.insert(ty.clone()) {
            self.queue.push_back(ty);
        }
    }

    fn drain(&mut self) -> Result<(), BuildError> {
        while let Some(ty) = self.queue.pop_front() {
            self.queued.remove(&ty);
            if self.map.contains(&ty) {
                continue;
            }
            log::trace!("scanning `{ty}`");
            let Some(spec) = self.derive(&ty)? else {
                log::warn!("no directive handles type `{ty}`");
                self.map.mark_unresolved(ty);
                continue;
            };
            if !self.config.shallow_scan {
                let mut referenced = Vec::new();
                transform::for_each_reference(&spec, &mut |target| referenced.push(target.clone()));
                for target in referenced {
                    if target != ty {
                        self.enqueue(target);
                    }
                }
            }
            self.map.insert(ty, spec)?;
        }
        Ok(())
    }

    fn derive(&self, ty: &DataType) -> Result<Option<Spec>, BuildError> {
        if let Some(spec) = self.explicit.get(ty) {
            return Ok(Some(spec.clone()));
        }
        for bundle in self.bundles.iter().chain([&self.builtin]) {
            let Some((directive, bindings)) = bundle.find(ty) else {
                continue;
            };
            log::trace!(
                "`{ty}` matched `{}` of bundle `{}`",
                directive.name(),
                bundle.name()
            );
            let cx = RuleContext {
                bindings: &bindings,
                config: &self.config,
                overrides: &self.overrides,
                grants: &self.grants,
            };
            let spec = directive.apply(&cx, ty)?;
            let spec = if bindings.is_empty() {
                spec
            } else {
                transform::substitute(&spec, &bindings)
            };
            if !spec.data_type().accepts(ty, true) {
                return Err(BuildError::SpecMismatch {
                    ty: ty.clone(),
                    spec: spec.data_type().clone(),
                });
            }
            return Ok(Some(spec));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;

    use rj_types::{ClassInfo, DataType, FieldInfo, PrimitiveKind, builtin};

    use super::TypeScanner;
    use crate::{
        BuildError, Bundle, CodecConfig, Directive, MapAccumulator, MapEmitter, NodeKind, SpecNode,
    };

    fn node_class() -> rj_types::ClassRef {
        let node = ClassInfo::builder("Node").declare();
        node.define_record([
            FieldInfo::new("name", DataType::string()),
            FieldInfo::new(
                "children",
                DataType::known(builtin::list(), [DataType::class(node)]),
            ),
        ])
        .unwrap();
        node
    }

    #[test]
    fn recursive_types_refer_to_themselves() {
        let node = DataType::class(node_class());
        let mut scanner = TypeScanner::new(CodecConfig::new());
        scanner.scan(&node).unwrap();
        let map = scanner.build().unwrap();

        assert_eq!(map.len(), 3);
        assert!(map.unresolved().is_empty());
        let children = DataType::known(builtin::list(), [node.clone()]);
        let NodeKind::Array(array) = map.get(&children).unwrap().kind() else {
            panic!("children is not an array")
        };
        assert!(matches!(array.element.kind(), NodeKind::TypeRef(ty) if *ty == node));
        assert!(map.is_frozen());
    }

    #[test]
    fn user_bundles_come_before_the_builtin_one() {
        let text = DataType::string();
        let mut scanner = TypeScanner::new(CodecConfig::new());
        let custom = Directive::new("text", text.clone(), |_, _| {
            SpecNode::nullable(SpecNode::string())
        });
        scanner.add_bundle(Bundle::new("custom").directive(custom));
        scanner.scan(&text).unwrap();
        let map = scanner.build().unwrap();
        assert!(matches!(
            map.get(&text).unwrap().kind(),
            NodeKind::Nullable(_)
        ));
    }

    #[test]
    fn rules_must_produce_a_fitting_spec() {
        let text = DataType::string();
        let mut scanner = TypeScanner::new(CodecConfig::new());
        let broken = Directive::new("text", text.clone(), |_, _| Ok(SpecNode::character(true)));
        scanner.add_bundle(Bundle::new("broken").directive(broken));
        assert!(matches!(
            scanner.scan(&text),
            Err(BuildError::SpecMismatch { .. })
        ));
    }

    #[test]
    fn explicit_specs_must_accept_the_type() {
        let mut scanner = TypeScanner::new(CodecConfig::new());
        let err = scanner
            .specify(DataType::string(), SpecNode::number(PrimitiveKind::I32))
            .unwrap_err();
        assert!(matches!(err, BuildError::SpecMismatch { .. }));

        let shared = SpecNode::string();
        scanner.specify(DataType::string(), shared.clone()).unwrap();
        scanner.scan(&DataType::string()).unwrap();
        let map = scanner.build().unwrap();
        assert!(Arc::ptr_eq(map.get(&DataType::string()).unwrap(), &shared));
    }

    #[test]
    fn unknown_fields_cannot_be_overridden() {
        let mut scanner = TypeScanner::new(CodecConfig::new());
        let err = scanner
            .specify_record_fields(node_class(), "parent", SpecNode::string())
            .unwrap_err();
        assert!(matches!(err, BuildError::UnknownField { .. }));
    }

    #[test]
    fn restricted_records_need_a_grant() {
        let secret = ClassInfo::builder("Secret")
            .restricted()
            .record([FieldInfo::new("code", PrimitiveKind::I32.into())]);
        let ty = DataType::class(secret);

        let mut scanner = TypeScanner::new(CodecConfig::new());
        assert_eq!(scanner.scan(&ty), Err(BuildError::AccessDenied(secret)));

        let mut scanner = TypeScanner::new(CodecConfig::new());
        scanner.add_bundle(Bundle::new("vault").grant(secret).prescan(ty.clone()));
        let map = scanner.build().unwrap();
        assert!(map.contains(&ty));
    }

    #[test]
    fn unhandled_types_are_recorded() {
        let opaque = ClassInfo::builder("Handle").opaque();
        let list = DataType::known(builtin::list(), [DataType::class(opaque)]);
        let mut scanner = TypeScanner::new(CodecConfig::new());
        scanner.scan(&list).unwrap();
        let map = scanner.build().unwrap();
        assert_eq!(map.unresolved(), [DataType::class(opaque)]);
        assert!(map.get(&DataType::class(opaque)).is_err());
    }

    #[test]
    fn map_keys_must_resolve_to_strings() {
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

        let mut scanner = TypeScanner::new(CodecConfig::new());
        scanner.specify(ty.clone(), spec).unwrap();
        scanner.scan(&ty).unwrap();
        assert_eq!(scanner.build().unwrap_err(), BuildError::InvalidKey(ty));
    }

    #[test]
    fn shallow_scans_stop_at_references() {
        let list = DataType::known(builtin::list(), [DataType::string()]);
        let mut scanner = TypeScanner::new(CodecConfig::new().shallow_scan(true));
        scanner.scan(&list).unwrap();
        let map = scanner.build().unwrap();
        assert_eq!(map.len(), 1);
        assert!(!map.contains(&DataType::string()));
    }
}
