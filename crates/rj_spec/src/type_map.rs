use alloc::vec::Vec;

use rj_types::DataType;
use rj_utils::hash::HashMap;

use crate::{BuildError, NodeKind, Spec};

/// The registry from types to their specs.
///
/// A map is append-only until [frozen](Self::freeze), and read-only
/// afterwards. References inside specs are resolved by looking their target
/// up here, so an entry may be inserted after the specs that refer to it.
///
/// # Examples
///
/// ```
/// use rj_spec::{BuildError, SpecNode, TypeMap};
/// use rj_types::DataType;
///
/// let mut map = TypeMap::new();
/// map.insert(DataType::string(), SpecNode::string()).unwrap();
/// assert!(map.get(&DataType::string()).is_ok());
///
/// map.freeze();
/// assert_eq!(
///     map.insert(DataType::object(), SpecNode::string()),
///     Err(BuildError::Frozen),
/// );
/// ```
#[derive(Clone, Debug, Default)]
pub struct TypeMap {
    entries: HashMap<DataType, Spec>,
    order: Vec<DataType>,
    unresolved: Vec<DataType>,
    frozen: bool,
}

impl TypeMap {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ty: DataType, spec: Spec) -> Result<(), BuildError> {
        if self.frozen {
            return Err(BuildError::Frozen);
        }
        if self.entries.contains_key(&ty) {
            return Err(BuildError::AlreadySpecified(ty));
        }
        self.order.push(ty.clone());
        self.entries.insert(ty, spec);
        Ok(())
    }

    /// The spec registered for `ty`.
    pub fn get(&self, ty: &DataType) -> Result<&Spec, BuildError> {
        self.entries
            .get(ty)
            .ok_or_else(|| BuildError::MissingType(ty.clone()))
    }

    #[inline]
    pub fn lookup(&self, ty: &DataType) -> Option<&Spec> {
        self.entries.get(ty)
    }

    #[inline]
    pub fn contains(&self, ty: &DataType) -> bool {
        self.entries.contains_key(ty)
    }

    /// Follows references until a node that is not a reference.
    pub fn resolve<'a>(&'a self, mut spec: &'a Spec) -> Result<&'a Spec, BuildError> {
        // A chain longer than the map is a cycle of references.
        for _ in 0..=self.entries.len() {
            match spec.kind() {
                NodeKind::TypeRef(target) => {
                    spec = self
                        .entries
                        .get(target)
                        .ok_or_else(|| BuildError::UnresolvedReference(target.clone()))?;
                }
                _ => return Ok(spec),
            }
        }
        Err(BuildError::UnresolvedReference(spec.data_type().clone()))
    }

    /// Checks that the keys of every uniform map in `spec` are written as
    /// strings, following references through this map.
    ///
    /// References without a target are left to whoever follows them.
    pub fn check_keys(&self, spec: &Spec) -> Result<(), BuildError> {
        if let NodeKind::UniformMap(node) = spec.kind()
            && !self.is_string_key(&node.key)
        {
            return Err(BuildError::InvalidKey(spec.data_type().clone()));
        }
        spec.children()
            .into_iter()
            .try_for_each(|child| self.check_keys(child))
    }

    /// [`check_keys`](Self::check_keys) for every entry.
    pub fn check_all_keys(&self) -> Result<(), BuildError> {
        self.iter().try_for_each(|(_, spec)| self.check_keys(spec))
    }

    fn is_string_key<'a>(&'a self, mut key: &'a Spec) -> bool {
        let mut hops = 0;
        loop {
            match key.kind() {
                NodeKind::TypeRef(target) => {
                    let Some(spec) = self.entries.get(target) else {
                        return true;
                    };
                    hops += 1;
                    if hops > self.entries.len() {
                        return false;
                    }
                    key = spec;
                }
                NodeKind::Converted(node) => key = &node.alternate,
                _ => return key.is_string_keyed(),
            }
        }
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&DataType, &Spec)> {
        self.order.iter().map(|ty| (ty, &self.entries[ty]))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Types the scanner met but no directive handled.
    #[inline]
    pub fn unresolved(&self) -> &[DataType] {
        &self.unresolved
    }

    pub(crate) fn mark_unresolved(&mut self, ty: DataType) {
        if !self.unresolved.contains(&ty) {
            self.unresolved.push(ty);
        }
    }

    #[inline]
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}
