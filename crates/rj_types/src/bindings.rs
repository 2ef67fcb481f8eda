use alloc::sync::Arc;
use core::fmt;

use rj_utils::hash::HashMap;

use crate::DataType;

/// Variable bindings discovered while matching a pattern against a type.
///
/// Keys are variable names; each variable is bound at most once per match.
#[derive(Clone, Default, PartialEq)]
pub struct TypeBindings {
    map: HashMap<Arc<str>, DataType>,
}

impl TypeBindings {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&DataType> {
        self.map.get(name)
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    /// Bind `name`, replacing any previous binding.
    #[inline]
    pub fn insert(&mut self, name: Arc<str>, ty: DataType) -> Option<DataType> {
        self.map.insert(name, ty)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DataType)> {
        self.map.iter().map(|(k, v)| (&**k, v))
    }
}

impl FromIterator<(Arc<str>, DataType)> for TypeBindings {
    fn from_iter<I: IntoIterator<Item = (Arc<str>, DataType)>>(iter: I) -> Self {
        let mut bindings = Self::new();
        for (name, ty) in iter {
            bindings.insert(name, ty);
        }
        bindings
    }
}

impl fmt::Debug for TypeBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.map.iter().map(|(k, v)| (&**k, DisplayType(v))))
            .finish()
    }
}

struct DisplayType<'a>(&'a DataType);

impl fmt::Debug for DisplayType<'_> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.0, f)
    }
}
