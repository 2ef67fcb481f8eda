//! Provide hash containers, re-exports *hashbrown* and *foldhash*.

// -----------------------------------------------------------------------------
// Exports

/// The hash state of every container here.
///
/// Hashes depend only on the input, never on per-process random state.
pub type FixedHashState = foldhash::fast::FixedState;

/// A [`hashbrown::HashMap`] using [`FixedHashState`] by default.
pub type HashMap<K, V, S = FixedHashState> = hashbrown::HashMap<K, V, S>;

/// A [`hashbrown::HashSet`] using [`FixedHashState`] by default.
pub type HashSet<T, S = FixedHashState> = hashbrown::HashSet<T, S>;

/// Creates an empty [`HashMap`] with the fixed hash state.
///
/// # Examples
///
/// ```
/// let mut map = rj_utils::hash::new_map::<&str, i32>();
/// map.insert("a", 1);
/// assert_eq!(map.get("a"), Some(&1));
/// ```
#[inline]
pub fn new_map<K, V>() -> HashMap<K, V> {
    HashMap::default()
}

/// Creates an empty [`HashSet`] with the fixed hash state.
#[inline]
pub fn new_set<T>() -> HashSet<T> {
    HashSet::default()
}

/// Creates an empty [`HashMap`] with room for at least `capacity` entries.
#[inline]
pub fn map_with_capacity<K, V>(capacity: usize) -> HashMap<K, V> {
    HashMap::with_capacity_and_hasher(capacity, FixedHashState::default())
}

// -----------------------------------------------------------------------------
// Re-export crates

pub use foldhash;
pub use hashbrown;
