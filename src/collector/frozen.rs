use std::collections::HashMap;
use std::hash::Hash;

/// Compute-once storage: a key goes from unset to computed exactly once and
/// is never overwritten.
#[derive(Debug)]
pub struct FrozenMap<K, V> {
    values: HashMap<K, V>,
}

/// Returned when a value is written for a key that is already frozen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlreadyFrozen;

impl<K: Eq + Hash + Copy, V> FrozenMap<K, V> {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    pub fn get(&self, key: K) -> Option<&V> {
        self.values.get(&key)
    }

    pub fn contains(&self, key: K) -> bool {
        self.values.contains_key(&key)
    }

    pub fn freeze(&mut self, key: K, value: V) -> Result<&V, AlreadyFrozen> {
        match self.values.entry(key) {
            std::collections::hash_map::Entry::Occupied(_) => Err(AlreadyFrozen),
            std::collections::hash_map::Entry::Vacant(slot) => Ok(slot.insert(value)),
        }
    }
}

impl<K: Eq + Hash + Copy, V> Default for FrozenMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
