//! Keyed collection used for every piece of model state.

use crate::error::SceneError;
use fnv::FnvHashMap;

/// Identifier of a model item, unique among its siblings.
pub type Key = u32;

/// Map from key to item with O(1) lookup.
///
/// Iteration order is unspecified; use [`Keyed::sorted_keys`] when a stable
/// order matters (display, tests).
#[derive(Clone, Debug, PartialEq)]
pub struct Keyed<T> {
    items: FnvHashMap<Key, T>,
}

impl<T> Default for Keyed<T> {
    fn default() -> Self {
        Self {
            items: FnvHashMap::default(),
        }
    }
}

impl<T> Keyed<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, key: Key) -> Option<&T> {
        self.items.get(&key)
    }

    pub fn get_mut(&mut self, key: Key) -> Option<&mut T> {
        self.items.get_mut(&key)
    }

    pub fn contains(&self, key: Key) -> bool {
        self.items.contains_key(&key)
    }

    pub fn insert(&mut self, key: Key, item: T) -> Option<T> {
        self.items.insert(key, item)
    }

    pub fn remove(&mut self, key: Key) -> Option<T> {
        self.items.remove(&key)
    }

    /// Next free key: one past the largest key in use, starting at 1.
    /// Fails once the largest key is `Key::MAX`; keys are never reused.
    pub fn next_key(&self) -> Result<Key, SceneError> {
        match self.items.keys().copied().max() {
            None => Ok(1),
            Some(k) => k.checked_add(1).ok_or(SceneError::KeysExhausted(k)),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.items.keys().copied()
    }

    pub fn sorted_keys(&self) -> Vec<Key> {
        let mut keys: Vec<Key> = self.keys().collect();
        keys.sort_unstable();
        keys
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.items.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Key, &T)> {
        self.items.iter().map(|(k, v)| (*k, v))
    }
}

impl<T> FromIterator<(Key, T)> for Keyed<T> {
    fn from_iter<I: IntoIterator<Item = (Key, T)>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_key_is_max_plus_one() {
        let mut k: Keyed<&str> = Keyed::new();
        assert_eq!(k.next_key(), Ok(1));
        k.insert(4, "a");
        k.insert(2, "b");
        assert_eq!(k.next_key(), Ok(5));
        k.remove(4);
        assert_eq!(k.next_key(), Ok(3));
    }

    #[test]
    fn next_key_reports_exhaustion_instead_of_wrapping() {
        let mut k: Keyed<&str> = Keyed::new();
        k.insert(Key::MAX, "last");
        assert_eq!(k.next_key(), Err(SceneError::KeysExhausted(Key::MAX)));
    }

    #[test]
    fn sorted_keys_are_ascending() {
        let k: Keyed<()> = [(9, ()), (1, ()), (5, ())].into_iter().collect();
        assert_eq!(k.sorted_keys(), vec![1, 5, 9]);
        assert!(k.contains(5));
        assert!(!k.contains(2));
    }
}
