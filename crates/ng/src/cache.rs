//! Bounded FIFO cache.
//!
//! A ring of `capacity` slots plus a hash index from key to slot. Inserting a
//! new key overwrites the oldest slot and drops the evicted key from the
//! index. Reads never change eviction order.

use std::collections::HashMap;
use std::hash::Hash;

/// Fixed-capacity map with oldest-insertion eviction.
#[derive(Debug, Clone)]
pub struct FifoCache<K, V> {
    slots: Vec<Option<(K, V)>>,
    index: HashMap<K, usize>,
    next: usize,
}

impl<K, V> FifoCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Create a cache holding at most `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots,
            index: HashMap::with_capacity(capacity),
            next: 0,
        }
    }

    /// Insert or replace `key`. A replaced key keeps its position in the
    /// eviction order. Returns the previous value for `key`, if any.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(&slot) = self.index.get(&key) {
            if let Some(entry) = self.slots[slot].as_mut() {
                return Some(std::mem::replace(&mut entry.1, value));
            }
        }

        let slot = self.next;
        if let Some((evicted, _)) = self.slots[slot].take() {
            self.index.remove(&evicted);
        }
        self.index.insert(key.clone(), slot);
        self.slots[slot] = Some((key, value));
        self.next = (slot + 1) % self.slots.len();
        None
    }

    /// Value for `key`.
    pub fn get(&self, key: &K) -> Option<&V> {
        let slot = *self.index.get(key)?;
        self.slots[slot].as_ref().map(|(_, v)| v)
    }

    /// Whether `key` is cached.
    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Remove `key`, freeing its slot.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let slot = self.index.remove(key)?;
        self.slots[slot].take().map(|(_, v)| v)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.index.clear();
        self.next = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_oldest() {
        let mut cache = FifoCache::new(2);
        cache.insert(1, "a");
        cache.insert(2, "b");
        cache.insert(3, "c");
        assert!(!cache.contains(&1));
        assert_eq!(cache.get(&2), Some(&"b"));
        assert_eq!(cache.get(&3), Some(&"c"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_reads_do_not_refresh() {
        let mut cache = FifoCache::new(2);
        cache.insert(1, ());
        cache.insert(2, ());
        assert!(cache.get(&1).is_some());
        cache.insert(3, ());
        assert!(!cache.contains(&1));
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut cache = FifoCache::new(2);
        cache.insert(1, 10);
        cache.insert(2, 20);
        assert_eq!(cache.insert(1, 11), Some(10));
        cache.insert(3, 30);
        assert!(!cache.contains(&1));
        assert_eq!(cache.get(&2), Some(&20));
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let mut cache = FifoCache::new(0);
        cache.insert("x", 1);
        cache.insert("y", 2);
        assert_eq!(cache.capacity(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&"y"));
    }

    #[test]
    fn test_remove_frees_entry() {
        let mut cache = FifoCache::new(2);
        cache.insert(1, 10);
        cache.insert(2, 20);
        assert_eq!(cache.remove(&1), Some(10));
        assert_eq!(cache.remove(&1), None);
        assert_eq!(cache.len(), 1);
        cache.insert(3, 30);
        assert_eq!(cache.get(&2), Some(&20));
        assert_eq!(cache.get(&3), Some(&30));
    }

    #[test]
    fn test_clear() {
        let mut cache = FifoCache::new(3);
        cache.insert(1, 1);
        cache.clear();
        assert!(cache.is_empty());
        cache.insert(2, 2);
        assert_eq!(cache.get(&2), Some(&2));
    }
}
