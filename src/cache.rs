use std::collections::BTreeMap;

use rustc_hash::{FxBuildHasher, FxHashMap};
use tracing::trace;

use crate::node::NodeId;

/// Identity of one rendered row: the node plus the interaction state that
/// changes its appearance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RowKey {
    pub id: NodeId,
    pub selected: bool,
    pub expanded: bool,
}

impl RowKey {
    pub const fn new(id: NodeId, selected: bool, expanded: bool) -> Self {
        Self {
            id,
            selected,
            expanded,
        }
    }
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    stamp: u64,
}

/// Memoized per-row render output with a hard entry limit.
///
/// When full, inserting evicts the least recently used entry. Only the owner
/// mutates the cache; readers that must not disturb recency use [`peek`].
///
/// [`peek`]: RenderCache::peek
#[derive(Debug)]
pub struct RenderCache<V> {
    entries: FxHashMap<RowKey, Entry<V>>,
    // Recency order: oldest stamp first.
    order: BTreeMap<u64, RowKey>,
    capacity: usize,
    clock: u64,
    hits: u64,
    misses: u64,
}

impl<V> RenderCache<V> {
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "render cache capacity must be at least 1");
        Self {
            entries: FxHashMap::with_capacity_and_hasher(capacity, FxBuildHasher),
            order: BTreeMap::new(),
            capacity,
            clock: 0,
            hits: 0,
            misses: 0,
        }
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `(hits, misses)` since creation.
    pub const fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    pub fn contains(&self, key: &RowKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Looks up a value without touching its recency.
    pub fn peek(&self, key: &RowKey) -> Option<&V> {
        self.entries.get(key).map(|entry| &entry.value)
    }

    /// Looks up a value and marks it most recently used.
    pub fn get(&mut self, key: &RowKey) -> Option<&V> {
        let stamp = self.tick();
        let entry = self.entries.get_mut(key)?;
        self.order.remove(&entry.stamp);
        self.order.insert(stamp, *key);
        entry.stamp = stamp;
        Some(&entry.value)
    }

    /// Stores a value, evicting the least recently used entry when full.
    pub fn insert(&mut self, key: RowKey, value: V) {
        let stamp = self.tick();
        if let Some(old) = self.entries.insert(key, Entry { value, stamp }) {
            self.order.remove(&old.stamp);
        }
        self.order.insert(stamp, key);
        while self.entries.len() > self.capacity {
            let Some((_, oldest)) = self.order.pop_first() else {
                break;
            };
            self.entries.remove(&oldest);
            trace!(node = %oldest.id, "render cache evicted row");
        }
    }

    /// Returns the cached value or renders, stores and returns a new one.
    pub fn get_or_insert_with(&mut self, key: RowKey, render: impl FnOnce() -> V) -> &V {
        if self.entries.contains_key(&key) {
            self.hits += 1;
        } else {
            self.misses += 1;
            self.insert(key, render());
        }
        // Present either way: a fresh insert is the newest entry and is never evicted.
        self.get(&key)
            .unwrap_or_else(|| unreachable!("row {key:?} missing right after insert"))
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            trace!(entries = self.entries.len(), "render cache cleared");
        }
        self.entries.clear();
        self.order.clear();
    }

    const fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(idx: u32) -> RowKey {
        RowKey::new(NodeId(idx), false, false)
    }

    #[test]
    fn never_exceeds_capacity() {
        let mut cache = RenderCache::new(3);
        for idx in 0..10 {
            cache.insert(key(idx), idx);
            assert!(cache.len() <= 3);
        }
        assert_eq!(cache.len(), 3);
        assert!(cache.contains(&key(9)));
        assert!(!cache.contains(&key(6)));
    }

    #[test]
    fn evicts_least_recently_used() {
        let mut cache = RenderCache::new(2);
        cache.insert(key(1), "one");
        cache.insert(key(2), "two");
        assert_eq!(cache.get(&key(1)), Some(&"one"));
        cache.insert(key(3), "three");

        assert!(cache.contains(&key(1)));
        assert!(!cache.contains(&key(2)));
        assert!(cache.contains(&key(3)));
    }

    #[test]
    fn peek_does_not_refresh() {
        let mut cache = RenderCache::new(2);
        cache.insert(key(1), 1);
        cache.insert(key(2), 2);
        assert_eq!(cache.peek(&key(1)), Some(&1));
        cache.insert(key(3), 3);
        assert!(!cache.contains(&key(1)));
    }

    #[test]
    fn interaction_state_is_part_of_the_key() {
        let mut cache = RenderCache::new(4);
        let plain = RowKey::new(NodeId(1), false, false);
        let selected = RowKey::new(NodeId(1), true, false);
        cache.insert(plain, "plain");
        cache.insert(selected, "selected");
        assert_eq!(cache.peek(&plain), Some(&"plain"));
        assert_eq!(cache.peek(&selected), Some(&"selected"));
    }

    #[test]
    fn get_or_insert_with_renders_once() {
        let mut cache = RenderCache::new(4);
        let mut renders = 0;
        for _ in 0..3 {
            let value = *cache.get_or_insert_with(key(7), || {
                renders += 1;
                42
            });
            assert_eq!(value, 42);
        }
        assert_eq!(renders, 1);
        assert_eq!(cache.stats(), (2, 1));
    }

    #[test]
    fn reinsert_replaces_without_growing() {
        let mut cache = RenderCache::new(2);
        cache.insert(key(1), 1);
        cache.insert(key(1), 10);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.peek(&key(1)), Some(&10));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    #[should_panic(expected = "capacity must be at least 1")]
    fn zero_capacity_panics() {
        let _ = RenderCache::<u8>::new(0);
    }
}
