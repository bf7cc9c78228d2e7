//! Transposition cache: state fingerprint to search node.
//!
//! Lets the effort spent at one decision seed a later decision that reaches
//! an equivalent position. Bounded, with least-recently-used eviction.
//!
//! The cache only stores node ids. Whether a hit is still consistent with
//! the live choice set is checked by the caller.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use super::node::NodeId;

#[derive(Clone, Copy, Debug)]
struct Entry {
    node: NodeId,
    stamp: u64,
}

/// Bounded LRU map from 64-bit fingerprints to node ids.
#[derive(Clone, Debug)]
pub struct TranspositionCache {
    capacity: usize,
    entries: FxHashMap<u64, Entry>,
    /// Access stamp to fingerprint, oldest first.
    recency: BTreeMap<u64, u64>,
    clock: u64,
}

impl TranspositionCache {
    /// Create a cache holding at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: FxHashMap::default(),
            recency: BTreeMap::new(),
            clock: 0,
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Look up a fingerprint, marking it most recently used.
    pub fn get(&mut self, fingerprint: u64) -> Option<NodeId> {
        let stamp = self.tick();
        let entry = self.entries.get_mut(&fingerprint)?;
        self.recency.remove(&entry.stamp);
        entry.stamp = stamp;
        self.recency.insert(stamp, fingerprint);
        Some(entry.node)
    }

    /// Look up a fingerprint without touching recency.
    #[must_use]
    pub fn peek(&self, fingerprint: u64) -> Option<NodeId> {
        self.entries.get(&fingerprint).map(|e| e.node)
    }

    /// Insert or replace an entry.
    ///
    /// Returns the entry pushed out to make room, if any. With zero
    /// capacity nothing is stored and the new entry itself is returned.
    pub fn put(&mut self, fingerprint: u64, node: NodeId) -> Option<(u64, NodeId)> {
        if self.capacity == 0 {
            return Some((fingerprint, node));
        }

        let stamp = self.tick();
        if let Some(entry) = self.entries.get_mut(&fingerprint) {
            self.recency.remove(&entry.stamp);
            entry.node = node;
            entry.stamp = stamp;
            self.recency.insert(stamp, fingerprint);
            return None;
        }

        let mut evicted = None;
        if self.entries.len() >= self.capacity {
            if let Some((_, oldest)) = self.recency.pop_first() {
                evicted = self.entries.remove(&oldest).map(|e| (oldest, e.node));
            }
        }

        self.entries.insert(fingerprint, Entry { node, stamp });
        self.recency.insert(stamp, fingerprint);
        evicted
    }

    /// Remove an entry.
    pub fn remove(&mut self, fingerprint: u64) -> Option<NodeId> {
        let entry = self.entries.remove(&fingerprint)?;
        self.recency.remove(&entry.stamp);
        Some(entry.node)
    }

    /// Rewrite node ids after arena compaction; entries whose node was
    /// dropped are removed.
    pub fn remap(&mut self, mapping: &FxHashMap<NodeId, NodeId>) {
        let recency = &mut self.recency;
        self.entries.retain(|_, entry| match mapping.get(&entry.node) {
            Some(&new) => {
                entry.node = new;
                true
            }
            None => {
                recency.remove(&entry.stamp);
                false
            }
        });
    }

    /// All cached node ids, oldest first.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.recency
            .values()
            .filter_map(|fp| self.entries.get(fp).map(|e| e.node))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let mut cache = TranspositionCache::new(4);
        cache.put(0xF, NodeId::new(3));

        assert_eq!(cache.get(0xF), Some(NodeId::new(3)));
        assert_eq!(cache.get(0xE), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_put_replaces() {
        let mut cache = TranspositionCache::new(2);
        assert_eq!(cache.put(1, NodeId::new(1)), None);
        assert_eq!(cache.put(1, NodeId::new(9)), None);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.peek(1), Some(NodeId::new(9)));
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let mut cache = TranspositionCache::new(2);
        cache.put(1, NodeId::new(1));
        cache.put(2, NodeId::new(2));

        // Touch 1 so that 2 becomes the oldest
        assert!(cache.get(1).is_some());

        let evicted = cache.put(3, NodeId::new(3));
        assert_eq!(evicted, Some((2, NodeId::new(2))));
        assert_eq!(cache.peek(2), None);
        assert_eq!(cache.peek(1), Some(NodeId::new(1)));
        assert_eq!(cache.peek(3), Some(NodeId::new(3)));
    }

    #[test]
    fn test_peek_does_not_refresh() {
        let mut cache = TranspositionCache::new(2);
        cache.put(1, NodeId::new(1));
        cache.put(2, NodeId::new(2));

        let _ = cache.peek(1);
        let evicted = cache.put(3, NodeId::new(3));
        assert_eq!(evicted, Some((1, NodeId::new(1))));
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let mut cache = TranspositionCache::new(0);
        assert_eq!(cache.put(1, NodeId::new(1)), Some((1, NodeId::new(1))));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cache = TranspositionCache::new(3);
        cache.put(1, NodeId::new(1));
        cache.put(2, NodeId::new(2));

        assert_eq!(cache.remove(1), Some(NodeId::new(1)));
        assert_eq!(cache.remove(1), None);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.nodes().count(), 0);
    }

    #[test]
    fn test_remap_drops_missing_nodes() {
        let mut cache = TranspositionCache::new(3);
        cache.put(1, NodeId::new(10));
        cache.put(2, NodeId::new(20));

        let mut mapping = FxHashMap::default();
        mapping.insert(NodeId::new(20), NodeId::new(0));
        cache.remap(&mapping);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.peek(2), Some(NodeId::new(0)));
        assert_eq!(cache.nodes().collect::<Vec<_>>(), vec![NodeId::new(0)]);
    }
}
