//! Concurrent key-to-descriptor index with sharded locking.
//!
//! Maps cache keys to [`NodeId`] handles into the clock ring. Lookups must
//! stay cheap and must never wait on the clock lock, so the index carries its
//! own synchronization: keys are distributed across independent
//! `RwLock<FxHashMap>` shards, and every operation touches exactly one shard.
//!
//! ## Architecture
//!
//! ```text
//!   key ──► FxHasher ──► shard = hash % N
//!
//!   ┌──────────────┬──────────────┬──────────────┬──────────────┐
//!   │   shard 0    │   shard 1    │   shard 2    │   shard 3    │
//!   │ RwLock<map>  │ RwLock<map>  │ RwLock<map>  │ RwLock<map>  │
//!   │ k1 -> id_9   │ k7 -> id_2   │ k4 -> id_0   │ k2 -> id_5   │
//!   └──────────────┴──────────────┴──────────────┴──────────────┘
//! ```
//!
//! Per-key operations (`find`, `insert`, `remove`) are linearizable: they
//! hold the owning shard's lock for their whole critical section. Cross-shard
//! reads (`len`, `is_empty`) lock shards one at a time and are only exact
//! when writers are quiescent.

use std::hash::{BuildHasher, BuildHasherDefault, Hash};

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHasher};

use crate::ds::NodeId;

type FxBuild = BuildHasherDefault<FxHasher>;

/// Concurrent key index mapping `K` to a ring [`NodeId`].
///
/// A returned id may go stale the moment the shard lock is released (the
/// descriptor can be recycled by a concurrent eviction), so callers must
/// re-verify the key on the descriptor they resolve it to.
#[derive(Debug)]
pub struct ShardedIndex<K> {
    shards: Box<[RwLock<FxHashMap<K, NodeId>>]>,
    hasher: FxBuild,
}

impl<K> ShardedIndex<K>
where
    K: Eq + Hash,
{
    /// Creates an index with one shard per available core.
    pub fn new() -> Self {
        let shards = std::thread::available_parallelism()
            .map(|count| count.get())
            .unwrap_or(1);
        Self::with_shards(shards)
    }

    /// Creates an index with an explicit shard count (coerced up to 1).
    pub fn with_shards(shards: usize) -> Self {
        let count = shards.max(1);
        let shards: Vec<_> = (0..count)
            .map(|_| RwLock::new(FxHashMap::default()))
            .collect();
        Self {
            shards: shards.into_boxed_slice(),
            hasher: FxBuild::default(),
        }
    }

    fn shard_for(&self, key: &K) -> usize {
        (self.hasher.hash_one(key) as usize) % self.shards.len()
    }

    /// Returns the id bound to `key`, if any.
    pub fn find(&self, key: &K) -> Option<NodeId> {
        self.shards[self.shard_for(key)].read().get(key).copied()
    }

    /// Binds `key` to `id`, returning the previously bound id if the key was
    /// already present.
    pub fn insert(&self, key: K, id: NodeId) -> Option<NodeId> {
        self.shards[self.shard_for(&key)].write().insert(key, id)
    }

    /// Unbinds `key`, returning the id it mapped to.
    pub fn remove(&self, key: &K) -> Option<NodeId> {
        self.shards[self.shard_for(key)].write().remove(key)
    }

    /// Returns `true` if `key` is currently bound.
    pub fn contains(&self, key: &K) -> bool {
        self.shards[self.shard_for(key)].read().contains_key(key)
    }

    /// Returns the total number of bound keys across all shards.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    /// Returns `true` if no keys are bound.
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.read().is_empty())
    }

    /// Returns the number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }
}

impl<K> Default for ShardedIndex<K>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn insert_find_remove_roundtrip() {
        let index: ShardedIndex<&str> = ShardedIndex::with_shards(4);
        assert_eq!(index.insert("a", NodeId(3)), None);
        assert_eq!(index.find(&"a"), Some(NodeId(3)));
        assert!(index.contains(&"a"));
        assert_eq!(index.len(), 1);

        assert_eq!(index.remove(&"a"), Some(NodeId(3)));
        assert_eq!(index.find(&"a"), None);
        assert!(index.is_empty());
    }

    #[test]
    fn insert_overwrites_existing_binding() {
        let index: ShardedIndex<u64> = ShardedIndex::with_shards(2);
        assert_eq!(index.insert(1, NodeId(0)), None);
        assert_eq!(index.insert(1, NodeId(7)), Some(NodeId(0)));
        assert_eq!(index.find(&1), Some(NodeId(7)));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn shard_count_is_coerced_to_at_least_one() {
        let index: ShardedIndex<u64> = ShardedIndex::with_shards(0);
        assert_eq!(index.shard_count(), 1);
        index.insert(1, NodeId(0));
        assert_eq!(index.find(&1), Some(NodeId(0)));
    }

    #[test]
    fn len_sums_across_shards() {
        let index: ShardedIndex<u64> = ShardedIndex::with_shards(8);
        for key in 0..100 {
            index.insert(key, NodeId(key as usize));
        }
        assert_eq!(index.len(), 100);
    }

    #[test]
    fn concurrent_inserts_land_in_distinct_keys() {
        let index: Arc<ShardedIndex<u64>> = Arc::new(ShardedIndex::with_shards(4));
        let threads = 8;
        let per_thread = 100;

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let index = index.clone();
                thread::spawn(move || {
                    for i in 0..per_thread {
                        let key = (t * per_thread + i) as u64;
                        index.insert(key, NodeId(key as usize));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(index.len(), threads * per_thread);
        for key in 0..(threads * per_thread) as u64 {
            assert_eq!(index.find(&key), Some(NodeId(key as usize)));
        }
    }
}
