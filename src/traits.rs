//! Trait surface for concurrent caches.
//!
//! A single trait captures the operations this crate's cache exposes to
//! external callers, so generic code can accept "any shared cache" without
//! naming the concrete policy.
//!
//! ## Architecture
//!
//! ```text
//!   ┌─────────────────────────────────────────────┐
//!   │        ConcurrentCache<K, V>: Send + Sync   │
//!   │                                             │
//!   │  get(&self, &K) -> Option<Arc<V>>           │
//!   │  set(&self, K, V) -> bool                   │
//!   │  contains(&self, &K) -> bool                │
//!   │  len(&self) / is_empty(&self)               │
//!   │  capacity(&self)                            │
//!   └─────────────────────────────────────────────┘
//! ```
//!
//! ## Design Notes
//!
//! Every method takes `&self`: implementors carry their own internal
//! synchronization, so a cache can be shared behind a bare `Arc` with no
//! external lock. Values come back as `Arc<V>` because a reference could not
//! outlive whatever lock the implementation holds during the lookup.

use std::sync::Arc;

/// Shared-reference cache operations with internal synchronization.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use clockpro::policy::clock_pro::ClockProCache;
/// use clockpro::traits::ConcurrentCache;
///
/// fn warm<C: ConcurrentCache<u64, String>>(cache: &C, data: &[(u64, String)]) {
///     for (key, value) in data {
///         cache.set(*key, value.clone());
///     }
/// }
///
/// let cache = ClockProCache::new(100).unwrap();
/// warm(&cache, &[(1, "one".to_string()), (2, "two".to_string())]);
/// assert_eq!(cache.len(), 2);
/// assert_eq!(cache.get(&1), Some(Arc::new("one".to_string())));
/// ```
pub trait ConcurrentCache<K, V>: Send + Sync {
    /// Returns the value for `key` if resident, recording the access for the
    /// eviction policy.
    fn get(&self, key: &K) -> Option<Arc<V>>;

    /// Inserts or updates `key`. Returns `true` when the key was newly
    /// admitted and `false` when an existing resident entry was updated in
    /// place.
    fn set(&self, key: K, value: V) -> bool;

    /// Returns `true` if `key` is resident, without recording an access.
    fn contains(&self, key: &K) -> bool;

    /// Returns the number of resident entries.
    fn len(&self) -> usize;

    /// Returns `true` if nothing is resident.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the maximum number of resident entries.
    fn capacity(&self) -> usize;
}
