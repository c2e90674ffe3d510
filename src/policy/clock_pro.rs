//! CLOCK-Pro cache replacement policy.
//!
//! An approximation of LIRS built on a single circular list of page
//! descriptors and three clock hands. Compared to plain Clock it is scan
//! resistant: one-shot scans churn through cold pages while pages with
//! demonstrated reuse are held hot, and a ring of non-resident test pages
//! detects reuse that plain Clock would have already forgotten.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │                       ClockProCache<K, V> Layout                      │
//! │                                                                       │
//! │   ┌─────────────────────────────────────────────────────────────────┐ │
//! │   │  index: ShardedIndex<K>        (key -> NodeId, own locking)     │ │
//! │   └─────────────────────────────────────────────────────────────────┘ │
//! │                                                                       │
//! │   ┌── clock: RwLock<Clock<K, V>> ───────────────────────────────────┐ │
//! │   │                                                                 │ │
//! │   │        ┌────┐      ┌────┐      ┌────┐      ┌────┐               │ │
//! │   │   ┌───►│HOT │─────►│cold│─────►│TEST│─────►│cold│────┐          │ │
//! │   │   │    └────┘      └────┘      └────┘      └────┘    │          │ │
//! │   │   └──────────────────────────────────────────────────┘          │ │
//! │   │          ▲            ▲           ▲                             │ │
//! │   │       hand_hot     hand_cold   hand_test                        │ │
//! │   │                                                                 │ │
//! │   │   count_hot / count_cold / count_test,  cold_capacity           │ │
//! │   └─────────────────────────────────────────────────────────────────┘ │
//! │                                                                       │
//! │   Cold: resident, on probation — evicted to Test if not re-referenced │
//! │   Hot:  resident, protected    — demoted by hand_hot second chances   │
//! │   Test: non-resident history   — re-reference admits straight to Hot  │
//! └───────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm
//!
//! ```text
//! GET(key):
//!   resolve key through the index; Test pages answer miss
//!   set the descriptor's reference bit (relaxed) and hand out the value
//!
//! SET(key, value):
//!   miss              -> admit as Cold behind hand_hot (evicting first)
//!   hit on Test page  -> grow cold_capacity, re-admit as Hot
//!   hit on Cold/Hot   -> overwrite value in place, set reference bit
//!
//! EVICT (hand_cold), while residents would exceed capacity:
//!   Cold + ref        -> promote to Hot (reuse on probation)
//!   Cold + no ref     -> demote to Test, then prune Test overflow
//!   afterwards, run hand_hot until count_hot fits capacity-cold_capacity
//!
//! hand_hot:  Hot + ref -> clear ref;  Hot + no ref -> demote to Cold
//! hand_test: Test      -> forget the page, shrink cold_capacity
//! ```
//!
//! The `cold_capacity` target adapts the hot/cold split to the workload:
//! every Test hit means a cold page was evicted too eagerly (keep more
//! cold), every Test page that ages out unused means history was kept too
//! long (keep more hot).
//!
//! ## Concurrency
//!
//! `get` takes only a short read lock on the clock: it flips the atomic
//! reference bit and clones out the `Arc` value, mutating no ring
//! structure. `set` serializes on the write lock for every path that
//! touches the ring, hands, counts, or `cold_capacity`; the value
//! allocation happens before the lock is taken.
//!
//! ## Example Usage
//!
//! ```
//! use clockpro::policy::clock_pro::ClockProCache;
//!
//! let cache: ClockProCache<String, String> = ClockProCache::new(100).unwrap();
//!
//! // New admissions start cold
//! assert!(cache.set("page1".to_string(), "content1".to_string()));
//! assert!(cache.set("page2".to_string(), "content2".to_string()));
//!
//! // Access marks reuse; the hands promote marked cold pages to hot
//! assert!(cache.get(&"page1".to_string()).is_some());
//!
//! // Updating a resident entry is not a new admission
//! assert!(!cache.set("page1".to_string(), "content1b".to_string()));
//! assert_eq!(
//!     cache.get(&"page1".to_string()).as_deref(),
//!     Some(&"content1b".to_string())
//! );
//! ```

use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::ds::{NodeId, Ring};
use crate::error::{Hand, InvalidCapacity, InvariantError};
use crate::index::ShardedIndex;

/// Smallest admissible capacity: below this the three hands cannot separate.
pub const MIN_CAPACITY: usize = 3;

/// Classification of a tracked page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageType {
    /// Non-resident history entry for a recently evicted cold page.
    Test,
    /// Resident page on probation.
    Cold,
    /// Resident page with demonstrated reuse.
    Hot,
}

/// Page descriptor: the payload of one ring node.
#[derive(Debug)]
struct Page<K, V> {
    key: K,
    /// Present iff the page is resident (`Cold` or `Hot`).
    value: Option<Arc<V>>,
    ptype: PageType,
    /// CLOCK reference bit. Written by `get` under the read lock, which is
    /// why it is atomic; relaxed ordering suffices for a hint the hands
    /// consume under the write lock.
    referenced: AtomicBool,
}

impl<K, V> Page<K, V> {
    fn new_cold(key: K, value: Arc<V>) -> Self {
        Self {
            key,
            value: Some(value),
            ptype: PageType::Cold,
            referenced: AtomicBool::new(false),
        }
    }

    fn is_referenced(&self) -> bool {
        self.referenced.load(Ordering::Relaxed)
    }
}

/// Clock state: everything the write lock protects.
#[derive(Debug)]
struct Clock<K, V> {
    ring: Ring<Page<K, V>>,
    hand_hot: Option<NodeId>,
    hand_cold: Option<NodeId>,
    hand_test: Option<NodeId>,
    count_hot: usize,
    count_cold: usize,
    count_test: usize,
    capacity: usize,
    /// Adaptive target for cold residents, kept in `1..=capacity`.
    cold_capacity: usize,
}

impl<K, V> Clock<K, V>
where
    K: Clone + Eq + Hash,
{
    /// Admits a detached page into the ring just behind `hand_hot`, evicting
    /// first so the resident budget holds.
    fn meta_add(&mut self, page: Page<K, V>, index: &ShardedIndex<K>) -> NodeId {
        self.evict(index);
        match self.hand_hot {
            None => {
                let id = self.ring.insert_first(page);
                self.hand_hot = Some(id);
                self.hand_cold = Some(id);
                self.hand_test = Some(id);
                id
            },
            Some(hot) => {
                let id = self.ring.insert_after(hot, page);
                // Hands parked on hand_hot keep their logical sweep position:
                // they move to the element that was hand_hot's successor.
                let after = self.ring.next(id);
                if self.hand_cold == Some(hot) {
                    self.hand_cold = Some(after);
                }
                if self.hand_test == Some(hot) {
                    self.hand_test = Some(after);
                }
                self.hand_hot = Some(after);
                id
            },
        }
    }

    /// Detaches the page at `id` from ring and index and returns it. Hands
    /// resting on the departing node move to its successor; an emptied ring
    /// clears all hands.
    fn meta_del(&mut self, id: NodeId, index: &ShardedIndex<K>) -> Page<K, V> {
        let next = self.ring.next(id);
        if self.hand_hot == Some(id) {
            self.hand_hot = Some(next);
        }
        if self.hand_cold == Some(id) {
            self.hand_cold = Some(next);
        }
        if self.hand_test == Some(id) {
            self.hand_test = Some(next);
        }
        let page = self
            .ring
            .remove(id)
            .expect("meta_del target is in the ring");
        if self.ring.is_empty() {
            self.hand_hot = None;
            self.hand_cold = None;
            self.hand_test = None;
        }
        index.remove(&page.key);
        page
    }

    /// Frees resident slots until `count_hot + count_cold < capacity`.
    ///
    /// Terminates: each sweep either promotes a referenced cold page
    /// (clearing its bit) or demotes an unreferenced one, and the ring is
    /// finite, so a demotion that shrinks the resident count is always
    /// reached.
    fn evict(&mut self, index: &ShardedIndex<K>) {
        while self.capacity <= self.count_hot + self.count_cold {
            self.run_hand_cold(index);
        }
    }

    fn run_hand_cold(&mut self, index: &ShardedIndex<K>) {
        let Some(id) = self.hand_cold else { return };
        let mut demoted = false;
        if let Some(page) = self.ring.get_mut(id) {
            if page.ptype == PageType::Cold {
                if page.is_referenced() {
                    // Reuse while on probation: promote.
                    page.ptype = PageType::Hot;
                    page.referenced.store(false, Ordering::Relaxed);
                    self.count_cold -= 1;
                    self.count_hot += 1;
                } else {
                    // Evict the resident copy, keep the page as history.
                    page.ptype = PageType::Test;
                    page.value = None;
                    self.count_cold -= 1;
                    self.count_test += 1;
                    demoted = true;
                }
            }
        }
        // Only a demotion can overflow the history budget.
        if demoted {
            while self.capacity < self.count_test {
                self.run_hand_test(index);
            }
        }
        // The test sweep may have moved the hand; advance from wherever it
        // rests now.
        if let Some(cur) = self.hand_cold {
            self.hand_cold = Some(self.ring.next(cur));
        }
        while self.capacity.saturating_sub(self.cold_capacity) < self.count_hot {
            self.run_hand_hot(index);
        }
    }

    fn run_hand_hot(&mut self, index: &ShardedIndex<K>) {
        if self.hand_hot == self.hand_test {
            // Let the test hand pass first so overlapping hands do not apply
            // their updates out of order.
            self.run_hand_test(index);
        }
        let Some(id) = self.hand_hot else { return };
        if let Some(page) = self.ring.get_mut(id) {
            if page.ptype == PageType::Hot {
                if page.is_referenced() {
                    // Second chance.
                    page.referenced.store(false, Ordering::Relaxed);
                } else {
                    page.ptype = PageType::Cold;
                    self.count_hot -= 1;
                    self.count_cold += 1;
                }
            }
        }
        self.hand_hot = Some(self.ring.next(id));
    }

    fn run_hand_test(&mut self, index: &ShardedIndex<K>) {
        if self.hand_test == self.hand_cold {
            self.run_hand_cold(index);
        }
        let Some(id) = self.hand_test else { return };
        if self.ring.get(id).map(|page| page.ptype) == Some(PageType::Test) {
            // Park on the predecessor so the advance below lands on what was
            // the deleted node's successor.
            let prev = self.ring.prev(id);
            self.meta_del(id, index);
            self.hand_test = if self.ring.is_empty() {
                None
            } else {
                Some(prev)
            };
            self.count_test -= 1;
            if self.cold_capacity > 1 {
                self.cold_capacity -= 1;
            }
        }
        if let Some(cur) = self.hand_test {
            self.hand_test = Some(self.ring.next(cur));
        }
    }
}

/// Concurrent fixed-capacity cache with CLOCK-Pro replacement.
///
/// Maps keys to `Arc`-shared values, bounded by `capacity` resident entries
/// (cold + hot). Lookups go through a sharded key index and a short read
/// lock; all structural mutation serializes on a single write lock.
///
/// # Example
///
/// ```
/// use clockpro::policy::clock_pro::ClockProCache;
///
/// let cache: ClockProCache<u64, i32> = ClockProCache::new(3).unwrap();
/// assert!(cache.set(1, 10));
/// assert_eq!(cache.get(&1).as_deref(), Some(&10));
/// assert_eq!(cache.get(&2), None);
/// ```
pub struct ClockProCache<K, V>
where
    K: Clone + Eq + Hash,
{
    index: ShardedIndex<K>,
    clock: RwLock<Clock<K, V>>,
}

impl<K, V> ClockProCache<K, V>
where
    K: Clone + Eq + Hash,
{
    /// Creates a cache with the given resident capacity and one index shard
    /// per available core.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCapacity`] for capacities below [`MIN_CAPACITY`].
    ///
    /// # Example
    ///
    /// ```
    /// use clockpro::policy::clock_pro::ClockProCache;
    ///
    /// let cache: ClockProCache<String, i32> = ClockProCache::new(100).unwrap();
    /// assert_eq!(cache.capacity(), 100);
    /// assert!(cache.is_empty());
    ///
    /// assert!(ClockProCache::<String, i32>::new(2).is_err());
    /// ```
    pub fn new(capacity: usize) -> Result<Self, InvalidCapacity> {
        let shards = std::thread::available_parallelism()
            .map(|count| count.get())
            .unwrap_or(1);
        Self::with_index_shards(capacity, shards)
    }

    /// Creates a cache with an explicit index shard count.
    ///
    /// More shards reduce index contention under many threads; a single
    /// shard makes the index behave like one locked map.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCapacity`] for capacities below [`MIN_CAPACITY`].
    pub fn with_index_shards(capacity: usize, shards: usize) -> Result<Self, InvalidCapacity> {
        if capacity < MIN_CAPACITY {
            return Err(InvalidCapacity::new(capacity));
        }
        Ok(Self {
            index: ShardedIndex::with_shards(shards),
            clock: RwLock::new(Clock {
                // Residents and test pages can each reach `capacity`.
                ring: Ring::with_capacity(capacity * 2),
                hand_hot: None,
                hand_cold: None,
                hand_test: None,
                count_hot: 0,
                count_cold: 0,
                count_test: 0,
                capacity,
                cold_capacity: capacity,
            }),
        })
    }

    /// Returns the value for `key` if it is resident, marking the page as
    /// referenced. Non-resident test pages answer `None`.
    ///
    /// Takes no write lock: concurrent `get`s proceed in parallel and only
    /// the atomic reference bit is written.
    ///
    /// # Example
    ///
    /// ```
    /// use clockpro::policy::clock_pro::ClockProCache;
    ///
    /// let cache = ClockProCache::new(3).unwrap();
    /// cache.set("key", 42);
    /// assert_eq!(cache.get(&"key").as_deref(), Some(&42));
    /// assert_eq!(cache.get(&"missing"), None);
    /// ```
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let id = self.index.find(key)?;
        let clock = self.clock.read();
        let page = clock.ring.get(id)?;
        if page.key != *key {
            // The slot was recycled between the index lookup and taking the
            // read lock.
            return None;
        }
        let value = page.value.clone()?;
        page.referenced.store(true, Ordering::Relaxed);
        Some(value)
    }

    /// Inserts or updates `key`, returning `true` when the key was newly
    /// admitted as resident and `false` when a resident entry was updated in
    /// place.
    ///
    /// A hit on a non-resident test page counts as an admission: the page's
    /// history earns it a hot slot, and `cold_capacity` grows so future cold
    /// pages get a longer probation.
    ///
    /// A `get` racing with an update observes either the old or the new
    /// value, never torn data: the value is swapped as a whole `Arc` under
    /// the write lock.
    ///
    /// # Example
    ///
    /// ```
    /// use clockpro::policy::clock_pro::ClockProCache;
    ///
    /// let cache = ClockProCache::new(3).unwrap();
    /// assert!(cache.set("x", 1));
    /// assert!(!cache.set("x", 2));
    /// assert_eq!(cache.get(&"x").as_deref(), Some(&2));
    /// ```
    pub fn set(&self, key: K, value: V) -> bool {
        // The one allocation happens before the lock is taken.
        let value = Arc::new(value);
        let mut clock = self.clock.write();
        match self.index.find(&key) {
            None => {
                let page = Page::new_cold(key.clone(), value);
                let id = clock.meta_add(page, &self.index);
                clock.count_cold += 1;
                self.index.insert(key, id);
                true
            },
            Some(id) => {
                let ptype = clock
                    .ring
                    .get(id)
                    .map(|page| page.ptype)
                    .expect("index entry points at a live page");
                match ptype {
                    PageType::Test => {
                        // Non-resident hit: history proves reuse, so this
                        // admission goes straight to hot.
                        if clock.cold_capacity < clock.capacity {
                            clock.cold_capacity += 1;
                        }
                        let mut page = clock.meta_del(id, &self.index);
                        clock.count_test -= 1;
                        page.ptype = PageType::Hot;
                        page.value = Some(value);
                        page.referenced = AtomicBool::new(false);
                        let new_id = clock.meta_add(page, &self.index);
                        clock.count_hot += 1;
                        self.index.insert(key, new_id);
                        true
                    },
                    PageType::Cold | PageType::Hot => {
                        if let Some(page) = clock.ring.get_mut(id) {
                            page.value = Some(value);
                            page.referenced.store(true, Ordering::Relaxed);
                        }
                        false
                    },
                }
            },
        }
    }

    /// Returns `true` if `key` is currently resident.
    ///
    /// Unlike [`get`](Self::get) this does not touch the reference bit, so
    /// probing for membership does not perturb eviction order.
    pub fn contains(&self, key: &K) -> bool {
        let Some(id) = self.index.find(key) else {
            return false;
        };
        let clock = self.clock.read();
        clock
            .ring
            .get(id)
            .is_some_and(|page| page.key == *key && page.value.is_some())
    }

    /// Returns the number of resident entries (cold + hot).
    pub fn len(&self) -> usize {
        let clock = self.clock.read();
        clock.count_hot + clock.count_cold
    }

    /// Returns `true` if nothing is resident.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the resident capacity.
    pub fn capacity(&self) -> usize {
        self.clock.read().capacity
    }

    /// Returns the number of hot pages.
    pub fn hot_count(&self) -> usize {
        self.clock.read().count_hot
    }

    /// Returns the number of cold pages.
    pub fn cold_count(&self) -> usize {
        self.clock.read().count_cold
    }

    /// Returns the number of non-resident test pages.
    pub fn test_count(&self) -> usize {
        self.clock.read().count_test
    }

    /// Returns the current adaptive target for cold residents.
    pub fn cold_capacity(&self) -> usize {
        self.clock.read().cold_capacity
    }

    /// Verifies the clock's structural invariants.
    ///
    /// Walks the whole ring, so this is O(capacity); intended for tests and
    /// debugging. A failure indicates a bug in the replacement engine.
    ///
    /// # Example
    ///
    /// ```
    /// use clockpro::policy::clock_pro::ClockProCache;
    ///
    /// let cache: ClockProCache<u64, u64> = ClockProCache::new(8).unwrap();
    /// for key in 0..20 {
    ///     cache.set(key, key);
    /// }
    /// cache.check_invariants().unwrap();
    /// ```
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let clock = self.clock.read();

        if clock.count_hot + clock.count_cold > clock.capacity {
            return Err(InvariantError::ResidentOverflow {
                hot: clock.count_hot,
                cold: clock.count_cold,
                capacity: clock.capacity,
            });
        }
        if clock.count_test > clock.capacity {
            return Err(InvariantError::HistoryOverflow {
                test: clock.count_test,
                capacity: clock.capacity,
            });
        }
        if clock.cold_capacity < 1 || clock.cold_capacity > clock.capacity {
            return Err(InvariantError::ColdTargetOutOfRange {
                cold_capacity: clock.cold_capacity,
                capacity: clock.capacity,
            });
        }

        if clock.ring.is_empty() {
            for (hand, position) in [
                (Hand::Hot, clock.hand_hot),
                (Hand::Cold, clock.hand_cold),
                (Hand::Test, clock.hand_test),
            ] {
                if position.is_some() {
                    return Err(InvariantError::HandOnEmptyRing { hand });
                }
            }
            if !self.index.is_empty() {
                return Err(InvariantError::IndexDesync {
                    keys: self.index.len(),
                    pages: 0,
                });
            }
            return Ok(());
        }

        let Some(start) = clock.hand_hot else {
            return Err(InvariantError::HandCleared { hand: Hand::Hot });
        };
        for (hand, position) in [
            (Hand::Hot, Some(start)),
            (Hand::Cold, clock.hand_cold),
            (Hand::Test, clock.hand_test),
        ] {
            let Some(id) = position else {
                return Err(InvariantError::HandCleared { hand });
            };
            if !clock.ring.contains(id) {
                return Err(InvariantError::HandDetached { hand });
            }
        }

        let mut walked_hot = 0usize;
        let mut walked_cold = 0usize;
        let mut walked_test = 0usize;
        let mut walked = 0usize;
        for (id, page) in clock.ring.iter_from(start) {
            match page.ptype {
                PageType::Hot => walked_hot += 1,
                PageType::Cold => walked_cold += 1,
                PageType::Test => walked_test += 1,
            }
            let resident = matches!(page.ptype, PageType::Cold | PageType::Hot);
            if page.value.is_some() != resident {
                return Err(InvariantError::ResidencyMismatch { slot: id.index() });
            }
            if self.index.find(&page.key) != Some(id) {
                return Err(InvariantError::UnindexedPage { slot: id.index() });
            }
            walked += 1;
        }

        if walked != clock.ring.len() {
            return Err(InvariantError::RingWalkShort {
                walked,
                pages: clock.ring.len(),
            });
        }
        if (walked_hot, walked_cold, walked_test)
            != (clock.count_hot, clock.count_cold, clock.count_test)
        {
            return Err(InvariantError::CountDrift {
                walked_hot,
                walked_cold,
                walked_test,
                count_hot: clock.count_hot,
                count_cold: clock.count_cold,
                count_test: clock.count_test,
            });
        }
        if self.index.len() != clock.ring.len() {
            return Err(InvariantError::IndexDesync {
                keys: self.index.len(),
                pages: clock.ring.len(),
            });
        }

        Ok(())
    }
}

impl<K, V> crate::traits::ConcurrentCache<K, V> for ClockProCache<K, V>
where
    K: Clone + Eq + Hash + Send + Sync,
    V: Send + Sync,
{
    fn get(&self, key: &K) -> Option<Arc<V>> {
        ClockProCache::get(self, key)
    }

    fn set(&self, key: K, value: V) -> bool {
        ClockProCache::set(self, key, value)
    }

    fn contains(&self, key: &K) -> bool {
        ClockProCache::contains(self, key)
    }

    fn len(&self) -> usize {
        ClockProCache::len(self)
    }

    fn capacity(&self) -> usize {
        ClockProCache::capacity(self)
    }
}

impl<K, V> std::fmt::Debug for ClockProCache<K, V>
where
    K: Clone + Eq + Hash,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let clock = self.clock.read();
        f.debug_struct("ClockProCache")
            .field("capacity", &clock.capacity)
            .field("count_hot", &clock.count_hot)
            .field("count_cold", &clock.count_cold)
            .field("count_test", &clock.count_test)
            .field("cold_capacity", &clock.cold_capacity)
            .finish()
    }
}
