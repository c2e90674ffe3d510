//! Builder for configuring a CLOCK-Pro cache.
//!
//! Collects the tunable knobs (capacity, index shard count) and validates
//! them in one place, so misconfiguration surfaces as a typed error instead
//! of a panic.
//!
//! ## Example
//!
//! ```
//! use clockpro::builder::ClockProBuilder;
//!
//! let cache = ClockProBuilder::new(100)
//!     .index_shards(8)
//!     .try_build::<u64, String>()
//!     .unwrap();
//! cache.set(1, "hello".to_string());
//! assert_eq!(cache.get(&1).as_deref(), Some(&"hello".to_string()));
//! ```

use std::hash::Hash;

use crate::error::InvalidCapacity;
use crate::policy::clock_pro::ClockProCache;

/// Builder for [`ClockProCache`] instances.
#[derive(Debug, Clone)]
pub struct ClockProBuilder {
    capacity: usize,
    index_shards: Option<usize>,
}

impl ClockProBuilder {
    /// Creates a builder for a cache with the given resident capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            index_shards: None,
        }
    }

    /// Overrides the key index shard count (default: one per available
    /// core).
    pub fn index_shards(mut self, shards: usize) -> Self {
        self.index_shards = Some(shards);
        self
    }

    /// Builds the cache.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCapacity`] when the configured capacity is below the
    /// minimum the clock supports.
    ///
    /// # Example
    ///
    /// ```
    /// use clockpro::builder::ClockProBuilder;
    ///
    /// let too_small = ClockProBuilder::new(2).try_build::<u64, u64>();
    /// assert!(too_small.is_err());
    /// ```
    pub fn try_build<K, V>(self) -> Result<ClockProCache<K, V>, InvalidCapacity>
    where
        K: Clone + Eq + Hash,
    {
        match self.index_shards {
            Some(shards) => ClockProCache::with_index_shards(self.capacity, shards),
            None => ClockProCache::new(self.capacity),
        }
    }
}
