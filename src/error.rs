//! Error types for the clockpro library.
//!
//! ## Key Components
//!
//! - [`InvalidCapacity`]: Returned by constructors when the requested
//!   capacity is below the minimum the three-hand clock needs.
//! - [`InvariantError`]: Returned by
//!   [`ClockProCache::check_invariants`] when the clock's structure is
//!   inconsistent. Each variant names the violated rule and carries the
//!   offending state (counts, the hand involved, or the descriptor slot),
//!   so a failing run pinpoints what broke without a debugger.
//!
//! ## Example Usage
//!
//! ```
//! use clockpro::error::InvalidCapacity;
//! use clockpro::policy::clock_pro::ClockProCache;
//!
//! // Fallible constructor instead of a panic
//! let cache: Result<ClockProCache<u64, String>, InvalidCapacity> = ClockProCache::new(2);
//! assert!(cache.is_err());
//! ```
//!
//! [`ClockProCache::check_invariants`]: crate::policy::clock_pro::ClockProCache::check_invariants

use std::fmt;

use crate::policy::clock_pro::MIN_CAPACITY;

// ---------------------------------------------------------------------------
// InvalidCapacity
// ---------------------------------------------------------------------------

/// Error returned when a cache is constructed with too small a capacity.
///
/// The clock needs at least [`MIN_CAPACITY`] slots so the three hands can
/// separate; anything smaller is rejected up front, before any state is
/// allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidCapacity {
    requested: usize,
}

impl InvalidCapacity {
    /// Creates an `InvalidCapacity` error for the given request.
    #[inline]
    pub fn new(requested: usize) -> Self {
        Self { requested }
    }

    /// Returns the capacity that was requested.
    #[inline]
    pub fn requested(&self) -> usize {
        self.requested
    }
}

impl fmt::Display for InvalidCapacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cache capacity must be at least {} entries, got {}",
            MIN_CAPACITY, self.requested
        )
    }
}

impl std::error::Error for InvalidCapacity {}

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// One of the three clock hands, named in hand-related invariant reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hand {
    /// The hand that admits new pages and demotes idle hot pages.
    Hot,
    /// The hand that evicts or promotes cold pages.
    Cold,
    /// The hand that recycles aged-out history pages.
    Test,
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Hand::Hot => "hand_hot",
            Hand::Cold => "hand_cold",
            Hand::Test => "hand_test",
        })
    }
}

/// Structural inconsistency found by [`ClockProCache::check_invariants`].
///
/// Seeing one of these outside a test indicates a bug in the replacement
/// engine, not a recoverable condition. Variants are ordered roughly the
/// way the checker discovers them: counter bounds first, then hand
/// placement, then the per-page sweep, then cross-structure totals.
///
/// [`ClockProCache::check_invariants`]: crate::policy::clock_pro::ClockProCache::check_invariants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantError {
    /// Cold and hot pages together exceed the resident capacity.
    ResidentOverflow {
        hot: usize,
        cold: usize,
        capacity: usize,
    },
    /// Non-resident test pages exceed the history bound.
    HistoryOverflow { test: usize, capacity: usize },
    /// The adaptive cold target left its `1..=capacity` range.
    ColdTargetOutOfRange {
        cold_capacity: usize,
        capacity: usize,
    },
    /// A hand is set even though the ring is empty.
    HandOnEmptyRing { hand: Hand },
    /// A hand is cleared even though the ring has pages.
    HandCleared { hand: Hand },
    /// A hand points at a freed descriptor slot.
    HandDetached { hand: Hand },
    /// The page in `slot` holds a value exactly when its classification
    /// says it should not (resident pages carry values, test pages do not).
    ResidencyMismatch { slot: usize },
    /// The page in `slot` has no index binding, or its key resolves to a
    /// different node.
    UnindexedPage { slot: usize },
    /// A sweep from `hand_hot` did not reach every page: the ring is not a
    /// single cycle.
    RingWalkShort { walked: usize, pages: usize },
    /// The per-class counters disagree with the pages actually on the ring.
    CountDrift {
        walked_hot: usize,
        walked_cold: usize,
        walked_test: usize,
        count_hot: usize,
        count_cold: usize,
        count_test: usize,
    },
    /// The index and the ring track different numbers of pages.
    IndexDesync { keys: usize, pages: usize },
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            InvariantError::ResidentOverflow {
                hot,
                cold,
                capacity,
            } => write!(
                f,
                "resident pages exceed capacity: {hot} hot + {cold} cold > {capacity}"
            ),
            InvariantError::HistoryOverflow { test, capacity } => {
                write!(f, "test pages exceed capacity: {test} > {capacity}")
            },
            InvariantError::ColdTargetOutOfRange {
                cold_capacity,
                capacity,
            } => write!(f, "cold_capacity {cold_capacity} outside 1..={capacity}"),
            InvariantError::HandOnEmptyRing { hand } => {
                write!(f, "{hand} set on an empty ring")
            },
            InvariantError::HandCleared { hand } => {
                write!(f, "{hand} cleared on a non-empty ring")
            },
            InvariantError::HandDetached { hand } => {
                write!(f, "{hand} points at a freed slot")
            },
            InvariantError::ResidencyMismatch { slot } => {
                write!(f, "page in slot {slot} disagrees with its classification about holding a value")
            },
            InvariantError::UnindexedPage { slot } => {
                write!(f, "page in slot {slot} is not bound to its node in the index")
            },
            InvariantError::RingWalkShort { walked, pages } => {
                write!(f, "sweep from hand_hot covered {walked} of {pages} pages")
            },
            InvariantError::CountDrift {
                walked_hot,
                walked_cold,
                walked_test,
                count_hot,
                count_cold,
                count_test,
            } => write!(
                f,
                "page counts drifted: swept {walked_hot}/{walked_cold}/{walked_test} \
                 hot/cold/test, recorded {count_hot}/{count_cold}/{count_test}"
            ),
            InvariantError::IndexDesync { keys, pages } => {
                write!(f, "index binds {keys} keys for {pages} ring pages")
            },
        }
    }
}

impl std::error::Error for InvariantError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
