//! clockpro: a concurrent fixed-capacity cache with CLOCK-Pro replacement.
//!
//! See [`policy::clock_pro`] for the algorithm and its invariants.

pub mod builder;
pub mod ds;
pub mod error;
pub(crate) mod index;
pub mod policy;
pub mod prelude;
pub mod traits;
