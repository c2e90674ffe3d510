pub use crate::builder::ClockProBuilder;
pub use crate::error::{Hand, InvalidCapacity, InvariantError};
pub use crate::policy::clock_pro::ClockProCache;
pub use crate::traits::ConcurrentCache;
