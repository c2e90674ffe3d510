pub mod clock_pro;

pub use clock_pro::ClockProCache;
