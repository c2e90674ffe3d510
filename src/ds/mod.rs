pub mod ring;

pub use ring::{NodeId, Ring, RingIter};
