//! Analysis modules.
//!
//! Turns the raw inner/outer sums of a campaign into anomaly tables.

pub mod anomaly;

pub use anomaly::*;
