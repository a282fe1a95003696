//! Mathematical utilities: damped least-squares solves and fit statistics.

pub mod lsq;
pub mod stats;

pub use lsq::*;
pub use stats::*;
