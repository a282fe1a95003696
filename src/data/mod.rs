//! Data acquisition and ownership.
//!
//! - `store`: the immutable per-cell sample store every other component reads
//! - `fetch`: download-once cache for remote recording files
//! - `sample`: seeded synthetic recording generator (demo + tests)

pub mod fetch;
pub mod sample;
pub mod store;

pub use fetch::*;
pub use sample::*;
pub use store::*;
