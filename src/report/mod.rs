//! Reporting utilities: formatted terminal output for counts and sweeps.
//!
//! We keep formatting code in one place so:
//! - the segmentation/fitting code stays clean and testable
//! - output changes are localized

pub mod format;

pub use format::*;
