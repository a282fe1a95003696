//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - raw recording samples and train-bucket series (`Sample`, `TrainSeries`)
//! - model selection enums (`ModelKind`, `Selection`)
//! - fit inputs and outputs (`FitOptions`, `CurveFit`, `FitMetrics`, ...)

pub mod types;

pub use types::*;
