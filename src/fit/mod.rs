//! Nonlinear curve fitting.
//!
//! Responsibilities:
//!
//! - minimize sum-of-squared residuals for a model over a sample set
//!   (Levenberg–Marquardt, `fitter`)
//! - sweep truncation thresholds and score fit quality (`evaluate`)

pub mod evaluate;
pub mod fitter;

pub use evaluate::*;
pub use fitter::*;
