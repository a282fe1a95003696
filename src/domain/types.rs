//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during segmentation and fitting
//! - exported to JSON/CSV
//! - reloaded later by plotting or comparison collaborators

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// One recorded sample: relative firing time paired with instantaneous
/// frequency ("IF").
///
/// A NaN frequency is not data — it is the boundary marker between two spike
/// trains. Marker rows carry NaN in both columns in the source recordings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub time: f64,
    pub freq: f64,
}

impl Sample {
    pub fn new(time: f64, freq: f64) -> Self {
        Self { time, freq }
    }

    /// A train-boundary marker.
    pub fn marker() -> Self {
        Self {
            time: f64::NAN,
            freq: f64::NAN,
        }
    }

    /// True when this sample is a train boundary rather than real data.
    pub fn is_marker(&self) -> bool {
        self.freq.is_nan()
    }
}

/// Ordered (times, freqs) pair for one train bucket.
///
/// The two vectors are always the same length and preserve source order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrainSeries {
    pub times: Vec<f64>,
    pub freqs: Vec<f64>,
}

impl TrainSeries {
    pub fn push(&mut self, time: f64, freq: f64) {
        self.times.push(time);
        self.freqs.push(freq);
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// Train buckets keyed by 1-based ordinal.
///
/// `BTreeMap` keeps label iteration in increasing ordinal order, which string
/// keys would not ("10.spike" sorts before "2.spike").
pub type TrainMap = BTreeMap<u32, TrainSeries>;

/// Per-train measurement counts: `{train ordinal: {measure ordinal: count}}`.
pub type MeasureCounts = BTreeMap<u32, BTreeMap<u32, usize>>;

/// Exported label for a train bucket.
pub fn train_label(ordinal: u32) -> String {
    format!("{ordinal}.spike")
}

/// Exported label for a measurement bucket.
pub fn measure_label(ordinal: u32) -> String {
    format!("{ordinal}.measure")
}

/// Closed-form model families the fitting engine knows how to evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    /// `y = a1*x + a2`
    Linear,
    /// `y = a1 * x^a2`
    PowerLaw,
    /// `y = a1 * exp(a2 * x)`
    Exponential,
    /// `y = a1 * x^a2 + a3`
    PowerLawOffset,
}

impl ModelKind {
    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Linear => "linear",
            ModelKind::PowerLaw => "power-law",
            ModelKind::Exponential => "exponential",
            ModelKind::PowerLawOffset => "power-law+offset",
        }
    }

    /// Number of free scalar parameters.
    pub fn n_params(self) -> usize {
        match self {
            ModelKind::Linear | ModelKind::PowerLaw | ModelKind::Exponential => 2,
            ModelKind::PowerLawOffset => 3,
        }
    }

    /// Parameter names in fit order (`a1`, `a2`, ...).
    pub fn param_names(self) -> Vec<String> {
        (1..=self.n_params()).map(|i| format!("a{i}")).collect()
    }
}

/// Which grouped view a fit or sweep runs on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selection {
    /// A single cell's own train buckets.
    Cell(String),
    /// All cells merged by train ordinal.
    AllCells,
    /// An explicit cell subset merged by train ordinal.
    Subset(Vec<String>),
}

impl Selection {
    /// Stable entity label used in result keys, exports, and the poor-fit list.
    pub fn label(&self) -> String {
        match self {
            Selection::Cell(name) => name.clone(),
            Selection::AllCells => "all".to_string(),
            Selection::Subset(names) => format!("subset({})", names.join("+")),
        }
    }
}

/// Options for a single nonlinear fit.
#[derive(Debug, Clone, Copy)]
pub struct FitOptions {
    /// Every parameter starts at this value.
    pub initial_value: f64,
    /// Every parameter is constrained to `>= lower_bound`.
    pub lower_bound: f64,
    /// Iteration budget for the minimizer.
    pub max_iters: usize,
    /// Relative chi-square improvement below which the fit has converged.
    pub ftol: f64,
    /// Step norm below which the fit has converged.
    pub xtol: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            initial_value: 1.0,
            lower_bound: f64::NEG_INFINITY,
            max_iters: 200,
            ftol: 1e-10,
            xtol: 1e-10,
        }
    }
}

impl FitOptions {
    pub fn with_init(initial_value: f64, lower_bound: f64) -> Self {
        Self {
            initial_value,
            lower_bound,
            ..Self::default()
        }
    }
}

/// Fitted parameter values with their estimated standard errors.
#[derive(Debug, Clone, Serialize)]
pub struct FittedParams {
    pub values: Vec<f64>,
    /// Standard error per parameter; NaN where the covariance is unavailable.
    pub stderr: Vec<f64>,
    pub lower_bound: f64,
}

/// Output of one converged fit.
#[derive(Debug, Clone, Serialize)]
pub struct CurveFit {
    pub model: ModelKind,
    pub params: FittedParams,
    /// Sum of squared residuals at the optimum.
    pub chi_square: f64,
    pub aic: f64,
    pub bic: f64,
    pub n_points: usize,
    pub iterations: usize,
}

/// Goodness-of-fit metrics at a single threshold.
#[derive(Debug, Clone, Serialize)]
pub struct FitMetrics {
    pub aic: f64,
    pub bic: f64,
    pub p_value: f64,
    pub r_squared: f64,
    pub adjusted_r_squared: f64,
    pub rmse: f64,
    /// Mean squared difference in original units (axes un-logged first).
    pub squared_diff_mean: f64,
}

impl FitMetrics {
    /// Metric values in export order, paired with their column names.
    pub fn named(&self) -> [(&'static str, f64); 7] {
        [
            ("aic", self.aic),
            ("bic", self.bic),
            ("p_value", self.p_value),
            ("r_squared", self.r_squared),
            ("adjusted_r_squared", self.adjusted_r_squared),
            ("rmse", self.rmse),
            ("squared_diff_mean", self.squared_diff_mean),
        ]
    }
}

/// One threshold's outcome inside a sweep.
///
/// A failed fit at one threshold is a per-record marker, not a sweep abort.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ThresholdOutcome {
    Fitted {
        fit: CurveFit,
        metrics: FitMetrics,
    },
    Failed {
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ThresholdRecord {
    pub threshold: f64,
    /// Sample count that survived threshold filtering for this record.
    pub n_used: usize,
    #[serde(flatten)]
    pub outcome: ThresholdOutcome,
}

impl ThresholdRecord {
    pub fn metrics(&self) -> Option<&FitMetrics> {
        match &self.outcome {
            ThresholdOutcome::Fitted { metrics, .. } => Some(metrics),
            ThresholdOutcome::Failed { .. } => None,
        }
    }
}

/// A full threshold sweep for one (entity, train, model) tuple.
#[derive(Debug, Clone, Serialize)]
pub struct ThresholdSweep {
    pub entity: String,
    pub train_label: String,
    pub model: ModelKind,
    pub use_log_axes: bool,
    pub records: Vec<ThresholdRecord>,
    /// True when the largest threshold satisfied the poor-fit rule.
    pub poor_fit: bool,
}

/// Key for accumulated fit results.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FitKey {
    pub entity: String,
    pub train_label: String,
    pub model: ModelKind,
}

impl FitKey {
    pub fn new(entity: impl Into<String>, train_label: impl Into<String>, model: ModelKind) -> Self {
        Self {
            entity: entity.into(),
            train_label: train_label.into(),
            model,
        }
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub csv_path: PathBuf,
    pub model: ModelKind,
    pub initial_value: f64,
    pub lower_bound: f64,
    /// Ascending truncation thresholds for the quality sweep.
    pub thresholds: Vec<f64>,
    pub use_log_axes: bool,
    /// Cells to analyze; `None` means every cell individually plus the
    /// all-cells merged view.
    pub cells: Option<Vec<String>>,
    /// When set with `cells`, fit the merged subset instead of each cell.
    pub merge_subset: bool,
    /// Highest train ordinal included in sweeps.
    pub max_trains: u32,
    pub export_json: Option<PathBuf>,
    pub export_csv: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_detection() {
        assert!(Sample::marker().is_marker());
        assert!(!Sample::new(0.5, 12.0).is_marker());
        // A NaN time with a real frequency is not a boundary.
        assert!(!Sample::new(f64::NAN, 12.0).is_marker());
    }

    #[test]
    fn labels_use_one_based_ordinals() {
        assert_eq!(train_label(1), "1.spike");
        assert_eq!(train_label(12), "12.spike");
        assert_eq!(measure_label(3), "3.measure");
    }

    #[test]
    fn selection_labels_are_stable() {
        assert_eq!(Selection::Cell("cell_a".into()).label(), "cell_a");
        assert_eq!(Selection::AllCells.label(), "all");
        assert_eq!(
            Selection::Subset(vec!["a".into(), "b".into()]).label(),
            "subset(a+b)"
        );
    }

    #[test]
    fn param_counts_match_names() {
        for kind in [
            ModelKind::Linear,
            ModelKind::PowerLaw,
            ModelKind::Exponential,
            ModelKind::PowerLawOffset,
        ] {
            assert_eq!(kind.param_names().len(), kind.n_params());
        }
    }
}
