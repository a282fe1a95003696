//! Command-line parsing for the spike-train fitting tool.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the segmentation/fitting code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::ModelKind;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "spikefit", version, about = "Spike-train segmentation and nonlinear curve fitting")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit a model to the grouped trains across thresholds and export metrics.
    Analyze(AnalyzeArgs),
    /// Print the spike-count and measurement-count tables.
    Counts(CountsArgs),
    /// Download a remote recording into the local data directory (cached).
    Fetch(FetchArgs),
    /// Run the full pipeline on a seeded synthetic recording.
    Demo(DemoArgs),
}

/// Options for the analysis pipeline.
#[derive(Debug, Parser, Clone)]
pub struct AnalyzeArgs {
    /// Recording CSV with one (time, IF) column pair per cell.
    #[arg(long)]
    pub csv: PathBuf,

    /// Model family to fit.
    #[arg(long, value_enum, default_value_t = ModelKind::PowerLaw)]
    pub model: ModelKind,

    /// Initial value for every parameter.
    #[arg(long, default_value_t = 1.0)]
    pub initial: f64,

    /// Lower bound applied to every parameter.
    #[arg(long, default_value_t = 0.0)]
    pub lower_bound: f64,

    /// Ascending truncation thresholds (y <= threshold per step).
    #[arg(long, value_delimiter = ',', default_values_t = vec![25.0, 50.0, 100.0, 200.0])]
    pub thresholds: Vec<f64>,

    /// Fit in log10-log10 space (thresholds then apply to log10 values).
    #[arg(long)]
    pub log_axes: bool,

    /// Restrict the run to these cells (comma separated).
    #[arg(long, value_delimiter = ',')]
    pub cells: Option<Vec<String>>,

    /// Merge the selected cells into one view instead of fitting each.
    #[arg(long)]
    pub merge: bool,

    /// Highest train ordinal to sweep.
    #[arg(long, default_value_t = 5)]
    pub max_trains: u32,

    /// Export the metrics document as JSON.
    #[arg(long)]
    pub export_json: Option<PathBuf>,

    /// Export row-per-threshold metrics as CSV.
    #[arg(long)]
    pub export_csv: Option<PathBuf>,
}

/// Options for the count tables.
#[derive(Debug, Parser)]
pub struct CountsArgs {
    /// Recording CSV with one (time, IF) column pair per cell.
    #[arg(long)]
    pub csv: PathBuf,

    /// Export the spike-count table as CSV.
    #[arg(long)]
    pub export_csv: Option<PathBuf>,
}

/// Options for the cached download.
#[derive(Debug, Parser)]
pub struct FetchArgs {
    /// Remote content identifier.
    #[arg(long)]
    pub id: String,

    /// Local file name to save under.
    #[arg(long)]
    pub file: String,

    /// Local data directory.
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,
}

/// Options for the synthetic demo run.
#[derive(Debug, Parser)]
pub struct DemoArgs {
    /// Random seed for the generated recording.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of synthetic cells.
    #[arg(long, default_value_t = 3)]
    pub cells: usize,

    /// Trains per cell.
    #[arg(long, default_value_t = 5)]
    pub trains: usize,

    /// Samples per train.
    #[arg(long, default_value_t = 12)]
    pub samples: usize,

    /// Model family to fit.
    #[arg(long, value_enum, default_value_t = ModelKind::PowerLaw)]
    pub model: ModelKind,
}
