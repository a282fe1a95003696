//! Shared analysis pipeline used by the CLI front-end.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! ingest -> segmentation -> counts -> threshold sweeps -> poor-fit list
//!
//! The CLI focuses on presentation (printing and export paths).

use crate::data::store::SampleStore;
use crate::domain::{AnalysisConfig, FitOptions, Selection, ThresholdSweep};
use crate::error::AppError;
use crate::fit::evaluate::FitQualityEvaluator;
use crate::io::ingest;
use crate::segment::aggregate::{self, SpikeCountTable};

/// All computed outputs of a single analysis run.
#[derive(Debug)]
pub struct AnalysisOutput {
    pub spike_counts: SpikeCountTable,
    pub sweeps: Vec<ThresholdSweep>,
    pub poor_fits: Vec<String>,
}

/// Load the recording CSV and execute the full pipeline.
pub fn run_analysis(config: &AnalysisConfig) -> Result<AnalysisOutput, AppError> {
    let store = ingest::load_recording(&config.csv_path)?;
    log::info!(
        "loaded {} cells from '{}'",
        store.n_cells(),
        config.csv_path.display()
    );
    run_analysis_with_store(&store, config)
}

/// Execute the pipeline on an already-built store.
///
/// This is the entry point tests and the demo command use, skipping the CSV.
pub fn run_analysis_with_store(
    store: &SampleStore,
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, AppError> {
    let selections = resolve_selections(store, config)?;
    let opts = FitOptions::with_init(config.initial_value, config.lower_bound);

    let mut evaluator = FitQualityEvaluator::new();
    let mut sweeps = Vec::new();
    for selection in &selections {
        log::info!("sweeping view '{}'", selection.label());
        sweeps.extend(evaluator.sweep_selection(
            store,
            selection,
            config.model,
            &opts,
            &config.thresholds,
            config.use_log_axes,
            config.max_trains,
        )?);
    }

    let n_failed = sweeps
        .iter()
        .flat_map(|s| s.records.iter())
        .filter(|r| r.metrics().is_none())
        .count();
    if n_failed > 0 {
        log::warn!("{n_failed} threshold records failed and were excluded from metrics");
    }

    Ok(AnalysisOutput {
        spike_counts: aggregate::spike_counts(store),
        sweeps,
        poor_fits: evaluator.poor_fits,
    })
}

/// Turn the configured cell filter into concrete view selections.
fn resolve_selections(
    store: &SampleStore,
    config: &AnalysisConfig,
) -> Result<Vec<Selection>, AppError> {
    match &config.cells {
        // Default: every cell individually, plus the all-cells merged view.
        None => {
            let mut selections: Vec<Selection> = store
                .cell_names()
                .iter()
                .map(|name| Selection::Cell(name.clone()))
                .collect();
            selections.push(Selection::AllCells);
            Ok(selections)
        }
        Some(cells) => {
            // Unknown names fail the whole run up front, not mid-sweep.
            for cell in cells {
                store.samples(cell)?;
            }
            if config.merge_subset {
                Ok(vec![Selection::Subset(cells.clone())])
            } else {
                Ok(cells.iter().map(|c| Selection::Cell(c.clone())).collect())
            }
        }
    }
}
