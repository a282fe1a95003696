//! Export fit metrics and count tables.
//!
//! Two consumer-facing shapes:
//!
//! - a JSON document with the nested `{entity: {train: {metric: value}}}`
//!   mapping (largest-threshold metrics), sweep failures, and the poor-fit
//!   list — the "portable" summary downstream tooling reloads
//! - row-per-threshold CSV for spreadsheet work, plus the spike-count table
//!
//! Chart rendering itself is a separate collaborator; we only provide the
//! file-name key it uses (`chart_file_name`).

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::{ModelKind, ThresholdOutcome, ThresholdSweep};
use crate::error::AppError;
use crate::segment::aggregate::SpikeCountTable;

/// Schema of the metrics JSON export.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsFile {
    pub tool: String,
    pub generated: NaiveDate,
    pub model: ModelKind,
    pub use_log_axes: bool,
    /// `{entity: {train_label: {metric_name: value}}}`, taken from each
    /// sweep's largest threshold.
    pub entities: BTreeMap<String, BTreeMap<String, BTreeMap<String, f64>>>,
    /// Per-threshold failures: `"{entity}/{train}@{threshold}: {reason}"`.
    pub failures: Vec<String>,
    pub poor_fits: Vec<String>,
}

/// Build the export document from completed sweeps.
pub fn build_metrics_file(
    sweeps: &[ThresholdSweep],
    poor_fits: &[String],
    model: ModelKind,
    use_log_axes: bool,
) -> MetricsFile {
    let mut entities: BTreeMap<String, BTreeMap<String, BTreeMap<String, f64>>> = BTreeMap::new();
    let mut failures = Vec::new();

    for sweep in sweeps {
        for record in &sweep.records {
            if let ThresholdOutcome::Failed { reason } = &record.outcome {
                failures.push(format!(
                    "{}/{}@{}: {reason}",
                    sweep.entity, sweep.train_label, record.threshold
                ));
            }
        }

        if let Some(metrics) = sweep.records.last().and_then(|r| r.metrics()) {
            let train_map = entities.entry(sweep.entity.clone()).or_default();
            let metric_map = metrics
                .named()
                .iter()
                .map(|&(name, value)| (name.to_string(), value))
                .collect();
            train_map.insert(sweep.train_label.clone(), metric_map);
        }
    }

    MetricsFile {
        tool: "spikefit".to_string(),
        generated: chrono::Local::now().date_naive(),
        model,
        use_log_axes,
        entities,
        failures,
        poor_fits: poor_fits.to_vec(),
    }
}

/// Write the metrics JSON export.
pub fn write_metrics_json(path: &Path, metrics: &MetricsFile) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::export(format!("Failed to create JSON '{}': {e}", path.display()))
    })?;
    serde_json::to_writer_pretty(file, metrics)
        .map_err(|e| AppError::export(format!("Failed to write metrics JSON: {e}")))?;
    Ok(())
}

/// Write one CSV row per (sweep, threshold).
pub fn write_sweeps_csv(path: &Path, sweeps: &[ThresholdSweep]) -> Result<(), AppError> {
    let mut file = File::create(path).map_err(|e| {
        AppError::export(format!("Failed to create CSV '{}': {e}", path.display()))
    })?;

    writeln!(
        file,
        "entity,train,model,threshold,n_used,status,aic,bic,p_value,r_squared,adjusted_r_squared,rmse,squared_diff_mean"
    )
    .map_err(|e| AppError::export(format!("Failed to write CSV header: {e}")))?;

    for sweep in sweeps {
        for record in &sweep.records {
            let row = match &record.outcome {
                ThresholdOutcome::Fitted { metrics, .. } => format!(
                    "{},{},{},{},{},ok,{:.10},{:.10},{:.10},{:.10},{:.10},{:.10},{:.10}",
                    sweep.entity,
                    sweep.train_label,
                    sweep.model.display_name(),
                    record.threshold,
                    record.n_used,
                    metrics.aic,
                    metrics.bic,
                    metrics.p_value,
                    metrics.r_squared,
                    metrics.adjusted_r_squared,
                    metrics.rmse,
                    metrics.squared_diff_mean,
                ),
                ThresholdOutcome::Failed { reason } => format!(
                    "{},{},{},{},{},failed,,,,,,,\"{}\"",
                    sweep.entity,
                    sweep.train_label,
                    sweep.model.display_name(),
                    record.threshold,
                    record.n_used,
                    reason.replace('"', "'"),
                ),
            };
            writeln!(file, "{row}")
                .map_err(|e| AppError::export(format!("Failed to write CSV row: {e}")))?;
        }
    }

    Ok(())
}

/// Write the fixed-width spike-count table.
pub fn write_counts_csv(path: &Path, table: &SpikeCountTable) -> Result<(), AppError> {
    let mut file = File::create(path).map_err(|e| {
        AppError::export(format!("Failed to create CSV '{}': {e}", path.display()))
    })?;

    writeln!(file, "cell,{}", table.train_labels.join(","))
        .map_err(|e| AppError::export(format!("Failed to write CSV header: {e}")))?;

    for row in &table.rows {
        let counts: Vec<String> = row.counts.iter().map(usize::to_string).collect();
        writeln!(file, "{},{}", row.cell, counts.join(","))
            .map_err(|e| AppError::export(format!("Failed to write CSV row: {e}")))?;
    }

    Ok(())
}

/// File-name key the chart collaborator renders under.
pub fn chart_file_name(plot_name: &str, n_params: usize) -> String {
    format!("{plot_name}{n_params}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        CurveFit, FitMetrics, FittedParams, ThresholdRecord,
    };

    fn fitted_record(threshold: f64, r_squared: f64) -> ThresholdRecord {
        let fit = CurveFit {
            model: ModelKind::PowerLaw,
            params: FittedParams {
                values: vec![2.0, 0.5],
                stderr: vec![0.1, 0.05],
                lower_bound: 0.0,
            },
            chi_square: 0.5,
            aic: -10.0,
            bic: -8.0,
            n_points: 12,
            iterations: 6,
        };
        let metrics = FitMetrics {
            aic: -10.0,
            bic: -8.0,
            p_value: 0.8,
            r_squared,
            adjusted_r_squared: r_squared - 0.02,
            rmse: 0.2,
            squared_diff_mean: 0.04,
        };
        ThresholdRecord {
            threshold,
            n_used: 12,
            outcome: ThresholdOutcome::Fitted { fit, metrics },
        }
    }

    fn sample_sweep() -> ThresholdSweep {
        ThresholdSweep {
            entity: "cell_1".to_string(),
            train_label: "1.spike".to_string(),
            model: ModelKind::PowerLaw,
            use_log_axes: false,
            records: vec![
                ThresholdRecord {
                    threshold: 1.0,
                    n_used: 0,
                    outcome: ThresholdOutcome::Failed {
                        reason: "too few points".to_string(),
                    },
                },
                fitted_record(5.0, 0.95),
            ],
            poor_fit: false,
        }
    }

    #[test]
    fn metrics_file_nests_entity_train_metric() {
        let doc = build_metrics_file(&[sample_sweep()], &[], ModelKind::PowerLaw, false);

        let value = serde_json::to_value(&doc).unwrap();
        let r2 = &value["entities"]["cell_1"]["1.spike"]["r_squared"];
        assert!((r2.as_f64().unwrap() - 0.95).abs() < 1e-12);

        assert_eq!(doc.failures.len(), 1);
        assert!(doc.failures[0].starts_with("cell_1/1.spike@1"));
    }

    #[test]
    fn failed_final_threshold_omits_the_entity_entry() {
        let mut sweep = sample_sweep();
        sweep.records.reverse(); // failure is now the largest threshold
        let doc = build_metrics_file(&[sweep], &[], ModelKind::PowerLaw, false);
        assert!(doc.entities.is_empty());
        assert_eq!(doc.failures.len(), 1);
    }

    #[test]
    fn sweeps_csv_has_one_row_per_threshold() {
        let dir = std::env::temp_dir().join("spikefit-export-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sweeps.csv");

        write_sweeps_csv(&path, &[sample_sweep()]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3); // header + 2 records
        assert!(lines[1].contains(",failed,"));
        assert!(lines[2].contains(",ok,"));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn counts_csv_round_trips_the_table_shape() {
        use crate::segment::aggregate::SpikeCountRow;

        let dir = std::env::temp_dir().join("spikefit-export-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("counts.csv");

        let table = SpikeCountTable {
            train_labels: vec!["1.spike".to_string(), "2.spike".to_string()],
            rows: vec![SpikeCountRow {
                cell: "a".to_string(),
                counts: vec![3, 0],
            }],
        };
        write_counts_csv(&path, &table).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "cell,1.spike,2.spike\na,3,0\n");

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn chart_names_append_the_param_count() {
        assert_eq!(chart_file_name("power_fit_", 2), "power_fit_2");
    }
}
