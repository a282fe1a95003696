//! Terminal summaries.

use crate::domain::{measure_label, MeasureCounts, ThresholdOutcome, ThresholdSweep};
use crate::segment::aggregate::SpikeCountTable;

/// Format the cross-cell spike-count table.
pub fn format_spike_counts(table: &SpikeCountTable) -> String {
    let mut out = String::new();
    out.push_str("Spike counts per train bucket:\n");

    let cell_width = table
        .rows
        .iter()
        .map(|r| r.cell.len())
        .max()
        .unwrap_or(4)
        .max(4);

    out.push_str(&format!("{:<cell_width$}", "cell"));
    for label in &table.train_labels {
        out.push_str(&format!(" {label:>9}"));
    }
    out.push('\n');

    for row in &table.rows {
        out.push_str(&format!("{:<cell_width$}", row.cell));
        for count in &row.counts {
            out.push_str(&format!(" {count:>9}"));
        }
        out.push('\n');
    }

    out
}

/// Format one cell's measurement counts.
pub fn format_measurement_counts(cell: &str, counts: &MeasureCounts) -> String {
    let mut out = String::new();
    out.push_str(&format!("Measurement counts for {cell}:\n"));

    if counts.is_empty() {
        out.push_str("  (no measurable samples)\n");
        return out;
    }

    for (train, measures) in counts {
        out.push_str(&format!("  train {train}:"));
        for (measure, count) in measures {
            out.push_str(&format!(" {}={count}", measure_label(*measure)));
        }
        out.push('\n');
    }

    out
}

/// Format the sweep results, one line per (entity, train, threshold).
pub fn format_sweeps(sweeps: &[ThresholdSweep], poor_fits: &[String]) -> String {
    let mut out = String::new();

    for sweep in sweeps {
        let flag = if sweep.poor_fit { " [poor fit]" } else { "" };
        out.push_str(&format!(
            "{} / {} ({}{}){flag}\n",
            sweep.entity,
            sweep.train_label,
            sweep.model.display_name(),
            if sweep.use_log_axes { ", log axes" } else { "" },
        ));

        for record in &sweep.records {
            match &record.outcome {
                ThresholdOutcome::Fitted { fit, metrics } => {
                    out.push_str(&format!(
                        "  y<={:<8} n={:<4} r2={:.4} adj={:.4} p={:.4} rmse={:.4} aic={:.2} bic={:.2} params={}\n",
                        record.threshold,
                        record.n_used,
                        metrics.r_squared,
                        metrics.adjusted_r_squared,
                        metrics.p_value,
                        metrics.rmse,
                        metrics.aic,
                        metrics.bic,
                        fmt_vec(&fit.params.values),
                    ));
                }
                ThresholdOutcome::Failed { reason } => {
                    out.push_str(&format!(
                        "  y<={:<8} n={:<4} FAILED: {reason}\n",
                        record.threshold, record.n_used,
                    ));
                }
            }
        }
    }

    if poor_fits.is_empty() {
        out.push_str("\nNo poor fits flagged.\n");
    } else {
        out.push_str("\nPoor fits (p < 0.05 and r2 < 0.6 at the largest threshold):\n");
        for label in poor_fits {
            out.push_str(&format!("- {label}\n"));
        }
    }

    out
}

fn fmt_vec(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| format!("{v:.5}")).collect();
    format!("[{}]", parts.join(", "))
}
