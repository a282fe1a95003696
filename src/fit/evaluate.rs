//! Fit-quality evaluation across truncation thresholds.
//!
//! For a chosen grouped view and train, the evaluator re-fits the model on
//! progressively larger `y <= threshold` subsets and scores each fit
//! (R², adjusted R², chi-square p-value, RMSE, AIC/BIC, original-unit mean
//! squared difference). A failed fit at one threshold is recorded as a failed
//! record and the sweep continues — sibling thresholds are independent.
//!
//! The (entity, train) pair is flagged as a poor fit when the *largest*
//! threshold's record has `p_value < 0.05` and `r_squared < 0.6`; flagged
//! labels accumulate on the evaluator instance, never in process-wide state.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::data::store::SampleStore;
use crate::domain::{
    train_label, FitKey, FitMetrics, FitOptions, ModelKind, Selection, ThresholdOutcome,
    ThresholdRecord, ThresholdSweep, TrainMap, TrainSeries,
};
use crate::error::AppError;
use crate::fit::fitter::fit_curve;
use crate::math::{
    adjusted_r_squared, chi_square_p_value, chi_square_statistic, r_squared, rmse,
    squared_diff_mean,
};
use crate::models::evaluate;
use crate::segment;

const POOR_FIT_P_VALUE: f64 = 0.05;
const POOR_FIT_R_SQUARED: f64 = 0.6;

/// Evaluator session: accumulated sweeps plus the poor-fit list.
#[derive(Debug, Default)]
pub struct FitQualityEvaluator {
    pub fit_parameters: HashMap<FitKey, ThresholdSweep>,
    /// `"{entity}/{train_label}"` for every flagged pair, in evaluation order.
    pub poor_fits: Vec<String>,
}

impl FitQualityEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sweep one train of one grouped view.
    pub fn evaluate_across_thresholds(
        &mut self,
        store: &SampleStore,
        selection: &Selection,
        ordinal: u32,
        model: ModelKind,
        opts: &FitOptions,
        thresholds: &[f64],
        use_log_axes: bool,
    ) -> Result<ThresholdSweep, AppError> {
        let buckets = resolve_view(store, selection)?;
        let series = buckets.get(&ordinal).ok_or_else(|| {
            AppError::not_found(format!(
                "View '{}' has no train '{}'.",
                selection.label(),
                train_label(ordinal)
            ))
        })?;

        let sweep = sweep_series(selection, ordinal, series, model, opts, thresholds, use_log_axes)?;
        self.record(sweep.clone());
        Ok(sweep)
    }

    /// Sweep every train in a grouped view (bounded by `max_trains`), fanning
    /// the independent per-train sweeps out across the rayon pool.
    pub fn sweep_selection(
        &mut self,
        store: &SampleStore,
        selection: &Selection,
        model: ModelKind,
        opts: &FitOptions,
        thresholds: &[f64],
        use_log_axes: bool,
        max_trains: u32,
    ) -> Result<Vec<ThresholdSweep>, AppError> {
        let buckets = resolve_view(store, selection)?;
        let targets: Vec<(u32, &TrainSeries)> = buckets
            .iter()
            .filter(|(ordinal, _)| **ordinal <= max_trains)
            .map(|(ordinal, series)| (*ordinal, series))
            .collect();

        let sweeps = targets
            .par_iter()
            .map(|(ordinal, series)| {
                sweep_series(selection, *ordinal, series, model, opts, thresholds, use_log_axes)
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Merge in ordinal order so the poor-fit list stays deterministic.
        for sweep in &sweeps {
            self.record(sweep.clone());
        }
        Ok(sweeps)
    }

    fn record(&mut self, sweep: ThresholdSweep) {
        if sweep.poor_fit {
            self.poor_fits
                .push(format!("{}/{}", sweep.entity, sweep.train_label));
        }
        self.fit_parameters.insert(
            FitKey::new(sweep.entity.clone(), sweep.train_label.clone(), sweep.model),
            sweep,
        );
    }
}

/// Resolve a selection to its train buckets.
fn resolve_view(store: &SampleStore, selection: &Selection) -> Result<TrainMap, AppError> {
    match selection {
        Selection::Cell(name) => segment::cell_trains(store, name),
        Selection::AllCells => Ok(segment::all_merged(store)),
        Selection::Subset(names) => segment::merged(store, names),
    }
}

/// Run one sweep over a train's samples. Pure: no evaluator state touched.
fn sweep_series(
    selection: &Selection,
    ordinal: u32,
    series: &TrainSeries,
    model: ModelKind,
    opts: &FitOptions,
    thresholds: &[f64],
    use_log_axes: bool,
) -> Result<ThresholdSweep, AppError> {
    validate_thresholds(thresholds)?;

    // Transform once, filter per threshold.
    let (xs, ys) = transform_axes(series, use_log_axes);

    let mut records = Vec::with_capacity(thresholds.len());
    for &threshold in thresholds {
        let (fx, fy) = filter_by_threshold(&xs, &ys, threshold);
        let n_used = fx.len();

        let outcome = match fit_and_score(model, opts, &fx, &fy, use_log_axes) {
            Ok((fit, metrics)) => ThresholdOutcome::Fitted { fit, metrics },
            Err(err) if err.is_recoverable() => {
                log::warn!(
                    "{}/{} @ threshold {threshold}: {err}",
                    selection.label(),
                    train_label(ordinal)
                );
                ThresholdOutcome::Failed {
                    reason: err.to_string(),
                }
            }
            Err(err) => return Err(err),
        };

        records.push(ThresholdRecord {
            threshold,
            n_used,
            outcome,
        });
    }

    // Classification looks at the largest threshold only (thresholds are
    // ascending, so that is the final record).
    let poor_fit = records
        .last()
        .and_then(ThresholdRecord::metrics)
        .is_some_and(|m| m.p_value < POOR_FIT_P_VALUE && m.r_squared < POOR_FIT_R_SQUARED);

    Ok(ThresholdSweep {
        entity: selection.label(),
        train_label: train_label(ordinal),
        model,
        use_log_axes,
        records,
        poor_fit,
    })
}

fn validate_thresholds(thresholds: &[f64]) -> Result<(), AppError> {
    if thresholds.is_empty() {
        return Err(AppError::schema("Threshold sweep requires at least one threshold."));
    }
    if thresholds.iter().any(|t| !t.is_finite()) {
        return Err(AppError::schema("Thresholds must be finite."));
    }
    if thresholds.windows(2).any(|w| w[0] >= w[1]) {
        return Err(AppError::schema("Thresholds must be strictly ascending."));
    }
    Ok(())
}

/// Apply the log10 transform when requested.
///
/// Pairs with a non-positive coordinate cannot survive a log transform and
/// are dropped before it.
fn transform_axes(series: &TrainSeries, use_log_axes: bool) -> (Vec<f64>, Vec<f64>) {
    if !use_log_axes {
        return (series.times.clone(), series.freqs.clone());
    }

    let mut xs = Vec::with_capacity(series.len());
    let mut ys = Vec::with_capacity(series.len());
    for (&t, &f) in series.times.iter().zip(series.freqs.iter()) {
        if t > 0.0 && f > 0.0 {
            xs.push(t.log10());
            ys.push(f.log10());
        }
    }
    (xs, ys)
}

/// Keep pairs with `y <= threshold` (threshold lives in transformed space).
fn filter_by_threshold(xs: &[f64], ys: &[f64], threshold: f64) -> (Vec<f64>, Vec<f64>) {
    let mut fx = Vec::new();
    let mut fy = Vec::new();
    for (&x, &y) in xs.iter().zip(ys.iter()) {
        if y <= threshold {
            fx.push(x);
            fy.push(y);
        }
    }
    (fx, fy)
}

fn fit_and_score(
    model: ModelKind,
    opts: &FitOptions,
    x: &[f64],
    y: &[f64],
    use_log_axes: bool,
) -> Result<(crate::domain::CurveFit, FitMetrics), AppError> {
    let fit = fit_curve(model, opts, x, y)?;
    let predicted = evaluate(model, &fit.params.values, x);

    let n = x.len();
    let k = model.n_params();

    let r2 = r_squared(y, &predicted);
    let adj_r2 = adjusted_r_squared(r2, n, k);
    let p_value = chi_square_p_value(chi_square_statistic(y, &predicted), n.saturating_sub(k));
    let rmse_value = rmse(y, &predicted);

    // Original-unit error magnitude: un-log both sides before differencing.
    let sdm = if use_log_axes {
        let y_orig: Vec<f64> = y.iter().map(|v| 10f64.powf(*v)).collect();
        let p_orig: Vec<f64> = predicted.iter().map(|v| 10f64.powf(*v)).collect();
        squared_diff_mean(&y_orig, &p_orig)
    } else {
        squared_diff_mean(y, &predicted)
    };

    let metrics = FitMetrics {
        aic: fit.aic,
        bic: fit.bic,
        p_value,
        r_squared: r2,
        adjusted_r_squared: adj_r2,
        rmse: rmse_value,
        squared_diff_mean: sdm,
    };

    Ok((fit, metrics))
}
