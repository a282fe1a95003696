//! Levenberg–Marquardt fitting engine.
//!
//! Given a model kind, fit options, and an (x, y) sample set, we minimize the
//! residual vector `model(params, x) - y` in the least-squares sense:
//!
//! - all `n_params` parameters start at `initial_value`
//! - every parameter is constrained to `>= lower_bound` (projected steps)
//! - the Jacobian is built by forward differences
//! - each iteration solves the damped normal equations, accepting steps that
//!   reduce chi-square and inflating the damping otherwise
//!
//! The minimizer converges to a *local* optimum of the sum of squared
//! residuals; there is no global-optimum guarantee. Callers that care about
//! basin selection control `initial_value`.

use std::collections::HashMap;

use nalgebra::{DMatrix, DVector};

use crate::domain::{
    train_label, CurveFit, FitKey, FitOptions, FittedParams, ModelKind, Selection, TrainSeries,
};
use crate::error::AppError;
use crate::math::{aic, bic, solve_damped_step};
use crate::models::evaluate;

/// Damping schedule: inflate on a rejected step, relax on an accepted one.
const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_UP: f64 = 10.0;
const LAMBDA_DOWN: f64 = 10.0;
const LAMBDA_MAX: f64 = 1e14;

/// Fit one model to one sample set.
pub fn fit_curve(
    model: ModelKind,
    opts: &FitOptions,
    x: &[f64],
    y: &[f64],
) -> Result<CurveFit, AppError> {
    let n = x.len();
    let k = model.n_params();

    validate_inputs(model, x, y)?;

    let mut params = vec![opts.initial_value.max(opts.lower_bound); k];
    let mut chi2 = chi_square(model, &params, x, y);
    if !chi2.is_finite() {
        return Err(AppError::ill_conditioned(format!(
            "Model '{}' is not finite at the initial parameter value {}.",
            model.display_name(),
            opts.initial_value
        )));
    }

    let mut lambda = LAMBDA_INIT;
    let mut converged = false;
    let mut iterations = 0;

    for iter in 0..opts.max_iters {
        iterations = iter + 1;

        if chi2 <= 1e-30 {
            converged = true;
            break;
        }

        let jac = jacobian(model, &params, x);
        let residuals = DVector::from_iterator(
            n,
            evaluate(model, &params, x)
                .iter()
                .zip(y.iter())
                .map(|(f, yi)| f - yi),
        );

        let jtj = jac.transpose() * &jac;
        let jtr = jac.transpose() * &residuals;

        // Inner loop: inflate damping until a step reduces chi-square.
        let mut accepted = false;
        while lambda <= LAMBDA_MAX {
            let Some(delta) = solve_damped_step(&jtj, &jtr, lambda) else {
                lambda *= LAMBDA_UP;
                continue;
            };

            let candidate: Vec<f64> = params
                .iter()
                .zip(delta.iter())
                .map(|(p, d)| (p - d).max(opts.lower_bound))
                .collect();

            let candidate_chi2 = chi_square(model, &candidate, x, y);
            if candidate_chi2.is_finite() && candidate_chi2 < chi2 {
                let improvement = (chi2 - candidate_chi2) / chi2.max(1e-300);
                let step_norm = params
                    .iter()
                    .zip(candidate.iter())
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f64>()
                    .sqrt();
                let param_norm = params.iter().map(|p| p * p).sum::<f64>().sqrt();

                params = candidate;
                chi2 = candidate_chi2;
                lambda = (lambda / LAMBDA_DOWN).max(1e-12);
                accepted = true;

                if improvement < opts.ftol || step_norm < opts.xtol * (param_norm + opts.xtol) {
                    converged = true;
                }
                break;
            }
            lambda *= LAMBDA_UP;
        }

        if !accepted {
            // Damping saturated without a descent direction. Gradient
            // components blocked by the lower bound do not count: a parameter
            // pinned at the bound with the objective pushing it further down
            // is at its constrained optimum. A flat projected gradient means
            // convergence; otherwise the problem is numerically stuck and the
            // caller must know.
            let projected: f64 = (0..params.len())
                .map(|j| {
                    let g = jtr[j];
                    let at_bound = params[j] <= opts.lower_bound;
                    if at_bound && g > 0.0 { 0.0 } else { g * g }
                })
                .sum::<f64>()
                .sqrt();
            if projected / (1.0 + chi2) < 1e-8 {
                converged = true;
            } else {
                return Err(AppError::convergence(format!(
                    "Fit of '{}' stalled: damping saturated with gradient norm {projected:.3e}.",
                    model.display_name()
                )));
            }
        }
        if converged {
            break;
        }
    }

    if !converged {
        return Err(AppError::convergence(format!(
            "Fit of '{}' did not converge within {} iterations (chi2={chi2:.6e}).",
            model.display_name(),
            opts.max_iters
        )));
    }

    let stderr = standard_errors(model, &params, x, chi2, n, k);

    Ok(CurveFit {
        model,
        params: FittedParams {
            values: params,
            stderr,
            lower_bound: opts.lower_bound,
        },
        chi_square: chi2,
        aic: aic(chi2, n, k),
        bic: bic(chi2, n, k),
        n_points: n,
        iterations,
    })
}

fn validate_inputs(model: ModelKind, x: &[f64], y: &[f64]) -> Result<(), AppError> {
    let n = x.len();
    let k = model.n_params();

    if n != y.len() {
        return Err(AppError::ill_conditioned(format!(
            "x and y lengths differ ({n} vs {}).",
            y.len()
        )));
    }
    if n < k {
        return Err(AppError::ill_conditioned(format!(
            "Fit of '{}' needs at least {k} points, got {n}.",
            model.display_name()
        )));
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(AppError::ill_conditioned(
            "Fit input contains non-finite values.",
        ));
    }

    // Constant x or y makes the Jacobian singular for every supported family.
    if is_constant(x) {
        return Err(AppError::ill_conditioned("All x values are identical."));
    }
    if is_constant(y) {
        return Err(AppError::ill_conditioned("All y values are identical."));
    }

    Ok(())
}

fn is_constant(values: &[f64]) -> bool {
    let Some((&first, rest)) = values.split_first() else {
        return true;
    };
    let scale = first.abs().max(1.0);
    rest.iter().all(|v| (v - first).abs() <= 1e-12 * scale)
}

fn chi_square(model: ModelKind, params: &[f64], x: &[f64], y: &[f64]) -> f64 {
    evaluate(model, params, x)
        .iter()
        .zip(y.iter())
        .map(|(f, yi)| (f - yi) * (f - yi))
        .sum()
}

/// Forward-difference Jacobian of the model at `params`.
fn jacobian(model: ModelKind, params: &[f64], x: &[f64]) -> DMatrix<f64> {
    let n = x.len();
    let k = params.len();
    let base = evaluate(model, params, x);

    let mut jac = DMatrix::zeros(n, k);
    let mut shifted = params.to_vec();
    for j in 0..k {
        let h = params[j].abs().max(1.0) * 1e-7;
        shifted[j] = params[j] + h;
        let bumped = evaluate(model, &shifted, x);
        shifted[j] = params[j];
        for i in 0..n {
            jac[(i, j)] = (bumped[i] - base[i]) / h;
        }
    }
    jac
}

/// Standard errors from `chi2/(n-k) * diag((JᵀJ)⁻¹)`.
///
/// NaN per parameter when the covariance is unavailable (n == k, or a
/// singular normal matrix).
fn standard_errors(
    model: ModelKind,
    params: &[f64],
    x: &[f64],
    chi2: f64,
    n: usize,
    k: usize,
) -> Vec<f64> {
    if n <= k {
        return vec![f64::NAN; k];
    }

    let jac = jacobian(model, params, x);
    let jtj = jac.transpose() * &jac;
    match jtj.try_inverse() {
        Some(inv) => {
            let variance_scale = chi2 / (n - k) as f64;
            (0..k)
                .map(|i| {
                    let v = variance_scale * inv[(i, i)];
                    if v.is_finite() && v >= 0.0 {
                        v.sqrt()
                    } else {
                        f64::NAN
                    }
                })
                .collect()
        }
        None => vec![f64::NAN; k],
    }
}

/// A fitting session accumulating results per (entity, train, model).
///
/// Owned by the caller and passed explicitly — results never live in
/// process-wide state.
#[derive(Debug, Default)]
pub struct CurveFitter {
    pub results: HashMap<FitKey, CurveFit>,
}

impl CurveFitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit one train bucket and record the result under its key.
    pub fn fit_series(
        &mut self,
        selection: &Selection,
        ordinal: u32,
        model: ModelKind,
        opts: &FitOptions,
        series: &TrainSeries,
    ) -> Result<CurveFit, AppError> {
        let fit = fit_curve(model, opts, &series.times, &series.freqs)?;
        self.results.insert(
            FitKey::new(selection.label(), train_label(ordinal), model),
            fit.clone(),
        );
        Ok(fit)
    }
}
