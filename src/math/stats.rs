//! Goodness-of-fit statistics.
//!
//! All functions take observed/predicted slices of equal length and return
//! NaN rather than panicking when a statistic is undefined (e.g. zero total
//! variance), so callers can decide how to surface degenerate cases.

use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Explained-variance R²: `1 - SS_res / SS_tot`.
///
/// Returns NaN when the observations have zero total variance.
pub fn r_squared(observed: &[f64], predicted: &[f64]) -> f64 {
    debug_assert_eq!(observed.len(), predicted.len());
    if observed.is_empty() {
        return f64::NAN;
    }

    let mean = observed.iter().sum::<f64>() / observed.len() as f64;
    let ss_tot: f64 = observed.iter().map(|y| (y - mean) * (y - mean)).sum();
    let ss_res: f64 = observed
        .iter()
        .zip(predicted.iter())
        .map(|(y, p)| (y - p) * (y - p))
        .sum();

    if ss_tot <= 0.0 {
        return f64::NAN;
    }
    1.0 - ss_res / ss_tot
}

/// Adjusted R²: `1 - (1 - r²)(n - 1)/(n - k - 1)`.
///
/// Returns NaN when `n <= k + 1`.
pub fn adjusted_r_squared(r_squared: f64, n: usize, n_params: usize) -> f64 {
    if n <= n_params + 1 {
        return f64::NAN;
    }
    let n = n as f64;
    let k = n_params as f64;
    1.0 - (1.0 - r_squared) * (n - 1.0) / (n - k - 1.0)
}

/// Root mean squared error.
pub fn rmse(observed: &[f64], predicted: &[f64]) -> f64 {
    debug_assert_eq!(observed.len(), predicted.len());
    if observed.is_empty() {
        return f64::NAN;
    }
    let mse = observed
        .iter()
        .zip(predicted.iter())
        .map(|(y, p)| (y - p) * (y - p))
        .sum::<f64>()
        / observed.len() as f64;
    mse.sqrt()
}

/// Mean squared difference between observed and predicted values.
pub fn squared_diff_mean(observed: &[f64], predicted: &[f64]) -> f64 {
    debug_assert_eq!(observed.len(), predicted.len());
    if observed.is_empty() {
        return f64::NAN;
    }
    observed
        .iter()
        .zip(predicted.iter())
        .map(|(y, p)| (y - p) * (y - p))
        .sum::<f64>()
        / observed.len() as f64
}

/// Pearson-style chi-square statistic: `Σ rᵢ² / ŷᵢ`.
///
/// Requires strictly positive predictions; returns NaN otherwise so callers
/// can mark the record failed instead of reporting a bogus p-value.
pub fn chi_square_statistic(observed: &[f64], predicted: &[f64]) -> f64 {
    debug_assert_eq!(observed.len(), predicted.len());
    if observed.is_empty() || predicted.iter().any(|&p| !(p.is_finite() && p > 0.0)) {
        return f64::NAN;
    }
    observed
        .iter()
        .zip(predicted.iter())
        .map(|(y, p)| (y - p) * (y - p) / p)
        .sum()
}

/// Upper-tail chi-square p-value: `1 - CDF(statistic, dof)`.
///
/// Returns NaN for a non-finite statistic or non-positive degrees of freedom.
pub fn chi_square_p_value(statistic: f64, dof: usize) -> f64 {
    if !statistic.is_finite() || statistic < 0.0 || dof == 0 {
        return f64::NAN;
    }
    match ChiSquared::new(dof as f64) {
        Ok(dist) => 1.0 - dist.cdf(statistic),
        Err(_) => f64::NAN,
    }
}

/// Akaike information criterion from the residual sum of squares:
/// `n·ln(chi2/n) + 2k`.
pub fn aic(chi_square: f64, n: usize, n_params: usize) -> f64 {
    let n_f = n as f64;
    n_f * (chi_square / n_f).max(1e-300).ln() + 2.0 * n_params as f64
}

/// Bayesian information criterion: `n·ln(chi2/n) + k·ln(n)`.
pub fn bic(chi_square: f64, n: usize, n_params: usize) -> f64 {
    let n_f = n as f64;
    n_f * (chi_square / n_f).max(1e-300).ln() + n_params as f64 * n_f.ln()
}
