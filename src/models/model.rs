//! Model evaluation for the supported closed-form families.
//!
//! The fitting engine only needs two things from a model:
//! - its parameter count (`ModelKind::n_params`)
//! - predicted y values for given parameters and x values (`evaluate`)
//!
//! Everything else (Jacobians, residuals) is derived numerically by the
//! fitter, so adding a model family is a matter of extending the match below.

use crate::domain::ModelKind;

/// Predict `y` at a single `x` for the given model kind.
///
/// # Panics
/// Panics if `params` does not have length `model.n_params()`. Callers size
/// the parameter vector from the same `ModelKind` they evaluate with.
pub fn eval_at(model: ModelKind, params: &[f64], x: f64) -> f64 {
    match model {
        ModelKind::Linear => params[0] * x + params[1],
        ModelKind::PowerLaw => params[0] * x.powf(params[1]),
        ModelKind::Exponential => params[0] * (params[1] * x).exp(),
        ModelKind::PowerLawOffset => params[0] * x.powf(params[1]) + params[2],
    }
}

/// Predict `y` for every `x`.
pub fn evaluate(model: ModelKind, params: &[f64], xs: &[f64]) -> Vec<f64> {
    xs.iter().map(|&x| eval_at(model, params, x)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_is_exact() {
        let y = eval_at(ModelKind::Linear, &[2.0, -1.0], 3.0);
        assert!((y - 5.0).abs() < 1e-12);
    }

    #[test]
    fn power_law_matches_closed_form() {
        let params = [3.0, 0.5];
        for &x in &[0.25, 1.0, 4.0, 9.0] {
            let y = eval_at(ModelKind::PowerLaw, &params, x);
            assert!((y - 3.0 * x.sqrt()).abs() < 1e-12);
        }
    }

    #[test]
    fn offset_family_has_three_params() {
        let y = eval_at(ModelKind::PowerLawOffset, &[2.0, 1.0, 10.0], 4.0);
        assert!((y - 18.0).abs() < 1e-12);
    }

    #[test]
    fn evaluate_preserves_input_order() {
        let xs = [4.0, 1.0, 9.0];
        let ys = evaluate(ModelKind::PowerLaw, &[1.0, 0.5], &xs);
        assert_eq!(ys.len(), 3);
        assert!((ys[0] - 2.0).abs() < 1e-12);
        assert!((ys[1] - 1.0).abs() < 1e-12);
        assert!((ys[2] - 3.0).abs() < 1e-12);
    }
}
