//! Damped least-squares step solver.
//!
//! Each Levenberg–Marquardt iteration solves the damped normal equations
//!
//! ```text
//! (JᵀJ + λ·diag(JᵀJ)) δ = Jᵀr
//! ```
//!
//! for the parameter step `δ`. The system is tiny (2–3 columns) but can be
//! near-singular when the Jacobian columns are close to collinear, so we use
//! SVD with a ladder of progressively looser tolerances rather than a direct
//! decomposition that would fail outright.

use nalgebra::{DMatrix, DVector};

/// Solve a (possibly damped) least-squares system via SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(a: &DMatrix<f64>, b: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = a.clone().svd(true, true);

    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(x) = svd.solve(b, tol) {
            if x.iter().all(|v| v.is_finite()) {
                return Some(x);
            }
        }
    }

    None
}

/// Solve the damped normal equations for one LM step.
///
/// `jtj` is `JᵀJ`, `jtr` is `Jᵀr`, and `lambda` is the damping factor applied
/// to the diagonal (Marquardt scaling).
pub fn solve_damped_step(
    jtj: &DMatrix<f64>,
    jtr: &DVector<f64>,
    lambda: f64,
) -> Option<DVector<f64>> {
    let k = jtj.nrows();
    let mut damped = jtj.clone();
    for i in 0..k {
        // Floor the diagonal so a zero column cannot make the damping a no-op.
        let d = jtj[(i, i)].abs().max(1e-12);
        damped[(i, i)] += lambda * d;
    }
    solve_least_squares(&damped, jtr)
}
