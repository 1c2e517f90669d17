//! Weighted least squares solver.
//!
//! The built-in oracle repeatedly solves small linear regression problems of the form:
//!
//! ```text
//! minimize Σ w_i (y_i - x_i^T p)^2
//! ```
//!
//! The model is linear in its free parameters once the stepped parameter is frozen,
//! so every probe of the sweep is one (or, for cstat, a few reweighted) solves.
//!
//! Implementation choices:
//! - We scale rows by `sqrt(w_i)` and solve an ordinary least squares problem.
//! - We use SVD so that tall design matrices (more rows than columns) and
//!   nearly collinear components are handled without panicking.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(p) = svd.solve(y, tol) {
            if p.iter().all(|v| v.is_finite()) {
                return Some(p);
            }
        }
    }

    None
}

/// Parameter covariance `(XᵀX)⁻¹` of an already row-weighted design matrix.
///
/// Returns `None` when the normal matrix is singular.
pub fn covariance(xw: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let normal = xw.transpose() * xw;
    normal
        .try_inverse()
        .filter(|cov| cov.iter().all(|v| v.is_finite()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let p = solve_least_squares(&x, &y).unwrap();
        assert!((p[0] - 2.0).abs() < 1e-10);
        assert!((p[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn covariance_of_unit_design_is_identity_scaled() {
        // Two observations of a single constant with unit weight: var = 1/2.
        let x = DMatrix::from_row_slice(2, 1, &[1.0, 1.0]);
        let cov = covariance(&x).unwrap();
        assert!((cov[(0, 0)] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn covariance_rejects_singular_design() {
        let x = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        assert!(covariance(&x).is_none());
    }
}
