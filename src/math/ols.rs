//! Ordinary least squares with coefficient standard errors.
//!
//! The stationarity regressions are tall and narrow (a few columns, hundreds
//! of rows), so we solve the normal equations through a Cholesky factor of
//! `X'X`. The same factor gives `(X'X)^-1`, whose diagonal scales the residual
//! variance into coefficient variances.

use nalgebra::{DMatrix, DVector};

/// Smallest Cholesky pivot, relative to the largest, accepted as non-singular.
const MIN_RELATIVE_PIVOT: f64 = 1e-7;

#[derive(Debug, Clone, PartialEq)]
pub struct OlsFit {
    pub beta: DVector<f64>,
    pub std_errors: DVector<f64>,
    /// Residual variance `RSS / (n - k)`.
    pub sigma2: f64,
    /// Residual degrees of freedom `n - k`.
    pub dof: usize,
}

/// Fit `y = X beta + e`.
///
/// Returns `None` when there are no residual degrees of freedom or `X'X` is
/// singular or numerically close to it (collinear columns).
pub fn ols(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<OlsFit> {
    let (n, k) = x.shape();
    if n <= k || y.len() != n {
        return None;
    }

    let xt = x.transpose();
    let chol = (&xt * x).cholesky()?;

    // A near-zero pivot means some column is (numerically) a combination of
    // the others.
    let pivots = chol.l().diagonal();
    let largest = pivots.amax();
    if !(largest > 0.0) || pivots.iter().any(|p| !(*p > largest * MIN_RELATIVE_PIVOT)) {
        return None;
    }

    let beta = chol.solve(&(&xt * y));
    let residuals = y - x * &beta;

    let dof = n - k;
    let sigma2 = residuals.norm_squared() / dof as f64;
    let std_errors = chol.inverse().diagonal().map(|v| (sigma2 * v).sqrt());

    if !beta.iter().chain(std_errors.iter()).all(|v| v.is_finite()) {
        return None;
    }
    Some(OlsFit {
        beta,
        std_errors,
        sigma2,
        dof,
    })
}
