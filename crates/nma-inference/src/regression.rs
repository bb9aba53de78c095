//! Ordinary least squares with coefficient significance tests.
//!
//! Closed-form fit through the normal equations `(XᵀX) β = Xᵀy`, with the
//! classical homoskedastic covariance `σ̂² (XᵀX)⁻¹` and two-sided Student-t
//! p-values on `n − d` degrees of freedom.

use nalgebra::{DMatrix, DVector};
use nma_core::{Error, Result};
use serde::Serialize;

/// Fitted OLS model with per-coefficient tests.
///
/// With an intercept, index 0 is the intercept and index `1 + a` is column `a`.
#[derive(Debug, Clone, Serialize)]
pub struct OlsSummary {
    /// Coefficient estimates.
    pub coefficients: Vec<f64>,
    /// Standard errors.
    pub standard_errors: Vec<f64>,
    /// t statistics (`coefficient / se`).
    pub t_values: Vec<f64>,
    /// Two-sided p-values.
    pub p_values: Vec<f64>,
    /// Residual degrees of freedom (`n − d`).
    pub df_residual: usize,
    /// Residual standard error.
    pub sigma: f64,
}

/// Fit `y ~ X` by OLS and test every coefficient against zero.
///
/// `x` is row-major: one inner vector per observation, all of equal length.
pub fn ols_with_tests(x: &[Vec<f64>], y: &[f64], include_intercept: bool) -> Result<OlsSummary> {
    let n = y.len();
    if x.len() != n {
        return Err(Error::Validation(format!("x rows ({}) != y length ({})", x.len(), n)));
    }
    let p = x.first().map_or(0, |r| r.len());
    if x.iter().any(|r| r.len() != p) {
        return Err(Error::Validation("x rows must all have the same length".into()));
    }
    let d = p + usize::from(include_intercept);
    if d == 0 {
        return Err(Error::Validation("model has no coefficients".into()));
    }
    if n <= d {
        return Err(Error::Validation(format!(
            "need more observations ({n}) than coefficients ({d})"
        )));
    }
    if x.iter().flatten().chain(y).any(|v| !v.is_finite()) {
        return Err(Error::Validation("x and y must be finite".into()));
    }

    let design = DMatrix::from_fn(n, d, |i, j| match (include_intercept, j) {
        (true, 0) => 1.0,
        (true, j) => x[i][j - 1],
        (false, j) => x[i][j],
    });
    let y_vec = DVector::from_column_slice(y);

    let xtx = design.transpose() * &design;
    let xtx_inv =
        xtx.try_inverse().ok_or_else(|| Error::Computation("X'X singular in OLS".into()))?;
    let beta = &xtx_inv * (design.transpose() * &y_vec);

    let resid = &y_vec - &design * &beta;
    let rss: f64 = resid.iter().map(|r| r * r).sum();
    let df_residual = n - d;
    let sigma2 = rss / df_residual as f64;

    let coefficients: Vec<f64> = beta.iter().copied().collect();
    let standard_errors: Vec<f64> =
        (0..d).map(|j| (sigma2 * xtx_inv[(j, j)]).max(0.0).sqrt()).collect();
    let t_values: Vec<f64> =
        coefficients.iter().zip(&standard_errors).map(|(b, se)| b / se).collect();
    let p_values = t_values
        .iter()
        .map(|&t| nma_prob::student_t::two_sided_p(t, df_residual as f64))
        .collect::<Result<Vec<f64>>>()?;

    Ok(OlsSummary {
        coefficients,
        standard_errors,
        t_values,
        p_values,
        df_residual,
        sigma: sigma2.sqrt(),
    })
}
