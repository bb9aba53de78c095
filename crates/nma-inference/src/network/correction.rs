//! Multi-arm standard-error correction.
//!
//! The `k·(k−1)/2` contrasts of a `k`-arm study share arms, so their sampling
//! errors are correlated. The correction replaces the pairwise variances by
//! edge variances of an equivalent electrical network: with `V` the diagonal
//! of pair variances and `B` the all-pairs incidence matrix,
//!
//! ```text
//! R  = diag(BᵀVB) − BᵀVB
//! L⁺ = −(BᵀB) R (BᵀB) / (2k²)
//! L  = pinv(L⁺)
//! W  = diag(L) − L
//! ```
//!
//! and the corrected variance of pair `(i, j)` is `1 / W[i, j]`. Two-arm
//! studies are left unchanged.

use nalgebra::{DMatrix, DVector};
use nma_core::{Error, Result};

use crate::linalg::{PINV_RTOL, all_pairs_incidence, pseudo_inverse};

/// Arm count of a study with `m` pairwise contrasts, if `m` is triangular.
pub(crate) fn arms_for_contrasts(m: usize) -> Option<usize> {
    let k = ((1.0 + (1.0 + 8.0 * m as f64).sqrt()) / 2.0).round() as usize;
    (k * k.saturating_sub(1) / 2 == m).then_some(k)
}

/// Corrected standard errors for one study's contrasts.
///
/// `variances` holds the contrast variances (`SE²`, plus `τ²` under random
/// effects) in all-pairs order `(0,1), (0,2), …, (1,2), …`. The result has the
/// same length and order.
pub fn correct_standard_errors(variances: &[f64]) -> Result<Vec<f64>> {
    let m = variances.len();
    let k = arms_for_contrasts(m).ok_or_else(|| {
        Error::Validation(format!("{m} contrasts do not form all pairs of a study"))
    })?;
    if k <= 2 {
        return Ok(variances.iter().map(|v| v.sqrt()).collect());
    }

    let b = all_pairs_incidence(k);
    let bt = b.transpose();
    let v = DMatrix::from_diagonal(&DVector::from_column_slice(variances));
    let btvb = &bt * &v * &b;
    let r = DMatrix::from_diagonal(&btvb.diagonal()) - &btvb;
    let btb = &bt * &b;
    let l_plus = -(&btb * r * &btb) / (2.0 * (k * k) as f64);
    let laplacian = pseudo_inverse(&l_plus, PINV_RTOL)?;

    let mut out = Vec::with_capacity(m);
    for i in 0..k {
        for j in (i + 1)..k {
            let weight = -laplacian[(i, j)];
            out.push((1.0 / weight).sqrt());
        }
    }
    if out.iter().any(|se| !se.is_finite()) {
        log::warn!("multi-arm correction produced non-finite standard errors for a {k}-arm study");
    }
    Ok(out)
}
