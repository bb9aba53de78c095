//! Dense linear-algebra helpers on top of `nalgebra`.

use nalgebra::DMatrix;
use nma_core::{Error, Result};

/// Relative singular-value cutoff used when inverting multi-arm correction
/// matrices. Directions with `σ <= PINV_RTOL · σ_max` are dropped.
pub const PINV_RTOL: f64 = 1e-6;

/// Moore-Penrose pseudoinverse via SVD with a relative cutoff.
///
/// Singular values at or below `rtol · σ_max` are treated as zero instead of
/// being inverted. A matrix with non-finite entries yields an all-NaN result
/// of the transposed shape.
pub fn pseudo_inverse(m: &DMatrix<f64>, rtol: f64) -> Result<DMatrix<f64>> {
    if !(rtol >= 0.0) {
        return Err(Error::Validation(format!("rtol must be >= 0, got {}", rtol)));
    }
    let (rows, cols) = m.shape();
    if m.iter().any(|v| !v.is_finite()) {
        return Ok(DMatrix::from_element(cols, rows, f64::NAN));
    }
    if rows == 0 || cols == 0 {
        return Ok(DMatrix::zeros(cols, rows));
    }

    let svd = m.clone().svd(true, true);
    let s_max = svd.singular_values.iter().fold(0.0_f64, |a, &b| a.max(b));
    let cutoff = rtol * s_max;
    let dropped = svd.singular_values.iter().filter(|&&s| s <= cutoff).count();
    if dropped > 0 {
        log::debug!("pseudo_inverse: dropping {dropped} direction(s) below {cutoff:.3e}");
    }
    // nalgebra keeps values strictly greater than `eps`.
    svd.pseudo_inverse(cutoff).map_err(|e| Error::Computation(format!("pseudoinverse failed: {e}")))
}

/// Incidence matrix of all `k·(k−1)/2` arm pairs of a `k`-arm study.
///
/// Row order is `(0,1), (0,2), …, (0,k−1), (1,2), …`; each row has `+1` at the
/// first arm and `−1` at the second.
pub fn all_pairs_incidence(k: usize) -> DMatrix<f64> {
    let m = k * k.saturating_sub(1) / 2;
    let mut b = DMatrix::zeros(m, k);
    let mut row = 0;
    for i in 0..k {
        for j in (i + 1)..k {
            b[(row, i)] = 1.0;
            b[(row, j)] = -1.0;
            row += 1;
        }
    }
    b
}
