//! Standard normal distribution utilities.

use statrs::function::erf::{erfc, erfc_inv};
use std::f64::consts::SQRT_2;

/// Standard normal CDF `Φ(x)` via erfc.
#[inline]
pub fn cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// Standard normal quantile `Φ⁻¹(p)`.
///
/// Returns `-inf` / `+inf` at `p = 0` / `p = 1` and NaN outside `[0, 1]`.
pub fn inverse_cdf(p: f64) -> f64 {
    if !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    -SQRT_2 * erfc_inv(2.0 * p)
}

/// Two-sided critical value for a central interval of probability `width`
/// (e.g. `1.959964` for `0.95`).
#[inline]
pub fn critical_value(width: f64) -> f64 {
    inverse_cdf((1.0 + width) / 2.0)
}

/// Two-sided Wald p-value `2·(1 − Φ(|z|))`. NaN in, NaN out.
#[inline]
pub fn two_sided_p(z: f64) -> f64 {
    erfc(z.abs() / SQRT_2)
}
