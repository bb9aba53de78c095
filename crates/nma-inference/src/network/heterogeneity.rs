//! I² with a Higgins-Thompson confidence interval.

use std::fmt::Debug;

use nma_core::Result;
use nma_prob::normal;
use serde::Serialize;

use super::analysis::{NetworkMetaAnalysis, validate_width};

/// Proportion of variability due to heterogeneity, as a fraction in `[0, 1]`.
///
/// Fields are `None` when the degrees of freedom do not support them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ISquared {
    /// Point estimate `max(0, (Q − df) / Q)`.
    pub i2: Option<f64>,
    /// Lower confidence bound.
    pub lower: Option<f64>,
    /// Upper confidence bound.
    pub upper: Option<f64>,
}

/// I² and its `width` interval from Cochran's Q and its degrees of freedom.
///
/// The interval is built on `ln H` with `H = sqrt(Q/df)` (Higgins & Thompson
/// 2002):
/// - `Q > df + 1`: `se = ½·(ln Q − ln df) / (√(2Q) − √(2df − 1))`
/// - otherwise: `se = sqrt(1/(2(df − 1)) · (1 − 1/(3(df − 1)²)))`
///
/// With `df < 1` nothing is reported; when `se` is not finite only `i2` is.
pub fn i_squared(q: f64, df: f64, width: f64) -> ISquared {
    if !(df >= 1.0) {
        return ISquared { i2: None, lower: None, upper: None };
    }
    let i2 = if q > 0.0 { ((q - df) / q).max(0.0) } else { 0.0 };
    let se_ln_h = if q > df + 1.0 {
        0.5 * (q.ln() - df.ln()) / ((2.0 * q).sqrt() - (2.0 * df - 1.0).sqrt())
    } else {
        (1.0 / (2.0 * (df - 1.0)) * (1.0 - 1.0 / (3.0 * (df - 1.0).powi(2)))).sqrt()
    };
    if !se_ln_h.is_finite() {
        return ISquared { i2: Some(i2), lower: None, upper: None };
    }

    let z = normal::critical_value(width);
    let ln_h = 0.5 * (q / df).ln();
    let to_i2 = |ln_h: f64| {
        let h = ln_h.exp().max(1.0);
        (h * h - 1.0) / (h * h)
    };
    ISquared { i2: Some(i2), lower: Some(to_i2(ln_h - z * se_ln_h)), upper: Some(to_i2(ln_h + z * se_ln_h)) }
}

impl<T, S> NetworkMetaAnalysis<T, S>
where
    T: Clone + PartialEq + Debug,
    S: Clone + PartialEq + Debug,
{
    /// I² of the whole network with a `width` confidence interval.
    pub fn i_squared(&self, width: f64) -> Result<ISquared> {
        validate_width(width)?;
        Ok(i_squared(self.q, self.df, width))
    }
}
