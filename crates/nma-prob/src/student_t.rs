//! Student-t distribution utilities.

use nma_core::{Error, Result};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Two-sided p-value `P(|T| >= |t|)` for a Student-t with `df` degrees of freedom.
pub fn two_sided_p(t: f64, df: f64) -> Result<f64> {
    if !df.is_finite() || df <= 0.0 {
        return Err(Error::Validation(format!("df must be finite and > 0, got {}", df)));
    }
    if t.is_nan() {
        return Ok(f64::NAN);
    }
    let dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|e| Error::Computation(format!("Student-t construction failed: {e}")))?;
    Ok(2.0 * dist.sf(t.abs()))
}
