//! Weighted quantiles.

use nma_core::{Error, Result};

/// Weighted quantile of `values` at probability `q`.
///
/// Values are sorted ascending and the first value whose cumulative weight
/// reaches `q · Σw` is returned. Zero-weight values never become the answer
/// unless every weight before them is also zero.
pub fn weighted_quantile(values: &[f64], weights: &[f64], q: f64) -> Result<f64> {
    if values.is_empty() {
        return Err(Error::Validation("weighted_quantile requires at least one value".into()));
    }
    if values.len() != weights.len() {
        return Err(Error::Validation(format!(
            "values length ({}) != weights length ({})",
            values.len(),
            weights.len()
        )));
    }
    if !(0.0..=1.0).contains(&q) {
        return Err(Error::Validation(format!("q must be in [0, 1], got {}", q)));
    }
    for (i, (&v, &w)) in values.iter().zip(weights).enumerate() {
        if !v.is_finite() {
            return Err(Error::Validation(format!("value {i} must be finite")));
        }
        if !w.is_finite() || w < 0.0 {
            return Err(Error::Validation(format!("weight {i} must be finite and >= 0")));
        }
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return Err(Error::Validation("weights must not all be zero".into()));
    }

    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let target = q * total;
    let mut acc = 0.0;
    for &i in &order {
        acc += weights[i];
        if weights[i] > 0.0 && acc >= target {
            return Ok(values[i]);
        }
    }
    // Rounding can leave `acc` a hair below `target` at q = 1.
    let last = order.iter().rev().find(|&&i| weights[i] > 0.0).copied().unwrap_or(order[0]);
    Ok(values[last])
}
