//! Comparison-adjusted funnel plot and Egger's asymmetry test.
//!
//! Each study's comparison of a treatment is centred on the network estimate
//! of the same comparison (Chaimani & Salanti 2012), so all points of a
//! symmetric funnel scatter around zero regardless of the comparator. The
//! network estimate includes indirect evidence.

use std::fmt::Debug;

use nma_core::Result;
use nma_prob::normal;
use serde::Serialize;

use super::analysis::{NetworkMetaAnalysis, validate_width};
use crate::regression::ols_with_tests;

/// Number of points on each funnel boundary curve.
pub const FUNNEL_CURVE_POINTS: usize = 500;

/// Minimum number of distinct studies for the Egger test.
const EGGER_MIN_STUDIES: usize = 5;

/// One study comparison, centred on the network estimate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdjustedEffect<T, S> {
    /// Study.
    pub study: S,
    /// The queried treatment.
    pub treatment1: T,
    /// Comparator.
    pub treatment2: T,
    /// Study effect minus network effect (additive scale).
    pub adjusted_effect: f64,
    /// Study standard error.
    pub se: f64,
}

/// A point of a funnel boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FunnelPoint {
    /// Adjusted effect.
    pub effect: f64,
    /// Standard error.
    pub se: f64,
}

/// Egger regression of `adjusted / se` on `1 / se`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EggerTest {
    /// Intercept (asymmetry estimate).
    pub intercept: f64,
    /// Standard error of the intercept.
    pub intercept_se: f64,
    /// Slope.
    pub slope: f64,
    /// Two-sided p-value of the intercept.
    pub p_value: f64,
}

/// Data for a comparison-adjusted funnel plot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonAdjustedFunnel<T, S> {
    /// Adjusted study comparisons.
    pub effects: Vec<AdjustedEffect<T, S>>,
    /// Left boundary `−z·se`, `se` from 0 to the largest study SE.
    pub lower: Vec<FunnelPoint>,
    /// Right boundary `+z·se`.
    pub upper: Vec<FunnelPoint>,
    /// Egger test; `None` with fewer than five studies.
    pub egger: Option<EggerTest>,
}

impl<T, S> NetworkMetaAnalysis<T, S>
where
    T: Clone + PartialEq + Debug,
    S: Clone + PartialEq + Debug,
{
    /// Comparison-adjusted funnel for every study comparison of `treatment`,
    /// with `level` boundaries.
    pub fn comparison_adjusted_effects(&self, treatment: &T, level: f64) -> Result<ComparisonAdjustedFunnel<T, S>> {
        validate_width(level)?;
        let i = self.index_of(treatment)?;

        let mut effects = Vec::new();
        for (c, other, effect) in self.oriented_contrasts(treatment) {
            let j = self.index_of(other)?;
            let (network, _) = self.cell(i, j);
            effects.push(AdjustedEffect {
                study: c.study.clone(),
                treatment1: treatment.clone(),
                treatment2: other.clone(),
                adjusted_effect: effect - network,
                se: c.se,
            });
        }

        let max_se = effects.iter().map(|e| e.se).filter(|s| s.is_finite()).fold(0.0_f64, f64::max);
        let z = normal::critical_value(level);
        let step = max_se / (FUNNEL_CURVE_POINTS - 1) as f64;
        let (lower, upper): (Vec<_>, Vec<_>) = (0..FUNNEL_CURVE_POINTS)
            .map(|k| {
                let se = step * k as f64;
                (FunnelPoint { effect: -z * se, se }, FunnelPoint { effect: z * se, se })
            })
            .unzip();

        let egger = egger_test(&effects);
        Ok(ComparisonAdjustedFunnel { effects, lower, upper, egger })
    }
}

fn egger_test<T, S: PartialEq>(effects: &[AdjustedEffect<T, S>]) -> Option<EggerTest> {
    let mut studies: Vec<&S> = Vec::new();
    for e in effects {
        if !studies.contains(&&e.study) {
            studies.push(&e.study);
        }
    }
    if studies.len() < EGGER_MIN_STUDIES {
        log::debug!("egger test skipped: {} studies (< {EGGER_MIN_STUDIES})", studies.len());
        return None;
    }

    let usable: Vec<&AdjustedEffect<T, S>> = effects
        .iter()
        .filter(|e| e.se > 0.0 && e.se.is_finite() && e.adjusted_effect.is_finite())
        .collect();
    let x: Vec<Vec<f64>> = usable.iter().map(|e| vec![1.0 / e.se]).collect();
    let y: Vec<f64> = usable.iter().map(|e| e.adjusted_effect / e.se).collect();
    match ols_with_tests(&x, &y, true) {
        Ok(fit) => Some(EggerTest {
            intercept: fit.coefficients[0],
            intercept_se: fit.standard_errors[0],
            slope: fit.coefficients[1],
            p_value: fit.p_values[0],
        }),
        Err(e) => {
            log::warn!("egger test failed: {e}");
            None
        }
    }
}
