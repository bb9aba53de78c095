//! Pairwise contrasts from arm-level summaries.

use serde::Serialize;

/// Continuity correction added to every cell of a 2×2 table before taking logs.
pub const ANSCOMBE_CORRECTION: f64 = 0.5;

/// Outcome summary of one study arm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArmOutcome {
    /// `positive` events out of `total` participants.
    Binomial {
        /// Participants with the event.
        positive: u64,
        /// Participants in the arm.
        total: u64,
    },
    /// Sample mean, standard deviation and size.
    Continuous {
        /// Sample mean.
        mean: f64,
        /// Sample standard deviation.
        sd: f64,
        /// Sample size.
        n: u64,
    },
}

impl ArmOutcome {
    /// Number of participants in the arm.
    pub fn size(&self) -> u64 {
        match *self {
            ArmOutcome::Binomial { total, .. } => total,
            ArmOutcome::Continuous { n, .. } => n,
        }
    }
}

/// One directed within-study comparison `treatment1` vs `treatment2`.
///
/// `effect` is on the additive scale (log odds ratio or mean difference) and
/// is positive when `treatment1` has the larger outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contrast<T, S> {
    /// Study the two arms come from.
    pub study: S,
    /// First treatment.
    pub treatment1: T,
    /// Second treatment.
    pub treatment2: T,
    /// Effect of `treatment1` relative to `treatment2`.
    pub effect: f64,
    /// Standard error of `effect`, uncorrected for multi-arm correlation.
    pub se: f64,
    /// Combined size of both arms.
    pub n: u64,
}

/// Effect and standard error of arm `a` versus arm `b`.
///
/// Both arms must carry the same kind of outcome; mixed kinds give NaN.
pub fn pair_estimate(a: &ArmOutcome, b: &ArmOutcome) -> (f64, f64) {
    match (*a, *b) {
        (
            ArmOutcome::Binomial { positive: pa, total: na },
            ArmOutcome::Binomial { positive: pb, total: nb },
        ) => {
            let c = ANSCOMBE_CORRECTION;
            let (ea, fa) = (pa as f64 + c, na as f64 - pa as f64 + c);
            let (eb, fb) = (pb as f64 + c, nb as f64 - pb as f64 + c);
            let effect = (ea / fa).ln() - (eb / fb).ln();
            let se = (1.0 / ea + 1.0 / fa + 1.0 / eb + 1.0 / fb).sqrt();
            (effect, se)
        }
        (
            ArmOutcome::Continuous { mean: ma, sd: sa, n: na },
            ArmOutcome::Continuous { mean: mb, sd: sb, n: nb },
        ) => {
            let se = (sa * sa / na as f64 + sb * sb / nb as f64).sqrt();
            (ma - mb, se)
        }
        _ => (f64::NAN, f64::NAN),
    }
}

/// All `k·(k−1)/2` contrasts of one study, in `(0,1), (0,2), …, (1,2), …` order.
///
/// Returns `(i, j, effect, se, n)` per pair, `i < j` being arm positions
/// within `arms`. A single-arm study yields nothing.
pub fn study_contrasts(arms: &[ArmOutcome]) -> Vec<(usize, usize, f64, f64, u64)> {
    let k = arms.len();
    let mut out = Vec::with_capacity(k * k.saturating_sub(1) / 2);
    for i in 0..k {
        for j in (i + 1)..k {
            let (effect, se) = pair_estimate(&arms[i], &arms[j]);
            out.push((i, j, effect, se, arms[i].size() + arms[j].size()));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_log_odds_ratio_with_correction() {
        let a = ArmOutcome::Binomial { positive: 10, total: 13 };
        let b = ArmOutcome::Binomial { positive: 12, total: 20 };
        let (effect, se) = pair_estimate(&a, &b);
        let expected = ((10.5 / 3.5) / (12.5 / 8.5_f64)).ln();
        assert_relative_eq!(effect, expected, epsilon = 1e-14);
        let expected_se = (1.0 / 10.5 + 1.0 / 3.5 + 1.0 / 12.5 + 1.0 / 8.5_f64).sqrt();
        assert_relative_eq!(se, expected_se, epsilon = 1e-14);
    }

    #[test]
    fn test_zero_cells_stay_finite() {
        let a = ArmOutcome::Binomial { positive: 0, total: 10 };
        let b = ArmOutcome::Binomial { positive: 10, total: 10 };
        let (effect, se) = pair_estimate(&a, &b);
        assert!(effect.is_finite() && se.is_finite());
        assert!(effect < 0.0);
    }

    #[test]
    fn test_mean_difference() {
        let a = ArmOutcome::Continuous { mean: 5.0, sd: 2.0, n: 16 };
        let b = ArmOutcome::Continuous { mean: 3.5, sd: 3.0, n: 9 };
        let (effect, se) = pair_estimate(&a, &b);
        assert_relative_eq!(effect, 1.5, epsilon = 1e-14);
        assert_relative_eq!(se, (4.0 / 16.0 + 9.0 / 9.0_f64).sqrt(), epsilon = 1e-14);
    }

    #[test]
    fn test_mixed_outcomes_are_nan() {
        let a = ArmOutcome::Binomial { positive: 1, total: 2 };
        let b = ArmOutcome::Continuous { mean: 1.0, sd: 1.0, n: 2 };
        let (effect, se) = pair_estimate(&a, &b);
        assert!(effect.is_nan() && se.is_nan());
    }

    #[test]
    fn test_study_contrasts_enumerates_all_pairs() {
        let arms: Vec<ArmOutcome> = (0..4)
            .map(|i| ArmOutcome::Continuous { mean: i as f64, sd: 1.0, n: 10 + i })
            .collect();
        let pairs = study_contrasts(&arms);
        let idx: Vec<(usize, usize)> = pairs.iter().map(|p| (p.0, p.1)).collect();
        assert_eq!(idx, vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]);
        assert_eq!(pairs[0].4, 21);
        assert_relative_eq!(pairs[5].2, -1.0, epsilon = 1e-14);
        assert!(study_contrasts(&arms[..1]).is_empty());
    }
}
