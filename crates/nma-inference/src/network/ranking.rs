//! P-score ranking.

use std::cmp::Ordering;
use std::fmt::Debug;

use nma_prob::normal;
use serde::Serialize;

use super::analysis::NetworkMetaAnalysis;

/// Ranking score of one treatment, in `[0, 1]` (NaN without any evidence).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PScore<T> {
    /// Treatment.
    pub treatment: T,
    /// Mean certainty that the treatment beats a competitor.
    pub score: f64,
}

/// One-sided p-value that an effect is beneficial, from its two-sided test.
fn one_sided(effect: f64, p_two_sided: f64) -> f64 {
    let weight = match effect.partial_cmp(&0.0) {
        Some(Ordering::Greater) => 1.0,
        Some(Ordering::Less) => 0.0,
        _ => 0.5,
    };
    weight * (1.0 - p_two_sided / 2.0) + (1.0 - weight) * (p_two_sided / 2.0)
}

impl<T, S> NetworkMetaAnalysis<T, S>
where
    T: Clone + PartialEq + Debug,
    S: Clone + PartialEq + Debug,
{
    /// P-scores of every treatment, best first.
    ///
    /// The score of `i` is the mean over competitors `j` of the one-sided
    /// certainty that `i` is better than `j`. Competitors without evidence
    /// (NaN cells, i.e. other components) are left out of the mean, so a
    /// treatment is ranked against its own component only; the scores of
    /// different components are still sorted together. Larger effects are
    /// better unless `smaller_better`.
    pub fn p_scores(&self, smaller_better: bool) -> Vec<PScore<T>> {
        let n = self.treatments.len();
        let sign = if smaller_better { -1.0 } else { 1.0 };
        let mut scores: Vec<PScore<T>> = (0..n)
            .map(|i| {
                let (sum, count) = (0..n)
                    .filter(|&j| j != i)
                    .filter_map(|j| {
                        let (effect, se) = self.cell(i, j);
                        let effect = sign * effect;
                        let p = normal::two_sided_p(effect / se);
                        (!p.is_nan()).then(|| one_sided(effect, p))
                    })
                    .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
                let score = if count > 0 { sum / count as f64 } else { f64::NAN };
                PScore { treatment: self.treatments[i].clone(), score }
            })
            .collect();

        scores.sort_by(|a, b| match (a.score.is_nan(), b.score.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => b.score.total_cmp(&a.score),
        });
        scores
    }
}
