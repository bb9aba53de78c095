//! Queryable result of a network meta-analysis.

use std::fmt::Debug;

use nalgebra::DMatrix;
use nma_core::{EffectMeasure, Error, Result};
use nma_prob::normal;
use serde::Serialize;

use super::contrast::Contrast;
use super::merge::MergedNetwork;

/// Wald test and confidence interval for one effect.
///
/// `lower` and `upper` are on the reporting scale (exponentiated for odds
/// ratios, so the interval is not symmetric around the estimate there).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InferentialStatistics {
    /// Two-sided p-value.
    pub p: f64,
    /// Lower confidence bound.
    pub lower: f64,
    /// Upper confidence bound.
    pub upper: f64,
}

impl InferentialStatistics {
    /// Wald statistics for an additive-scale `effect` with standard error `se`.
    pub fn wald(measure: EffectMeasure, effect: f64, se: f64, width: f64, null_effect: f64) -> Self {
        let z = normal::critical_value(width);
        InferentialStatistics {
            p: normal::two_sided_p((effect - null_effect) / se),
            lower: measure.back_transform(effect - z * se),
            upper: measure.back_transform(effect + z * se),
        }
    }
}

/// One study's own comparison of a treatment against another.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudyLevelEffect<T, S> {
    /// Study the comparison comes from.
    pub study: S,
    /// The queried treatment.
    pub treatment1: T,
    /// The comparator.
    pub treatment2: T,
    /// Effect of `treatment1` vs `treatment2`, reporting scale.
    pub effect: f64,
    /// Standard error on the additive scale.
    pub se: f64,
    /// Combined size of both arms.
    pub n: u64,
    /// Wald statistics from this study alone.
    #[serde(flatten)]
    pub statistics: InferentialStatistics,
}

/// One cell of a league table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeagueEntry<T> {
    /// Row treatment.
    pub treatment1: T,
    /// Column treatment.
    pub treatment2: T,
    /// Network effect of `treatment1` vs `treatment2`, reporting scale.
    pub effect: f64,
    /// Wald statistics of the network effect.
    #[serde(flatten)]
    pub statistics: InferentialStatistics,
}

/// Result of [`odds_ratio_nma`](super::odds_ratio_nma) or
/// [`mean_difference_nma`](super::mean_difference_nma).
///
/// Effects are stored on the additive scale and back-transformed on query.
/// Pairs of treatments from different connected components have no evidence;
/// every query on such a pair yields NaN.
#[derive(Debug, Clone)]
pub struct NetworkMetaAnalysis<T, S> {
    pub(crate) measure: EffectMeasure,
    pub(crate) random_effects: bool,
    pub(crate) treatments: Vec<T>,
    pub(crate) effects: DMatrix<f64>,
    pub(crate) se: DMatrix<f64>,
    pub(crate) contrasts: Vec<Contrast<T, S>>,
    pub(crate) components: Vec<Vec<T>>,
    pub(crate) tau: Vec<f64>,
    pub(crate) q: f64,
    pub(crate) df: f64,
}

impl<T, S> NetworkMetaAnalysis<T, S>
where
    T: Clone + PartialEq + Debug,
    S: Clone + PartialEq + Debug,
{
    pub(crate) fn from_merged(measure: EffectMeasure, random_effects: bool, merged: MergedNetwork<T, S>) -> Self {
        NetworkMetaAnalysis {
            measure,
            random_effects,
            treatments: merged.treatments,
            effects: merged.effects,
            se: merged.se,
            contrasts: merged.contrasts,
            components: merged.components,
            tau: merged.tau,
            q: merged.q,
            df: merged.df,
        }
    }

    /// Effect measure of the analysis.
    pub fn measure(&self) -> EffectMeasure {
        self.measure
    }

    /// Whether τ² was folded into the weights.
    pub fn random_effects(&self) -> bool {
        self.random_effects
    }

    /// Treatments, grouped by component, in first-appearance order within each.
    pub fn treatments(&self) -> &[T] {
        &self.treatments
    }

    /// Connected components of the evidence network.
    pub fn components(&self) -> &[Vec<T>] {
        &self.components
    }

    /// Every within-study contrast, with its uncorrected standard error.
    pub fn contrasts(&self) -> &[Contrast<T, S>] {
        &self.contrasts
    }

    /// Cochran's Q, summed over components.
    pub fn q(&self) -> f64 {
        self.q
    }

    /// Degrees of freedom of Q, summed over components.
    pub fn df(&self) -> f64 {
        self.df
    }

    /// DerSimonian-Laird τ of each component, in [`components`](Self::components) order.
    pub fn tau(&self) -> &[f64] {
        &self.tau
    }

    pub(crate) fn index_of(&self, treatment: &T) -> Result<usize> {
        self.treatments
            .iter()
            .position(|t| t == treatment)
            .ok_or_else(|| Error::UnknownTreatment(format!("{treatment:?}")))
    }

    /// Additive-scale effect and SE of cell `(i, j)`.
    pub(crate) fn cell(&self, i: usize, j: usize) -> (f64, f64) {
        (self.effects[(i, j)], self.se[(i, j)])
    }

    /// Network effect of `a` relative to `b` on the reporting scale.
    ///
    /// NaN when `a` and `b` are in different components.
    pub fn effect(&self, a: &T, b: &T) -> Result<f64> {
        let (i, j) = (self.index_of(a)?, self.index_of(b)?);
        Ok(self.measure.back_transform(self.effects[(i, j)]))
    }

    /// Standard error of the network effect of `a` vs `b` (additive scale).
    pub fn standard_error(&self, a: &T, b: &T) -> Result<f64> {
        let (i, j) = (self.index_of(a)?, self.index_of(b)?);
        Ok(self.se[(i, j)])
    }

    /// Wald test of `a` vs `b` against `null_effect` (additive scale) with a
    /// `width` confidence interval.
    pub fn inferential_statistics(
        &self,
        a: &T,
        b: &T,
        width: f64,
        null_effect: f64,
    ) -> Result<InferentialStatistics> {
        validate_width(width)?;
        let (i, j) = (self.index_of(a)?, self.index_of(b)?);
        let (effect, se) = self.cell(i, j);
        Ok(InferentialStatistics::wald(self.measure, effect, se, width, null_effect))
    }

    /// The studies' own comparisons of `treatment` against every comparator,
    /// oriented so `treatment` is always `treatment1`.
    pub fn study_level_effects(&self, treatment: &T, width: f64) -> Result<Vec<StudyLevelEffect<T, S>>> {
        validate_width(width)?;
        self.index_of(treatment)?;
        Ok(self
            .oriented_contrasts(treatment)
            .map(|(c, other, effect)| StudyLevelEffect {
                study: c.study.clone(),
                treatment1: treatment.clone(),
                treatment2: other.clone(),
                effect: self.measure.back_transform(effect),
                se: c.se,
                n: c.n,
                statistics: InferentialStatistics::wald(self.measure, effect, c.se, width, 0.0),
            })
            .collect())
    }

    /// Contrasts touching `treatment` as `(contrast, comparator, effect)` with
    /// the additive effect of `treatment` vs the comparator.
    pub(crate) fn oriented_contrasts<'a>(
        &'a self,
        treatment: &'a T,
    ) -> impl Iterator<Item = (&'a Contrast<T, S>, &'a T, f64)> + 'a {
        self.contrasts.iter().filter_map(move |c| {
            if &c.treatment1 == treatment {
                Some((c, &c.treatment2, c.effect))
            } else if &c.treatment2 == treatment {
                Some((c, &c.treatment1, -c.effect))
            } else {
                None
            }
        })
    }

    /// All ordered pairs of distinct treatments with network effects and
    /// `width` intervals.
    pub fn league_table(&self, width: f64) -> Result<Vec<LeagueEntry<T>>> {
        validate_width(width)?;
        let n = self.treatments.len();
        let mut out = Vec::with_capacity(n * n.saturating_sub(1));
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let (effect, se) = self.cell(i, j);
                out.push(LeagueEntry {
                    treatment1: self.treatments[i].clone(),
                    treatment2: self.treatments[j].clone(),
                    effect: self.measure.back_transform(effect),
                    statistics: InferentialStatistics::wald(self.measure, effect, se, width, 0.0),
                });
            }
        }
        Ok(out)
    }
}

pub(crate) fn validate_width(width: f64) -> Result<()> {
    if !(width > 0.0 && width < 1.0) {
        return Err(Error::Validation(format!("confidence width must be in (0, 1), got {width}")));
    }
    Ok(())
}
