//! Network meta-analysis (NMA) from arm-level study data.
//!
//! Each study contributes two or more arms (treatment + outcome summary).
//! The pipeline is:
//!
//! 1. validate the parallel input arrays;
//! 2. split the treatments into connected components ([`connected_components`]);
//! 3. per component: build all within-study contrasts, correct multi-arm
//!    standard errors, and solve the weighted least-squares network
//!    (twice under random effects: once to estimate τ², once with
//!    `SE² + τ²` weights);
//! 4. merge the components into one [`NetworkMetaAnalysis`], with NaN for
//!    pairs of treatments that share no evidence.
//!
//! ## Methods
//!
//! - Effects: log odds ratio with 0.5 added to every cell, or mean difference.
//! - Solver: graph-theoretic (electrical network) least squares
//!   (Rücker 2012), with multi-arm correction via the Laplacian pseudoinverse.
//! - Heterogeneity: Cochran's Q with `Σ(k_s − 1) − (n − 1)` degrees of freedom,
//!   DerSimonian-Laird τ² generalised to networks, Higgins-Thompson I².
//! - Ranking: P-scores (Rücker & Schwarzer 2015).
//! - Small-study effects: comparison-adjusted funnel with an Egger test.

mod analysis;
mod contrast;
mod correction;
mod funnel;
mod graph;
mod heterogeneity;
mod merge;
mod ranking;
mod solver;

use std::fmt::Debug;
use std::ops::Range;

use nma_core::{EffectMeasure, Error, Result};

pub use analysis::{InferentialStatistics, LeagueEntry, NetworkMetaAnalysis, StudyLevelEffect};
pub use contrast::{ANSCOMBE_CORRECTION, ArmOutcome, Contrast, pair_estimate, study_contrasts};
pub use correction::correct_standard_errors;
pub use funnel::{AdjustedEffect, ComparisonAdjustedFunnel, EggerTest, FUNNEL_CURVE_POINTS, FunnelPoint};
pub use graph::connected_components;
pub use heterogeneity::{ISquared, i_squared};
pub use ranking::PScore;
pub use solver::{ContrastSet, NetworkFit, solve_network};

use graph::{component_indices, index_values};
use merge::{ComponentResult, merge_components};

/// Odds-ratio NMA from binomial arm data.
///
/// `studies[i]`, `treatments[i]`, `positive_counts[i]` and `total_counts[i]`
/// describe arm `i`; all four slices must have the same, non-zero length.
///
/// # Errors
/// [`Error::Validation`] for mismatched lengths, an empty input, a positive
/// count above its total, a treatment repeated within a study, or a network
/// in which no study has two arms.
pub fn odds_ratio_nma<S, T>(
    studies: &[S],
    treatments: &[T],
    positive_counts: &[u64],
    total_counts: &[u64],
    random_effects: bool,
) -> Result<NetworkMetaAnalysis<T, S>>
where
    S: Clone + PartialEq + Debug,
    T: Clone + PartialEq + Debug,
{
    check_lengths(&[
        ("studies", studies.len()),
        ("treatments", treatments.len()),
        ("positive_counts", positive_counts.len()),
        ("total_counts", total_counts.len()),
    ])?;
    let mut outcomes = Vec::with_capacity(studies.len());
    for (i, (&positive, &total)) in positive_counts.iter().zip(total_counts).enumerate() {
        if positive > total {
            return Err(Error::Validation(format!(
                "arm {i}: positive count {positive} exceeds total count {total}"
            )));
        }
        outcomes.push(ArmOutcome::Binomial { positive, total });
    }
    fit_network(EffectMeasure::OddsRatio, studies, treatments, &outcomes, random_effects)
}

/// Mean-difference NMA from continuous arm data.
///
/// `studies[i]`, `treatments[i]`, `means[i]`, `standard_deviations[i]` and
/// `sample_sizes[i]` describe arm `i`; all five slices must have the same,
/// non-zero length.
///
/// # Errors
/// [`Error::Validation`] for mismatched lengths, an empty input, a non-finite
/// mean, a negative or non-finite SD, a zero sample size, a treatment
/// repeated within a study, or a network in which no study has two arms.
pub fn mean_difference_nma<S, T>(
    studies: &[S],
    treatments: &[T],
    means: &[f64],
    standard_deviations: &[f64],
    sample_sizes: &[u64],
    random_effects: bool,
) -> Result<NetworkMetaAnalysis<T, S>>
where
    S: Clone + PartialEq + Debug,
    T: Clone + PartialEq + Debug,
{
    check_lengths(&[
        ("studies", studies.len()),
        ("treatments", treatments.len()),
        ("means", means.len()),
        ("standard_deviations", standard_deviations.len()),
        ("sample_sizes", sample_sizes.len()),
    ])?;
    let mut outcomes = Vec::with_capacity(studies.len());
    for i in 0..studies.len() {
        let (mean, sd, n) = (means[i], standard_deviations[i], sample_sizes[i]);
        if !mean.is_finite() {
            return Err(Error::Validation(format!("arm {i}: mean must be finite")));
        }
        if !sd.is_finite() || sd < 0.0 {
            return Err(Error::Validation(format!("arm {i}: standard deviation must be finite and >= 0")));
        }
        if n == 0 {
            return Err(Error::Validation(format!("arm {i}: sample size must be > 0")));
        }
        outcomes.push(ArmOutcome::Continuous { mean, sd, n });
    }
    fit_network(EffectMeasure::MeanDifference, studies, treatments, &outcomes, random_effects)
}

fn check_lengths(columns: &[(&str, usize)]) -> Result<()> {
    let (first_name, len) = columns[0];
    if len == 0 {
        return Err(Error::Validation("no studies supplied".into()));
    }
    for &(name, other) in &columns[1..] {
        if other != len {
            return Err(Error::Validation(format!(
                "array lengths differ: {first_name} has {len}, {name} has {other}"
            )));
        }
    }
    Ok(())
}

/// Arms of each distinct study (first-appearance order), rejecting studies
/// that list a treatment twice.
fn group_arms<S, T>(studies: &[S], treatments: &[T]) -> Result<(Vec<S>, Vec<Vec<usize>>)>
where
    S: Clone + PartialEq + Debug,
    T: PartialEq + Debug,
{
    let (labels, study_of) = index_values(studies);
    let mut arms: Vec<Vec<usize>> = vec![Vec::new(); labels.len()];
    for (arm, &s) in study_of.iter().enumerate() {
        if let Some(&dup) = arms[s].iter().find(|&&a| treatments[a] == treatments[arm]) {
            return Err(Error::Validation(format!(
                "study {:?} lists treatment {:?} twice (arms {dup} and {arm})",
                labels[s], treatments[arm]
            )));
        }
        arms[s].push(arm);
    }
    Ok((labels, arms))
}

fn fit_network<S, T>(
    measure: EffectMeasure,
    studies: &[S],
    treatments: &[T],
    outcomes: &[ArmOutcome],
    random_effects: bool,
) -> Result<NetworkMetaAnalysis<T, S>>
where
    S: Clone + PartialEq + Debug,
    T: Clone + PartialEq + Debug,
{
    let (labels, study_arms) = group_arms(studies, treatments)?;
    if study_arms.iter().all(|arms| arms.len() < 2) {
        return Err(Error::Validation("no contrasts: every study has a single arm".into()));
    }

    let (nodes, components) = component_indices(studies, treatments);
    let (_, node_of) = index_values(treatments);
    let mut local_of = vec![0usize; nodes.len()];
    let mut component_of = vec![0usize; nodes.len()];
    for (c, members) in components.iter().enumerate() {
        for (local, &node) in members.iter().enumerate() {
            local_of[node] = local;
            component_of[node] = c;
        }
    }

    log::debug!(
        "{} NMA: {} arms, {} studies, {} treatments, {} component(s), random_effects={}",
        measure.label(),
        studies.len(),
        labels.len(),
        nodes.len(),
        components.len(),
        random_effects
    );

    let network = NetworkInput {
        labels: &labels,
        study_arms: &study_arms,
        treatments,
        outcomes,
        node_of: &node_of,
        local_of: &local_of,
    };
    let mut parts = Vec::with_capacity(components.len());
    for (c, members) in components.iter().enumerate() {
        let in_component: Vec<usize> = (0..labels.len())
            .filter(|&s| component_of[node_of[study_arms[s][0]]] == c)
            .collect();
        let member_values: Vec<T> = members.iter().map(|&node| nodes[node].clone()).collect();
        parts.push(fit_component(&network, member_values, &in_component, random_effects)?);
    }

    Ok(NetworkMetaAnalysis::from_merged(measure, random_effects, merge_components(parts)))
}

/// Arm-level data shared by every component fit.
struct NetworkInput<'a, S, T> {
    labels: &'a [S],
    study_arms: &'a [Vec<usize>],
    treatments: &'a [T],
    outcomes: &'a [ArmOutcome],
    node_of: &'a [usize],
    local_of: &'a [usize],
}

fn fit_component<S, T>(
    input: &NetworkInput<'_, S, T>,
    members: Vec<T>,
    studies: &[usize],
    random_effects: bool,
) -> Result<ComponentResult<T, S>>
where
    S: Clone + PartialEq + Debug,
    T: Clone + PartialEq + Debug,
{
    let n = members.len();
    let mut contrasts = Vec::new();
    let mut effects = Vec::new();
    let mut variances = Vec::new();
    let mut pairs = Vec::new();
    let mut study_index = Vec::new();
    let mut arm_counts = Vec::new();
    let mut ranges: Vec<Range<usize>> = Vec::new();

    for &s in studies {
        let arms = &input.study_arms[s];
        if arms.len() < 2 {
            continue;
        }
        let local_study = arm_counts.len();
        arm_counts.push(arms.len());
        let start = effects.len();
        let arm_outcomes: Vec<ArmOutcome> = arms.iter().map(|&a| input.outcomes[a]).collect();
        for (i, j, effect, se, size) in study_contrasts(&arm_outcomes) {
            let (a, b) = (arms[i], arms[j]);
            contrasts.push(Contrast {
                study: input.labels[s].clone(),
                treatment1: input.treatments[a].clone(),
                treatment2: input.treatments[b].clone(),
                effect,
                se,
                n: size,
            });
            effects.push(effect);
            variances.push(se * se);
            pairs.push((input.local_of[input.node_of[a]], input.local_of[input.node_of[b]]));
            study_index.push(local_study);
        }
        ranges.push(start..effects.len());
    }

    if contrasts.is_empty() {
        // Treatment seen only in single-arm studies: nothing to estimate.
        let effects = nalgebra::DMatrix::from_fn(n, n, |i, j| if i == j { 0.0 } else { f64::NAN });
        return Ok(ComponentResult {
            treatments: members,
            se: effects.clone(),
            effects,
            contrasts,
            q: 0.0,
            df: 0.0,
            tau: 0.0,
        });
    }

    let solve = |tau_squared: f64| -> Result<NetworkFit> {
        let se = corrected_standard_errors(&variances, &ranges, tau_squared)?;
        solve_network(
            n,
            ContrastSet {
                effects: &effects,
                se: &se,
                pairs: &pairs,
                studies: &study_index,
                study_arms: &arm_counts,
            },
        )
    };

    let fixed = solve(0.0)?;
    let (q, df, tau) = (fixed.q, fixed.df, fixed.tau());
    let fit = if random_effects {
        log::debug!("random effects: re-solving with tau^2 = {:.6}", fixed.tau_squared);
        solve(fixed.tau_squared)?
    } else {
        fixed
    };

    Ok(ComponentResult { treatments: members, effects: fit.effects, se: fit.se, contrasts, q, df, tau })
}

/// Multi-arm corrected SEs for every study range, with `τ²` added to each
/// contrast variance first.
fn corrected_standard_errors(
    variances: &[f64],
    ranges: &[Range<usize>],
    tau_squared: f64,
) -> Result<Vec<f64>> {
    let mut out = Vec::with_capacity(variances.len());
    for range in ranges {
        let study: Vec<f64> = variances[range.clone()].iter().map(|v| v + tau_squared).collect();
        out.extend(correct_standard_errors(&study)?);
    }
    Ok(out)
}
