//! Graph-theoretic weighted least squares for one connected network.
//!
//! Treatments are nodes, contrasts are edges with conductance `1/SE²`.
//! With `B` the contrast/treatment incidence matrix and `W = diag(1/SE²)`:
//!
//! ```text
//! L  = BᵀWB                      (weighted Laplacian)
//! L⁺ = (L − J/n)⁻¹ + J/n         (J = all-ones)
//! H  = B L⁺ Bᵀ W                 (hat matrix)
//! Var(θ_i − θ_j) = L⁺ii + L⁺jj − 2 L⁺ij
//! ```
//!
//! `H·y` gives network-consistent contrast effects; Cochran's Q measures the
//! distance between observed and consistent effects and feeds the
//! DerSimonian-Laird estimate of τ².

use nalgebra::{DMatrix, DVector};
use nma_core::{Error, Result};

/// Solution of one connected component.
#[derive(Debug, Clone)]
pub struct NetworkFit {
    /// `effects[(i, j)]` = effect of treatment `i` relative to `j`.
    pub effects: DMatrix<f64>,
    /// Standard error of `effects[(i, j)]`.
    pub se: DMatrix<f64>,
    /// Network-consistent value of every input contrast.
    pub consistent: Vec<f64>,
    /// Cochran's Q.
    pub q: f64,
    /// Degrees of freedom of Q.
    pub df: f64,
    /// DerSimonian-Laird between-study variance.
    pub tau_squared: f64,
}

impl NetworkFit {
    /// Between-study standard deviation τ.
    pub fn tau(&self) -> f64 {
        self.tau_squared.sqrt()
    }
}

/// Contrasts of one component, as parallel arrays.
#[derive(Debug, Clone, Copy)]
pub struct ContrastSet<'a> {
    /// Observed effects.
    pub effects: &'a [f64],
    /// Standard errors (already corrected for multi-arm studies).
    pub se: &'a [f64],
    /// `(treatment1, treatment2)` node indices.
    pub pairs: &'a [(usize, usize)],
    /// Study index of each contrast.
    pub studies: &'a [usize],
    /// Arm count of each study index.
    pub study_arms: &'a [usize],
}

/// Fit the network of `n_treatments` nodes described by `set`.
///
/// Fails only on inconsistent input shapes. Numerical degeneracy (a singular
/// Laplacian, zero or infinite weights) propagates as NaN.
pub fn solve_network(n_treatments: usize, set: ContrastSet<'_>) -> Result<NetworkFit> {
    let m = set.effects.len();
    if set.se.len() != m || set.pairs.len() != m || set.studies.len() != m {
        return Err(Error::Validation(format!(
            "contrast arrays differ in length: effects={}, se={}, pairs={}, studies={}",
            m,
            set.se.len(),
            set.pairs.len(),
            set.studies.len()
        )));
    }
    if n_treatments == 0 {
        return Err(Error::Validation("network has no treatments".into()));
    }
    for (c, &(a, b)) in set.pairs.iter().enumerate() {
        if a >= n_treatments || b >= n_treatments || a == b {
            return Err(Error::Validation(format!("contrast {c}: invalid treatment pair ({a}, {b})")));
        }
    }
    if let Some(&s) = set.studies.iter().find(|&&s| s >= set.study_arms.len()) {
        return Err(Error::Validation(format!("study index {s} has no arm count")));
    }

    let n = n_treatments;
    let mut b = DMatrix::<f64>::zeros(m, n);
    for (row, &(t1, t2)) in set.pairs.iter().enumerate() {
        b[(row, t1)] = 1.0;
        b[(row, t2)] = -1.0;
    }
    let w_diag = DVector::from_iterator(m, set.se.iter().map(|s| 1.0 / (s * s)));
    let w = DMatrix::from_diagonal(&w_diag);
    let bt = b.transpose();

    let laplacian = &bt * &w * &b;
    let j_n = DMatrix::from_element(n, n, 1.0 / n as f64);
    let l_plus = match (&laplacian - &j_n).try_inverse() {
        Some(inv) => inv + &j_n,
        None => {
            log::warn!("network Laplacian is singular; estimates for this component are NaN");
            DMatrix::from_element(n, n, f64::NAN)
        }
    };

    let se = DMatrix::from_fn(n, n, |i, j| {
        if i == j {
            0.0
        } else {
            (l_plus[(i, i)] + l_plus[(j, j)] - 2.0 * l_plus[(i, j)]).sqrt()
        }
    });

    let hat = &b * &l_plus * &bt * &w;
    let y = DVector::from_column_slice(set.effects);
    let y_hat = &hat * &y;

    let mut effects = DMatrix::from_element(n, n, f64::NAN);
    for i in 0..n {
        effects[(i, i)] = 0.0;
    }
    for (row, &(t1, t2)) in set.pairs.iter().enumerate() {
        effects[(t1, t2)] = y_hat[row];
        effects[(t2, t1)] = -y_hat[row];
    }
    close_indirect(&mut effects);

    let resid = &y - &y_hat;
    let q = resid.iter().zip(w_diag.iter()).map(|(r, w)| w * r * r).sum::<f64>();
    let df = degrees_of_freedom(set.studies, set.study_arms, n);
    let tau_squared = dersimonian_laird(q, df, &b, &hat, &w, set.studies);

    log::debug!(
        "network fit: {n} treatments, {m} contrasts, Q = {q:.4}, df = {df}, tau^2 = {tau_squared:.6}"
    );

    Ok(NetworkFit { effects, se, consistent: y_hat.iter().copied().collect(), q, df, tau_squared })
}

/// Fill unknown cells from known ones: `E[i,j] = E[i,k] − E[j,k]`.
///
/// Iterates to a fixed point; every productive pass fills at least one pair,
/// so there are at most `n²/2` passes of `n³` cell visits. Cells that cannot
/// be reached (disconnected or NaN-valued evidence) stay NaN.
pub(crate) fn close_indirect(effects: &mut DMatrix<f64>) {
    let n = effects.nrows();
    loop {
        let mut changed = false;
        for i in 0..n {
            for j in 0..n {
                if !effects[(i, j)].is_nan() {
                    continue;
                }
                let via = (0..n).find(|&k| !effects[(i, k)].is_nan() && !effects[(j, k)].is_nan());
                if let Some(k) = via {
                    let value = effects[(i, k)] - effects[(j, k)];
                    effects[(i, j)] = value;
                    effects[(j, i)] = -value;
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }
}

/// `Σ_s (k_s − 1) − (n − 1)`, accumulated per contrast as `2 / k_s`.
fn degrees_of_freedom(studies: &[usize], study_arms: &[usize], n_treatments: usize) -> f64 {
    let per_contrast: f64 = studies.iter().map(|&s| 2.0 / study_arms[s] as f64).sum();
    per_contrast.round() - (n_treatments as f64 - 1.0)
}

/// DerSimonian-Laird τ² for a network:
/// `max(0, (Q − df) / tr((I − H) · (BBᵀ ∘ S)/2 · W))`, `S` marking contrast
/// pairs from the same study.
fn dersimonian_laird(
    q: f64,
    df: f64,
    b: &DMatrix<f64>,
    hat: &DMatrix<f64>,
    w: &DMatrix<f64>,
    studies: &[usize],
) -> f64 {
    if df <= 0.0 || !q.is_finite() {
        return 0.0;
    }
    let m = studies.len();
    let same_study = DMatrix::from_fn(m, m, |a, c| if studies[a] == studies[c] { 1.0 } else { 0.0 });
    let e_mod = (b * b.transpose()).component_mul(&same_study) / 2.0;
    let i_minus_h = DMatrix::<f64>::identity(m, m) - hat;
    let denom = (i_minus_h * e_mod * w).trace();
    if !(denom > 0.0) {
        log::warn!("tau^2 denominator is not positive ({denom}); using tau^2 = 0");
        return 0.0;
    }
    ((q - df) / denom).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn fit(
        n: usize,
        effects: &[f64],
        se: &[f64],
        pairs: &[(usize, usize)],
        studies: &[usize],
        arms: &[usize],
    ) -> NetworkFit {
        solve_network(n, ContrastSet { effects, se, pairs, studies, study_arms: arms }).unwrap()
    }

    #[test]
    fn test_single_contrast() {
        let f = fit(2, &[0.7], &[0.5], &[(0, 1)], &[0], &[2]);
        assert_relative_eq!(f.effects[(0, 1)], 0.7, epsilon = 1e-12);
        assert_relative_eq!(f.effects[(1, 0)], -0.7, epsilon = 1e-12);
        assert_eq!(f.effects[(0, 0)], 0.0);
        assert_relative_eq!(f.se[(0, 1)], 0.5, epsilon = 1e-12);
        assert_relative_eq!(f.q, 0.0, epsilon = 1e-20);
        assert_eq!(f.df, 0.0);
        assert_eq!(f.tau_squared, 0.0);
    }

    #[test]
    fn test_two_studies_same_pair_is_inverse_variance_pooling() {
        // Two independent A-B studies: the network estimate is the fixed-effect
        // pooled estimate.
        let f = fit(2, &[1.0, 2.0], &[0.5, 1.0], &[(0, 1), (0, 1)], &[0, 1], &[2, 2]);
        assert_relative_eq!(f.effects[(0, 1)], 1.2, epsilon = 1e-10);
        assert_relative_eq!(f.se[(0, 1)], (1.0_f64 / 5.0).sqrt(), epsilon = 1e-10);
        // Q = 4·0.2² + 1·0.8² = 0.8
        assert_relative_eq!(f.q, 0.8, epsilon = 1e-10);
        assert_eq!(f.df, 1.0);
        // τ² = (Q − df)/(Σw − Σw²/Σw) < 0 → 0
        assert_eq!(f.tau_squared, 0.0);
    }

    #[test]
    fn test_tau_matches_pairwise_dersimonian_laird() {
        let effects = [-1.0, 0.0, 1.0, 2.0];
        let se = [0.1; 4];
        let pairs = [(0, 1); 4];
        let f = fit(2, &effects, &se, &pairs, &[0, 1, 2, 3], &[2, 2, 2, 2]);
        // Classic DL: w = 100, Q = Σ w (y − ȳ)² = 100·5 = 500, C = 400 − 40000/400 = 300.
        assert_relative_eq!(f.q, 500.0, epsilon = 1e-8);
        assert_relative_eq!(f.tau_squared, (500.0 - 3.0) / 300.0, epsilon = 1e-10);
    }

    #[test]
    fn test_tau_with_three_arm_study() {
        // Study 0: A, B, C with arm variance 1 (pair variance 2, corrected 3).
        // Study 1: A-B with variance 2. Observed A-B: 1 and 4.
        let effects = [1.0, 2.0, 1.0, 4.0];
        let se = [3.0_f64.sqrt(), 3.0_f64.sqrt(), 3.0_f64.sqrt(), 2.0_f64.sqrt()];
        let pairs = [(0, 1), (0, 2), (1, 2), (0, 1)];
        let f = fit(3, &effects, &se, &pairs, &[0, 0, 0, 1], &[3, 2]);

        // Q = (4 − 1)² / (2 + 2), df = 3·(2/3) + 1 − 2.
        assert_relative_eq!(f.q, 2.25, epsilon = 1e-10);
        assert_eq!(f.df, 1.0);
        // tr(EW) = 1.5, tr(HEW) = 1.0: τ² = (2.25 − 1) / 0.5.
        assert_relative_eq!(f.tau_squared, 2.5, epsilon = 1e-10);

        assert_relative_eq!(f.effects[(0, 1)], 2.5, epsilon = 1e-10);
        assert_relative_eq!(f.effects[(0, 2)], 2.75, epsilon = 1e-10);
        assert_relative_eq!(f.effects[(1, 2)], 0.25, epsilon = 1e-10);
        assert_relative_eq!(f.se[(0, 1)], 1.0, epsilon = 1e-10);
        assert_relative_eq!(f.se[(0, 2)], 1.75_f64.sqrt(), epsilon = 1e-10);
    }

    #[test]
    fn test_indirect_evidence_chain() {
        // A-B and B-C only: A-C is filled indirectly, variances add.
        let f = fit(3, &[0.4, 0.3], &[0.2, 0.5], &[(0, 1), (1, 2)], &[0, 1], &[2, 2]);
        assert_relative_eq!(f.effects[(0, 2)], 0.7, epsilon = 1e-10);
        assert_relative_eq!(f.effects[(2, 0)], -0.7, epsilon = 1e-10);
        assert_relative_eq!(f.se[(0, 2)], (0.04_f64 + 0.25).sqrt(), epsilon = 1e-10);
        assert_eq!(f.df, 0.0);
    }

    #[test]
    fn test_consistent_loop() {
        // A-B, B-C, A-C with a consistency violation: estimates are coherent.
        let f = fit(
            3,
            &[1.0, 1.0, 1.0],
            &[0.3, 0.3, 0.3],
            &[(0, 1), (1, 2), (0, 2)],
            &[0, 1, 2],
            &[2, 2, 2],
        );
        let ab = f.effects[(0, 1)];
        let bc = f.effects[(1, 2)];
        let ac = f.effects[(0, 2)];
        assert_relative_eq!(ab + bc, ac, epsilon = 1e-10);
        // Equal weights: AB = BC = 2/3, AC = 4/3.
        assert_relative_eq!(ab, 2.0 / 3.0, epsilon = 1e-10);
        assert_relative_eq!(ac, 4.0 / 3.0, epsilon = 1e-10);
        assert!(f.q > 0.0);
        assert_eq!(f.df, 1.0);
    }

    #[test]
    fn test_length_mismatch() {
        let r = solve_network(
            2,
            ContrastSet {
                effects: &[0.1, 0.2],
                se: &[0.1],
                pairs: &[(0, 1), (0, 1)],
                studies: &[0, 1],
                study_arms: &[2, 2],
            },
        );
        assert!(matches!(r, Err(Error::Validation(_))));
    }

    #[test]
    fn test_invalid_pair() {
        let r = solve_network(
            2,
            ContrastSet { effects: &[0.1], se: &[0.1], pairs: &[(0, 2)], studies: &[0], study_arms: &[2] },
        );
        assert!(r.is_err());
    }

    #[test]
    fn test_zero_se_propagates_nan() {
        let f = fit(2, &[0.5], &[0.0], &[(0, 1)], &[0], &[2]);
        assert!(f.effects[(0, 1)].is_nan() || f.se[(0, 1)].is_nan() || f.se[(0, 1)] == 0.0);
    }

    #[test]
    fn test_close_indirect_leaves_unreachable_nan() {
        let nan = f64::NAN;
        let mut e = DMatrix::from_row_slice(
            4,
            4,
            &[0.0, 1.0, nan, nan, -1.0, 0.0, nan, nan, nan, nan, 0.0, 2.0, nan, nan, -2.0, 0.0],
        );
        close_indirect(&mut e);
        assert!(e[(0, 2)].is_nan());
        assert_eq!(e[(0, 1)], 1.0);
        assert_eq!(e[(3, 2)], -2.0);
    }
}
