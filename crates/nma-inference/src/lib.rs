//! # nma-inference
//!
//! Network meta-analysis for nma.
//!
//! This crate provides:
//! - the network engine ([`network`]): contrasts from arm-level data,
//!   multi-arm standard-error correction, the graph-theoretic weighted
//!   least-squares solver, DerSimonian-Laird heterogeneity and the queryable
//!   [`NetworkMetaAnalysis`] result
//! - ordinary least squares with coefficient tests ([`regression`]), used by
//!   the Egger funnel-asymmetry test
//!
//! ## Architecture
//!
//! Everything here is a pure function of its inputs: no I/O, no shared state.
//! Distribution primitives come from `nma-prob`, dense linear algebra from
//! `nalgebra`.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Dense linear-algebra helpers (tolerance-controlled pseudoinverse).
pub mod linalg;
/// Network meta-analysis engine.
pub mod network;
/// Ordinary least squares with per-coefficient t-tests.
pub mod regression;

pub use network::{
    Contrast, NetworkMetaAnalysis, connected_components, mean_difference_nma, odds_ratio_nma,
};
pub use regression::{OlsSummary, ols_with_tests};
