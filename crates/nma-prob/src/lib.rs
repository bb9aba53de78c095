//! Probability building blocks for nma.
//!
//! This crate hosts the distribution math shared by the network engine and
//! the simpler pooling routines:
//! - the standard normal (CDF, quantile, Wald p-values)
//! - Student-t tail probabilities for regression coefficient tests
//! - weighted quantiles

pub mod normal;
pub mod quantile;
pub mod student_t;

pub use quantile::weighted_quantile;
