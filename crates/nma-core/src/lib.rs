//! # nma-core
//!
//! Shared error type and small data types for the nma workspace.
//!
//! Everything numeric lives in `nma-prob` (distributions) and
//! `nma-inference` (the network meta-analysis engine); this crate only holds
//! what both of them and the CLI agree on.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Error types.
pub mod error;
/// Effect measures and other shared types.
pub mod types;

pub use error::{Error, Result};
pub use types::EffectMeasure;

/// Crate version, shared by every workspace member.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
