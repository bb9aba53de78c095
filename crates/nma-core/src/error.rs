//! Error types for nma

use thiserror::Error;

/// nma error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed input: mismatched lengths, invalid counts, duplicate arms.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),

    /// A query named a treatment that is not part of the analysed network.
    #[error("Unknown treatment: {0}")]
    UnknownTreatment(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
