//! Error types for archsym.

use thiserror::Error;

/// Result type alias for archsym operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when building permutations, groups or architectures.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum Error {
    /// Permutations, generators or mappings of inconsistent size,
    /// or an image list that is not a bijection on 0..expected.
    #[error("Degree mismatch: expected {expected}, got {actual}")]
    DegreeMismatch { expected: usize, actual: usize },

    /// Index outside of 0..degree.
    #[error("Index {index} out of domain 0..{degree}")]
    OutOfDomain { index: usize, degree: usize },

    /// Inconsistent architecture graph or composite pairing.
    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    /// Malformed canonical form.
    #[error("Deserialization failed: {0}")]
    Deserialization(String),
}

impl Error {
    pub(crate) fn check_index(index: usize, degree: usize) -> Result<usize> {
        if index < degree { Ok(index) } else { Err(Error::OutOfDomain { index, degree }) }
    }

    pub(crate) fn check_degree(expected: usize, actual: usize) -> Result<()> {
        if expected == actual { Ok(()) } else { Err(Error::DegreeMismatch { expected, actual }) }
    }
}
