use thiserror::Error;

/// A result type for mixture fitting and analysis
pub type Result<T> = std::result::Result<T, MixtureError>;

/// An error when fitting or analysing a gaussian mixture
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MixtureError {
    /// When mixture components, sample or fit settings are malformed
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// When a critical point search does not converge within its iteration cap
    #[error("Iteration limit exceeded: {0}")]
    IterationLimitExceeded(String),
    /// When an internal invariant is broken, this is a logic defect and not recoverable
    #[error("Integrity error: {0}")]
    IntegrityError(String),
}
