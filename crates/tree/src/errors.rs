use periclust_mixture::MixtureError;
use thiserror::Error;

/// A result type for clustering
pub type Result<T> = std::result::Result<T, ClusterError>;

/// An error when partitioning or clustering a dataset
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClusterError {
    /// When an operation is called in a state where it is not permitted
    #[error("Invalid state: {0}")]
    InvalidState(String),
    /// When an internal invariant is broken, this is a logic defect and not recoverable
    #[error("Integrity error: {0}")]
    IntegrityError(String),
    /// When a dataset, period or setting value is invalid
    #[error("InvalidValue error: {0}")]
    InvalidValueError(String),
    /// When a mixture fit or critical point search fails
    #[error(transparent)]
    MixtureError(#[from] MixtureError),
}
