use thiserror::Error;
use crate::store::StoreError;

/// Error type for repository operations
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Key-value store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Encoding error while writing a value
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),
}
