//! Shared error types for the services crate.

use thiserror::Error;

use quizgen_core::model::{PoolError, QuotaError};
use storage::repository::StorageError;

/// Errors emitted by `TestGenerator`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GenerateError {
    /// The request is inconsistent; nothing was selected or recorded.
    #[error(transparent)]
    Validation(#[from] QuotaError),
    #[error("question bank is empty")]
    DataUnavailable,
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Errors emitted while (re)loading the question pool.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PoolLoadError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Pool(#[from] PoolError),
}
