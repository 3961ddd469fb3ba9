//! # Domain Errors

use std::time::Duration;

use shared_types::{ContentId, StorageError};
use thiserror::Error;

/// Block exchange error types.
#[derive(Debug, Clone, Error)]
pub enum ExchangeError {
    /// No source produced the block.
    #[error("Exchange: block {0} not found")]
    NotFound(ContentId),

    /// The per-block deadline expired.
    #[error("Exchange: block fetch timed out after {0:?}")]
    Timeout(Duration),

    /// The request context was cancelled.
    #[error("Exchange: request cancelled")]
    Cancelled,

    /// The local block store failed.
    #[error("Exchange store error: {0}")]
    Store(String),

    /// Talking to a peer failed.
    #[error("Exchange network error: {0}")]
    Network(String),
}

impl From<StorageError> for ExchangeError {
    fn from(error: StorageError) -> Self {
        Self::Store(error.to_string())
    }
}
