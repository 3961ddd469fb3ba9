//! # Error Types
//!
//! Defines error types used across subsystems.

use thiserror::Error;

/// Errors raised while parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// The string is not a valid content identifier.
    #[error("Invalid content identifier {input:?}: {reason}")]
    InvalidContentId { input: String, reason: String },

    /// Peer identities must not be empty.
    #[error("Empty peer identity")]
    EmptyPeerId,

    /// Digest could not be wrapped into a multihash.
    #[error("Invalid digest: {0}")]
    InvalidDigest(String),
}

/// Errors reported by a block store implementation.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Block not present in the store.
    #[error("Block not found: {0}")]
    NotFound(String),

    /// Underlying storage engine failed.
    #[error("Storage backend error: {0}")]
    Backend(String),
}
