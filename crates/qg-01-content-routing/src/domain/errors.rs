//! # Domain Errors
//!
//! Error taxonomy for routing operations.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// A single routing operation a backend may or may not implement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    ValueGet,
    ValuePut,
    ValueSearch,
    PeerFind,
    ProviderFind,
    Provide,
    ProvideMany,
    Bootstrap,
    Readiness,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ValueGet => "get-value",
            Self::ValuePut => "put-value",
            Self::ValueSearch => "search-value",
            Self::PeerFind => "find-peer",
            Self::ProviderFind => "find-providers",
            Self::Provide => "provide",
            Self::ProvideMany => "provide-many",
            Self::Bootstrap => "bootstrap",
            Self::Readiness => "readiness",
        };
        f.write_str(name)
    }
}

/// Routing error types.
#[derive(Debug, Clone, Error)]
pub enum RoutingError {
    /// The source had no answer.
    #[error("Routing: not found")]
    NotFound,

    /// The source did not answer within its bound.
    #[error("Routing: timed out after {0:?}")]
    Timeout(Duration),

    /// The backend does not implement the requested operation.
    #[error("Routing: operation not supported: {0}")]
    Unsupported(Capability),

    /// Network or protocol failure talking to a router or peer.
    #[error("Routing transport error: {0}")]
    Transport(String),

    /// Misconfiguration detected while assembling the routing stack.
    #[error("Routing construction error: {0}")]
    Construction(String),

    /// The request context was cancelled.
    #[error("Routing: request cancelled")]
    Cancelled,

    /// Several sources failed; bootstrap aggregates rather than failing fast.
    #[error("Routing: {} errors: [{}]", .0.len(), join_errors(.0))]
    Multiple(Vec<RoutingError>),
}

impl RoutingError {
    /// Outcomes that count as "no answer" when aggregating parallel results.
    pub fn is_not_found_like(&self) -> bool {
        matches!(self, Self::NotFound | Self::Timeout(_) | Self::Cancelled)
    }
}

fn join_errors(errors: &[RoutingError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
