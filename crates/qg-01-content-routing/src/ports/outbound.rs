//! # Outbound Ports
//!
//! One trait per routing facet. A concrete backend implements whichever
//! subset it supports; `RoutingBackend` records which facets are present so
//! callers can probe before invoking.
//!
//! Every operation takes the request's `CancellationToken`. Implementations
//! must stop work once it is cancelled; returned streams must end.

use async_trait::async_trait;
use futures::stream::BoxStream;
use shared_types::{AddrInfo, ContentId, PeerId};
use tokio_util::sync::CancellationToken;

use crate::domain::RoutingError;

/// Lazily produced provider records.
pub type ProviderStream = BoxStream<'static, AddrInfo>;

/// Successively better values for one key.
pub type ValueStream = BoxStream<'static, Vec<u8>>;

/// Value and name record lookups.
#[async_trait]
pub trait ValueStore: Send + Sync {
    /// Fetch the best known value for `key`.
    async fn get_value(&self, ctx: &CancellationToken, key: &[u8]) -> Result<Vec<u8>, RoutingError>;

    /// Stream values for `key` as they are discovered.
    ///
    /// The default resolves a single value through `get_value`.
    async fn search_value(
        &self,
        ctx: &CancellationToken,
        key: &[u8],
    ) -> Result<ValueStream, RoutingError> {
        let value = self.get_value(ctx, key).await?;
        Ok(Box::pin(futures::stream::once(async move { value })))
    }
}

/// Value publication.
#[async_trait]
pub trait ValuePublisher: Send + Sync {
    /// Store `value` under `key`.
    async fn put_value(
        &self,
        ctx: &CancellationToken,
        key: &[u8],
        value: Vec<u8>,
    ) -> Result<(), RoutingError>;
}

/// Peer address lookups.
#[async_trait]
pub trait PeerRouting: Send + Sync {
    /// Resolve the addresses of `peer`.
    async fn find_peer(&self, ctx: &CancellationToken, peer: &PeerId) -> Result<AddrInfo, RoutingError>;
}

/// Provider discovery.
pub trait ContentDiscovery: Send + Sync {
    /// Stream providers of `key`. `limit` of 0 means unbounded.
    ///
    /// Discovery failures end the stream; they are logged, not returned.
    fn find_providers(&self, ctx: &CancellationToken, key: &ContentId, limit: usize) -> ProviderStream;
}

/// Provider record announcement.
#[async_trait]
pub trait ContentAnnouncer: Send + Sync {
    /// Announce that this node provides `key`.
    async fn provide(&self, ctx: &CancellationToken, key: &ContentId, announce: bool) -> Result<(), RoutingError>;
}

/// Batched provider record announcement.
#[async_trait]
pub trait ProvideMany: Send + Sync {
    /// Announce many keys in one operation.
    async fn provide_many(&self, ctx: &CancellationToken, keys: &[ContentId]) -> Result<(), RoutingError>;
}

/// Routing table bootstrap.
#[async_trait]
pub trait Bootstrap: Send + Sync {
    /// Populate or refresh the routing table.
    async fn bootstrap(&self, ctx: &CancellationToken) -> Result<(), RoutingError>;
}

/// Operational readiness probe.
pub trait ReadinessCheck: Send + Sync {
    /// Whether the backend currently gives trustworthy answers.
    fn ready(&self) -> bool;
}
