//! No-routing stub.

use async_trait::async_trait;
use shared_types::{AddrInfo, ContentId, PeerId};
use tokio_util::sync::CancellationToken;

use crate::domain::RoutingError;
use crate::ports::{
    Bootstrap, ContentAnnouncer, ContentDiscovery, PeerRouting, ProvideMany, ProviderStream,
    ReadinessCheck, ValuePublisher, ValueStore,
};

/// Router that knows nothing and accepts everything.
///
/// Used when the DHT is off and no delegated router is configured, so the
/// gateway still starts and serves only locally available content.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullRouter;

#[async_trait]
impl ValueStore for NullRouter {
    async fn get_value(&self, _ctx: &CancellationToken, _key: &[u8]) -> Result<Vec<u8>, RoutingError> {
        Err(RoutingError::NotFound)
    }
}

#[async_trait]
impl ValuePublisher for NullRouter {
    async fn put_value(&self, _ctx: &CancellationToken, _key: &[u8], _value: Vec<u8>) -> Result<(), RoutingError> {
        Ok(())
    }
}

#[async_trait]
impl PeerRouting for NullRouter {
    async fn find_peer(&self, _ctx: &CancellationToken, _peer: &PeerId) -> Result<AddrInfo, RoutingError> {
        Err(RoutingError::NotFound)
    }
}

impl ContentDiscovery for NullRouter {
    fn find_providers(&self, _ctx: &CancellationToken, _key: &ContentId, _limit: usize) -> ProviderStream {
        Box::pin(futures::stream::empty())
    }
}

#[async_trait]
impl ContentAnnouncer for NullRouter {
    async fn provide(&self, _ctx: &CancellationToken, _key: &ContentId, _announce: bool) -> Result<(), RoutingError> {
        Ok(())
    }
}

#[async_trait]
impl ProvideMany for NullRouter {
    async fn provide_many(&self, _ctx: &CancellationToken, _keys: &[ContentId]) -> Result<(), RoutingError> {
        Ok(())
    }
}

#[async_trait]
impl Bootstrap for NullRouter {
    async fn bootstrap(&self, _ctx: &CancellationToken) -> Result<(), RoutingError> {
        Ok(())
    }
}

impl ReadinessCheck for NullRouter {
    fn ready(&self) -> bool {
        true
    }
}
