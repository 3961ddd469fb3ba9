//! # Operation-Split Router
//!
//! Sends each routing operation to one backend fixed at construction. No
//! merging and no retry: errors from the assigned backend propagate as-is.
//! `provide_many` and readiness are optional; when the assigned backend
//! lacks them the composer reports success.

use async_trait::async_trait;
use shared_types::{AddrInfo, ContentId, PeerId};
use tokio_util::sync::CancellationToken;

use crate::domain::{Capability, RoutingError};
use crate::ports::{
    Bootstrap, ContentAnnouncer, ContentDiscovery, PeerRouting, ProvideMany, ProviderStream,
    ReadinessCheck, RoutingBackend, ValuePublisher, ValueStore, ValueStream,
};

/// Per-operation backend assignment.
#[derive(Clone, Debug)]
pub struct Composer {
    pub get_value: RoutingBackend,
    pub put_value: RoutingBackend,
    pub search_value: RoutingBackend,
    pub find_peer: RoutingBackend,
    pub find_providers: RoutingBackend,
    pub provide: RoutingBackend,
    pub bootstrap: RoutingBackend,
}

impl Composer {
    /// Every operation on `backend`.
    pub fn uniform(backend: RoutingBackend) -> Self {
        Self {
            get_value: backend.clone(),
            put_value: backend.clone(),
            search_value: backend.clone(),
            find_peer: backend.clone(),
            find_providers: backend.clone(),
            provide: backend.clone(),
            bootstrap: backend,
        }
    }

    #[must_use]
    pub fn with_provide(mut self, backend: RoutingBackend) -> Self {
        self.provide = backend;
        self
    }

    #[must_use]
    pub fn with_find_providers(mut self, backend: RoutingBackend) -> Self {
        self.find_providers = backend;
        self
    }
}

#[async_trait]
impl ValueStore for Composer {
    async fn get_value(&self, ctx: &CancellationToken, key: &[u8]) -> Result<Vec<u8>, RoutingError> {
        self.get_value.get_value(ctx, key).await
    }

    async fn search_value(&self, ctx: &CancellationToken, key: &[u8]) -> Result<ValueStream, RoutingError> {
        self.search_value.search_value(ctx, key).await
    }
}

#[async_trait]
impl ValuePublisher for Composer {
    async fn put_value(&self, ctx: &CancellationToken, key: &[u8], value: Vec<u8>) -> Result<(), RoutingError> {
        self.put_value.put_value(ctx, key, value).await
    }
}

#[async_trait]
impl PeerRouting for Composer {
    async fn find_peer(&self, ctx: &CancellationToken, peer: &PeerId) -> Result<AddrInfo, RoutingError> {
        self.find_peer.find_peer(ctx, peer).await
    }
}

impl ContentDiscovery for Composer {
    fn find_providers(&self, ctx: &CancellationToken, key: &ContentId, limit: usize) -> ProviderStream {
        self.find_providers.find_providers(ctx, key, limit)
    }
}

#[async_trait]
impl ContentAnnouncer for Composer {
    async fn provide(&self, ctx: &CancellationToken, key: &ContentId, announce: bool) -> Result<(), RoutingError> {
        self.provide.provide(ctx, key, announce).await
    }
}

#[async_trait]
impl ProvideMany for Composer {
    async fn provide_many(&self, ctx: &CancellationToken, keys: &[ContentId]) -> Result<(), RoutingError> {
        if !self.provide.supports(Capability::ProvideMany) {
            return Ok(());
        }
        self.provide.provide_many(ctx, keys).await
    }
}

#[async_trait]
impl Bootstrap for Composer {
    async fn bootstrap(&self, ctx: &CancellationToken) -> Result<(), RoutingError> {
        self.bootstrap.bootstrap(ctx).await
    }
}

impl ReadinessCheck for Composer {
    fn ready(&self) -> bool {
        self.provide.ready().unwrap_or(true)
    }
}
