//! # Dual-Mode DHT Client
//!
//! Holds a standard and an accelerated DHT client and picks one per call:
//! the accelerated client when its readiness probe passes right now, the
//! standard client otherwise. Nothing is cached between calls, so a stale
//! accelerated routing table falls back transparently.
//!
//! Bootstrap always goes to the standard client.

use async_trait::async_trait;
use shared_types::{AddrInfo, ContentId, PeerId};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::domain::{Capability, RoutingError};
use crate::ports::{
    Bootstrap, ContentAnnouncer, ContentDiscovery, PeerRouting, ProvideMany, ProviderStream,
    ReadinessCheck, RoutingBackend, ValuePublisher, ValueStore, ValueStream,
};

#[derive(Clone, Debug)]
pub struct BundledDht {
    standard: RoutingBackend,
    accelerated: Option<RoutingBackend>,
}

impl BundledDht {
    pub fn new(standard: RoutingBackend, accelerated: RoutingBackend) -> Self {
        Self {
            standard,
            accelerated: Some(accelerated),
        }
    }

    /// Standard client only.
    pub fn standard_only(standard: RoutingBackend) -> Self {
        Self {
            standard,
            accelerated: None,
        }
    }

    /// Drop the accelerated client, keeping the standard one.
    #[must_use]
    pub fn without_accelerated(mut self) -> Self {
        self.accelerated = None;
        self
    }

    /// Client serving calls at this instant.
    ///
    /// An accelerated client without a readiness probe is never trusted.
    pub fn active(&self) -> &RoutingBackend {
        match &self.accelerated {
            Some(accelerated) if accelerated.ready() == Some(true) => {
                trace!(client = %accelerated.name(), "[qg-01] Using accelerated DHT client");
                accelerated
            }
            _ => &self.standard,
        }
    }

    pub fn standard(&self) -> &RoutingBackend {
        &self.standard
    }
}

#[async_trait]
impl ValueStore for BundledDht {
    async fn get_value(&self, ctx: &CancellationToken, key: &[u8]) -> Result<Vec<u8>, RoutingError> {
        self.active().get_value(ctx, key).await
    }

    async fn search_value(&self, ctx: &CancellationToken, key: &[u8]) -> Result<ValueStream, RoutingError> {
        self.active().search_value(ctx, key).await
    }
}

#[async_trait]
impl ValuePublisher for BundledDht {
    async fn put_value(&self, ctx: &CancellationToken, key: &[u8], value: Vec<u8>) -> Result<(), RoutingError> {
        self.active().put_value(ctx, key, value).await
    }
}

#[async_trait]
impl PeerRouting for BundledDht {
    async fn find_peer(&self, ctx: &CancellationToken, peer: &PeerId) -> Result<AddrInfo, RoutingError> {
        self.active().find_peer(ctx, peer).await
    }
}

impl ContentDiscovery for BundledDht {
    fn find_providers(&self, ctx: &CancellationToken, key: &ContentId, limit: usize) -> ProviderStream {
        self.active().find_providers(ctx, key, limit)
    }
}

#[async_trait]
impl ContentAnnouncer for BundledDht {
    async fn provide(&self, ctx: &CancellationToken, key: &ContentId, announce: bool) -> Result<(), RoutingError> {
        self.active().provide(ctx, key, announce).await
    }
}

#[async_trait]
impl ProvideMany for BundledDht {
    async fn provide_many(&self, ctx: &CancellationToken, keys: &[ContentId]) -> Result<(), RoutingError> {
        let client = self.active();
        if client.supports(Capability::ProvideMany) {
            return client.provide_many(ctx, keys).await;
        }
        for key in keys {
            client.provide(ctx, key, true).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Bootstrap for BundledDht {
    async fn bootstrap(&self, ctx: &CancellationToken) -> Result<(), RoutingError> {
        self.standard.bootstrap(ctx).await
    }
}

impl ReadinessCheck for BundledDht {
    /// The standard client is always usable, so the bundle is ready when it is.
    fn ready(&self) -> bool {
        self.standard.ready().unwrap_or(true)
    }
}
