//! # Inbound Port
//!
//! `RoutingBackend` is the routing-shaped object handed to the gateway and
//! composed by the routers in `algorithms`. It carries a fixed set of
//! optional facet slots; an empty slot means the capability is absent and
//! the corresponding call returns `RoutingError::Unsupported` without I/O.

use std::fmt;
use std::sync::Arc;

use shared_types::{AddrInfo, ContentId, PeerId};
use tokio_util::sync::CancellationToken;

use super::outbound::{
    Bootstrap, ContentAnnouncer, ContentDiscovery, PeerRouting, ProvideMany, ProviderStream,
    ReadinessCheck, ValuePublisher, ValueStore, ValueStream,
};
use crate::domain::{Capability, RoutingError};

/// A named bundle of routing facets.
#[derive(Clone)]
pub struct RoutingBackend {
    name: Arc<str>,
    values: Option<Arc<dyn ValueStore>>,
    publisher: Option<Arc<dyn ValuePublisher>>,
    peers: Option<Arc<dyn PeerRouting>>,
    discovery: Option<Arc<dyn ContentDiscovery>>,
    announcer: Option<Arc<dyn ContentAnnouncer>>,
    provide_many: Option<Arc<dyn ProvideMany>>,
    bootstrap: Option<Arc<dyn Bootstrap>>,
    readiness: Option<Arc<dyn ReadinessCheck>>,
}

/// Implemented by routers that expose every facet.
pub trait FullRouting:
    ValueStore
    + ValuePublisher
    + PeerRouting
    + ContentDiscovery
    + ContentAnnouncer
    + ProvideMany
    + Bootstrap
    + ReadinessCheck
{
}

impl<T> FullRouting for T where
    T: ValueStore
        + ValuePublisher
        + PeerRouting
        + ContentDiscovery
        + ContentAnnouncer
        + ProvideMany
        + Bootstrap
        + ReadinessCheck
{
}

impl RoutingBackend {
    /// Backend with no capabilities.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name.into()),
            values: None,
            publisher: None,
            peers: None,
            discovery: None,
            announcer: None,
            provide_many: None,
            bootstrap: None,
            readiness: None,
        }
    }

    /// Backend exposing every facet of `router`.
    pub fn full<T: FullRouting + 'static>(name: impl Into<String>, router: Arc<T>) -> Self {
        Self::named(name)
            .with_values(router.clone())
            .with_publisher(router.clone())
            .with_peers(router.clone())
            .with_discovery(router.clone())
            .with_announcer(router.clone())
            .with_provide_many(router.clone())
            .with_bootstrap(router.clone())
            .with_readiness(router)
    }

    #[must_use]
    pub fn with_values(mut self, facet: Arc<dyn ValueStore>) -> Self {
        self.values = Some(facet);
        self
    }

    #[must_use]
    pub fn with_publisher(mut self, facet: Arc<dyn ValuePublisher>) -> Self {
        self.publisher = Some(facet);
        self
    }

    #[must_use]
    pub fn with_peers(mut self, facet: Arc<dyn PeerRouting>) -> Self {
        self.peers = Some(facet);
        self
    }

    #[must_use]
    pub fn with_discovery(mut self, facet: Arc<dyn ContentDiscovery>) -> Self {
        self.discovery = Some(facet);
        self
    }

    #[must_use]
    pub fn with_announcer(mut self, facet: Arc<dyn ContentAnnouncer>) -> Self {
        self.announcer = Some(facet);
        self
    }

    #[must_use]
    pub fn with_provide_many(mut self, facet: Arc<dyn ProvideMany>) -> Self {
        self.provide_many = Some(facet);
        self
    }

    #[must_use]
    pub fn with_bootstrap(mut self, facet: Arc<dyn Bootstrap>) -> Self {
        self.bootstrap = Some(facet);
        self
    }

    #[must_use]
    pub fn with_readiness(mut self, facet: Arc<dyn ReadinessCheck>) -> Self {
        self.readiness = Some(facet);
        self
    }

    /// Name used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Probe for a capability.
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::ValueGet | Capability::ValueSearch => self.values.is_some(),
            Capability::ValuePut => self.publisher.is_some(),
            Capability::PeerFind => self.peers.is_some(),
            Capability::ProviderFind => self.discovery.is_some(),
            Capability::Provide => self.announcer.is_some(),
            Capability::ProvideMany => self.provide_many.is_some(),
            Capability::Bootstrap => self.bootstrap.is_some(),
            Capability::Readiness => self.readiness.is_some(),
        }
    }

    pub async fn get_value(&self, ctx: &CancellationToken, key: &[u8]) -> Result<Vec<u8>, RoutingError> {
        match &self.values {
            Some(facet) => facet.get_value(ctx, key).await,
            None => Err(RoutingError::Unsupported(Capability::ValueGet)),
        }
    }

    pub async fn search_value(
        &self,
        ctx: &CancellationToken,
        key: &[u8],
    ) -> Result<ValueStream, RoutingError> {
        match &self.values {
            Some(facet) => facet.search_value(ctx, key).await,
            None => Err(RoutingError::Unsupported(Capability::ValueSearch)),
        }
    }

    pub async fn put_value(
        &self,
        ctx: &CancellationToken,
        key: &[u8],
        value: Vec<u8>,
    ) -> Result<(), RoutingError> {
        match &self.publisher {
            Some(facet) => facet.put_value(ctx, key, value).await,
            None => Err(RoutingError::Unsupported(Capability::ValuePut)),
        }
    }

    pub async fn find_peer(&self, ctx: &CancellationToken, peer: &PeerId) -> Result<AddrInfo, RoutingError> {
        match &self.peers {
            Some(facet) => facet.find_peer(ctx, peer).await,
            None => Err(RoutingError::Unsupported(Capability::PeerFind)),
        }
    }

    /// Provider stream; empty when discovery is unsupported.
    ///
    /// Streams cannot carry an error, so callers that need to distinguish
    /// "unsupported" from "no providers" probe with `supports` first.
    pub fn find_providers(&self, ctx: &CancellationToken, key: &ContentId, limit: usize) -> ProviderStream {
        match &self.discovery {
            Some(facet) => facet.find_providers(ctx, key, limit),
            None => Box::pin(futures::stream::empty()),
        }
    }

    pub async fn provide(
        &self,
        ctx: &CancellationToken,
        key: &ContentId,
        announce: bool,
    ) -> Result<(), RoutingError> {
        match &self.announcer {
            Some(facet) => facet.provide(ctx, key, announce).await,
            None => Err(RoutingError::Unsupported(Capability::Provide)),
        }
    }

    pub async fn provide_many(&self, ctx: &CancellationToken, keys: &[ContentId]) -> Result<(), RoutingError> {
        match &self.provide_many {
            Some(facet) => facet.provide_many(ctx, keys).await,
            None => Err(RoutingError::Unsupported(Capability::ProvideMany)),
        }
    }

    pub async fn bootstrap(&self, ctx: &CancellationToken) -> Result<(), RoutingError> {
        match &self.bootstrap {
            Some(facet) => facet.bootstrap(ctx).await,
            None => Err(RoutingError::Unsupported(Capability::Bootstrap)),
        }
    }

    /// Readiness, or `None` when the backend has no readiness probe.
    pub fn ready(&self) -> Option<bool> {
        self.readiness.as_ref().map(|facet| facet.ready())
    }
}

impl fmt::Debug for RoutingBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingBackend")
            .field("name", &self.name)
            .field("values", &self.values.is_some())
            .field("publisher", &self.publisher.is_some())
            .field("peers", &self.peers.is_some())
            .field("discovery", &self.discovery.is_some())
            .field("announcer", &self.announcer.is_some())
            .field("provide_many", &self.provide_many.is_some())
            .field("bootstrap", &self.bootstrap.is_some())
            .field("readiness", &self.readiness.is_some())
            .finish()
    }
}
