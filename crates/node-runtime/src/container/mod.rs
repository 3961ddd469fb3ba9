//! # Gateway Container
//!
//! Holds the assembled subsystems of one gateway node: its identity, the
//! routing stack (QG-01) and the bounded block exchange (QG-02) with its
//! block store and network endpoint.
//!
//! ## Assembly order
//!
//! 1. Validate configuration
//! 2. Derive (or generate) the node identity
//! 3. Build the routing stack; no DHT client is linked, so DHT mode is off
//! 4. Join the exchange network and build the exchange
//! 5. Mount the shared-cache responder when serving peered peers

pub mod config;

pub use config::{
    ConfigError, ExchangeSection, GatewayConfig, HttpRouterEntry, IdentitySection, PeerEntry, PeeringSection,
    ProviderQuerySection, RoutingSection, DEFAULT_HTTP_ROUTER, MAX_TIMEOUT_SECS,
};

use std::sync::Arc;

use qg_01_content_routing::{DhtMode, RoutingBackend, RoutingStack};
use qg_02_block_exchange::{BoundedExchange, ExchangeService, LoopbackNetwork, MemoryBlockStore};
use shared_types::AddrInfo;
use tracing::{info, warn};

use crate::identity::Identity;

/// One assembled gateway node.
pub struct GatewayContainer {
    identity: Identity,
    routing: RoutingStack,
    exchange: ExchangeService,
    store: Arc<MemoryBlockStore>,
    network: Arc<LoopbackNetwork>,
    peers: Vec<AddrInfo>,
}

impl GatewayContainer {
    /// Assemble a node on its own exchange network.
    pub fn new(config: &GatewayConfig) -> Result<Self, ConfigError> {
        Self::on_network(config, LoopbackNetwork::new())
    }

    /// Assemble a node on a shared exchange network.
    pub fn on_network(config: &GatewayConfig, network: Arc<LoopbackNetwork>) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut routing_config = config.routing_config()?;
        if routing_config.dht_mode != DhtMode::Off {
            warn!(
                configured = %routing_config.dht_mode,
                "No DHT client linked into this build, running with delegated routers only"
            );
            routing_config.dht_mode = DhtMode::Off;
        }
        let routing = RoutingStack::build(&routing_config, None)?;

        Self::with_routing(config, routing, network)
    }

    /// Assemble a node around an already built routing stack.
    pub fn with_routing(
        config: &GatewayConfig,
        routing: RoutingStack,
        network: Arc<LoopbackNetwork>,
    ) -> Result<Self, ConfigError> {
        let identity = match config.identity()? {
            Some(identity) => identity,
            None => Identity::ephemeral()?,
        };
        let peers = config.peers()?;

        let store = Arc::new(MemoryBlockStore::new());
        let endpoint = Arc::new(network.join(identity.peer_id().clone()));
        let exchange = ExchangeService::build(
            config.exchange_config()?,
            config.peering()?,
            store.clone(),
            endpoint.clone(),
            endpoint,
        );
        if let Some(server) = exchange.server() {
            network.mount(identity.peer_id(), server);
        }

        info!(
            peer_id = %identity.peer_id(),
            seeded = identity.index().is_some(),
            delegated = routing.delegated().len(),
            peers = peers.len(),
            "Gateway node assembled"
        );

        Ok(Self {
            identity,
            routing,
            exchange,
            store,
            network,
            peers,
        })
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The gateway-facing router.
    pub fn router(&self) -> &RoutingBackend {
        self.routing.router()
    }

    pub fn routing(&self) -> &RoutingStack {
        &self.routing
    }

    pub fn exchange(&self) -> &BoundedExchange {
        self.exchange.exchange()
    }

    pub fn serves_peers(&self) -> bool {
        self.exchange.server().is_some()
    }

    pub fn store(&self) -> &Arc<MemoryBlockStore> {
        &self.store
    }

    pub fn network(&self) -> &Arc<LoopbackNetwork> {
        &self.network
    }

    /// Configured peering records.
    pub fn peers(&self) -> &[AddrInfo] {
        &self.peers
    }

    /// Leave the exchange network.
    pub fn shutdown(&self) {
        self.network.leave(self.identity.peer_id());
        info!(peer_id = %self.identity.peer_id(), "Gateway node stopped");
    }
}
