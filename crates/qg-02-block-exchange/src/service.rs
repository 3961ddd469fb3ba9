//! Block exchange assembly

use std::sync::Arc;

use tracing::{info, warn};

use crate::algorithms::{BoundedExchange, SharedCacheServer};
use crate::domain::{ExchangeConfig, PeeringSet};
use crate::ports::{BlockNetwork, BlockStore, PeerSender};

/// Exchange client plus, in shared-cache mode, its server responder.
#[derive(Clone)]
pub struct ExchangeService {
    exchange: BoundedExchange,
    server: Option<Arc<SharedCacheServer>>,
}

impl ExchangeService {
    pub fn build(
        config: ExchangeConfig,
        peering: PeeringSet,
        store: Arc<dyn BlockStore>,
        network: Arc<dyn BlockNetwork>,
        sender: Arc<dyn PeerSender>,
    ) -> Self {
        if config.shared_cache && peering.is_empty() {
            warn!("[qg-02] Shared cache enabled without peers, not serving");
        }

        let server = config.serves(&peering).then(|| {
            Arc::new(SharedCacheServer::new(
                peering.clone(),
                store.clone(),
                sender,
                config.clone(),
            ))
        });

        let mut exchange = BoundedExchange::new(store, network, config.clone());
        if let Some(server) = &server {
            exchange = exchange.with_server(server.clone());
        }

        info!(
            per_block_timeout = ?config.per_block_timeout,
            serving = server.is_some(),
            peers = peering.len(),
            "[qg-02] Block exchange ready"
        );

        Self { exchange, server }
    }

    pub fn exchange(&self) -> &BoundedExchange {
        &self.exchange
    }

    /// The responder to mount on the network, when serving.
    pub fn server(&self) -> Option<Arc<SharedCacheServer>> {
        self.server.clone()
    }
}
