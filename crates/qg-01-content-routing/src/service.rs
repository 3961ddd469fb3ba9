//! Routing stack assembly
//!
//! Turns configuration plus an optional external DHT into the single
//! routing object handed to the gateway:
//!
//! ```text
//! Composer
//! ├── provide / provide_many  -> DHT (or null stub)
//! ├── find_providers          -> ProviderQueryManager -> ParallelRouter
//! └── everything else         -> ParallelRouter
//!                                ├── DHT entry (primary, strict errors)
//!                                └── delegated entries (timeout, errors ignored)
//! ```

use std::sync::Arc;
use std::time::Duration;

use shared_types::PeerId;
use tracing::info;

use crate::adapters::{HttpRouterClient, NullRouter};
use crate::algorithms::{
    group_endpoints, wire_delegated, BundledDht, Composer, ParallelRouteEntry, ParallelRouter,
    ProviderQueryManager,
};
use crate::domain::{DhtMode, EndpointDescriptor, GroupedEndpoint, ProviderQueryLimits, RoutingError};
use crate::ports::RoutingBackend;

/// Bound applied to each delegated router when none is configured.
pub const DEFAULT_DELEGATED_TIMEOUT: Duration = Duration::from_secs(10);

/// Routing configuration
#[derive(Clone, Debug)]
pub struct RoutingStackConfig {
    /// Which DHT client participates
    pub dht_mode: DhtMode,
    /// Delegated routing endpoints, before grouping
    pub endpoints: Vec<EndpointDescriptor>,
    /// Per-entry bound for delegated routers
    pub delegated_timeout: Duration,
    /// Provider query caps
    pub provider_limits: ProviderQueryLimits,
    /// Providers never returned to callers
    pub denied_providers: Vec<PeerId>,
}

impl Default for RoutingStackConfig {
    fn default() -> Self {
        Self {
            dht_mode: DhtMode::default(),
            endpoints: Vec::new(),
            delegated_timeout: DEFAULT_DELEGATED_TIMEOUT,
            provider_limits: ProviderQueryLimits::default(),
            denied_providers: Vec::new(),
        }
    }
}

/// The assembled gateway-facing router.
#[derive(Clone, Debug)]
pub struct RoutingStack {
    router: RoutingBackend,
    delegated: Vec<GroupedEndpoint>,
    dht_mode: DhtMode,
    entries: usize,
}

impl RoutingStack {
    /// Assemble with Routing V1 HTTP clients for the delegated endpoints.
    pub fn build(config: &RoutingStackConfig, dht: Option<BundledDht>) -> Result<Self, RoutingError> {
        Self::build_with(config, dht, |group, timeout| {
            let client = Arc::new(HttpRouterClient::new(group.base_url.clone(), timeout)?);
            Ok(wire_delegated(group.base_url.clone(), client, group.capabilities))
        })
    }

    /// Assemble with a custom connector for delegated endpoints.
    pub fn build_with<F>(
        config: &RoutingStackConfig,
        dht: Option<BundledDht>,
        mut connect: F,
    ) -> Result<Self, RoutingError>
    where
        F: FnMut(&GroupedEndpoint, Duration) -> Result<RoutingBackend, RoutingError>,
    {
        let dht = match (config.dht_mode, dht) {
            (DhtMode::Off, _) => None,
            (mode, None) => {
                return Err(RoutingError::Construction(format!(
                    "DHT mode {mode} requires a DHT client"
                )))
            }
            (DhtMode::Standard, Some(dht)) => Some(dht.without_accelerated()),
            (DhtMode::Accelerated, Some(dht)) => Some(dht),
        };
        let dht = dht.map(|dht| RoutingBackend::full("dht", Arc::new(dht)));

        let delegated = group_endpoints(&config.endpoints)?;
        let timeout = config.delegated_timeout;

        let mut entries = Vec::with_capacity(delegated.len() + 1);
        if let Some(dht) = &dht {
            entries.push(ParallelRouteEntry::new(dht.clone()));
        }
        for group in &delegated {
            let backend = connect(group, timeout)?;
            entries.push(
                ParallelRouteEntry::new(backend)
                    .with_timeout(timeout)
                    .ignore_errors(true)
                    .first_hit_only(true),
            );
        }
        let entry_count = entries.len();

        let null = RoutingBackend::full("null", Arc::new(NullRouter));
        let lookups = if entries.is_empty() {
            info!("[qg-01] No routing sources configured, using null router");
            null.clone()
        } else {
            let mut parallel = ParallelRouter::new(entries);
            if dht.is_some() {
                parallel = parallel.with_primary(0)?;
            }
            RoutingBackend::full("parallel", Arc::new(parallel))
        };

        let providers = ProviderQueryManager::new(lookups.clone(), config.provider_limits)
            .with_denied(config.denied_providers.iter().cloned());
        let composer = Composer::uniform(lookups)
            .with_provide(dht.unwrap_or(null))
            .with_find_providers(RoutingBackend::named("provider-query").with_discovery(Arc::new(providers)));

        info!(
            dht_mode = %config.dht_mode,
            delegated = delegated.len(),
            entries = entry_count,
            "[qg-01] Routing stack assembled"
        );

        Ok(Self {
            router: RoutingBackend::full("composer", Arc::new(composer)),
            delegated,
            dht_mode: config.dht_mode,
            entries: entry_count,
        })
    }

    /// The routing object exposed to the gateway.
    pub fn router(&self) -> &RoutingBackend {
        &self.router
    }

    pub fn delegated(&self) -> &[GroupedEndpoint] {
        &self.delegated
    }

    pub fn dht_mode(&self) -> DhtMode {
        self.dht_mode
    }

    /// No DHT and no delegated router: every lookup is empty.
    pub fn is_null(&self) -> bool {
        self.entries == 0
    }
}
