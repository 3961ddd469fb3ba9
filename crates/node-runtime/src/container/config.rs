//! # Gateway Configuration
//!
//! TOML configuration for the gateway. Every section is optional and falls
//! back to its defaults; `validate` checks the whole file before anything
//! is started.
//!
//! ```toml
//! [routing]
//! dht_mode = "off"
//! delegated_timeout_secs = 10
//! ignore_providers = []
//!
//! [[routing.http_routers]]
//! url = "https://cid.contact"
//! capabilities = ["providers"]
//!
//! [exchange]
//! per_block_timeout_ms = 60000
//! shared_cache = true
//!
//! [peering]
//! peers = [{ id = "12D3KooW...", addrs = ["/dns4/peer.example/tcp/4001"] }]
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use qg_01_content_routing::{
    DhtMode, EndpointCapabilities, EndpointDescriptor, ProviderQueryLimits, RoutingError, RoutingStackConfig,
};
use qg_02_block_exchange::{ExchangeConfig, PeeringSet, DEFAULT_MAX_LEDGER_WANTS};
use serde::Deserialize;
use shared_types::{AddrInfo, PeerId};
use thiserror::Error;

use crate::identity::{Identity, IdentityError, Seed};

/// Default delegated router.
pub const DEFAULT_HTTP_ROUTER: &str = "https://cid.contact";

/// Upper bound for every configured timeout.
pub const MAX_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The values parsed but cannot be used.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<RoutingError> for ConfigError {
    fn from(e: RoutingError) -> Self {
        Self::Invalid(e.to_string())
    }
}

impl From<IdentityError> for ConfigError {
    fn from(e: IdentityError) -> Self {
        Self::Invalid(e.to_string())
    }
}

/// Complete gateway configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    pub routing: RoutingSection,
    pub provider_query: ProviderQuerySection,
    pub exchange: ExchangeSection,
    pub peering: PeeringSection,
    pub identity: IdentitySection,
}

/// `[routing]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoutingSection {
    /// off | standard | accelerated
    pub dht_mode: String,
    /// Per-router bound for delegated routers.
    pub delegated_timeout_secs: u64,
    /// Providers never returned to callers.
    pub ignore_providers: Vec<String>,
    /// Delegated routing endpoints.
    pub http_routers: Vec<HttpRouterEntry>,
}

impl Default for RoutingSection {
    fn default() -> Self {
        Self {
            dht_mode: DhtMode::Off.to_string(),
            delegated_timeout_secs: qg_01_content_routing::DEFAULT_DELEGATED_TIMEOUT.as_secs(),
            ignore_providers: Vec::new(),
            http_routers: vec![HttpRouterEntry {
                url: DEFAULT_HTTP_ROUTER.to_string(),
                capabilities: None,
            }],
        }
    }
}

/// `[[routing.http_routers]]`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpRouterEntry {
    pub url: String,
    /// providers | peers | ipns; omitted means the host's default set
    #[serde(default)]
    pub capabilities: Option<Vec<String>>,
}

/// `[provider_query]`, zero means unlimited.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderQuerySection {
    pub max_in_flight: usize,
    pub max_providers: usize,
    pub max_query_secs: u64,
}

/// `[exchange]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExchangeSection {
    pub per_block_timeout_ms: u64,
    /// 0 disables want-have replacement
    pub want_have_replace_size: usize,
    pub shared_cache: bool,
    pub max_ledger_wants: usize,
}

impl Default for ExchangeSection {
    fn default() -> Self {
        let defaults = ExchangeConfig::default();
        Self {
            per_block_timeout_ms: defaults.per_block_timeout.as_millis() as u64,
            want_have_replace_size: defaults.want_have_replace_size,
            shared_cache: defaults.shared_cache,
            max_ledger_wants: DEFAULT_MAX_LEDGER_WANTS,
        }
    }
}

/// `[peering]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PeeringSection {
    pub peers: Vec<PeerEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PeerEntry {
    pub id: String,
    #[serde(default)]
    pub addrs: Vec<String>,
}

/// `[identity]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdentitySection {
    /// 64 hex characters
    pub seed: Option<String>,
    /// Required with `seed`, at least 1
    pub seed_index: Option<i64>,
}

impl GatewayConfig {
    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Check every section without building anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.routing_config()?;
        self.exchange_config()?;
        self.peering()?;
        self.identity()?;
        Ok(())
    }

    pub fn dht_mode(&self) -> Result<DhtMode, ConfigError> {
        Ok(self.routing.dht_mode.parse()?)
    }

    pub fn routing_config(&self) -> Result<RoutingStackConfig, ConfigError> {
        let routing = &self.routing;
        if routing.delegated_timeout_secs == 0 && !routing.http_routers.is_empty() {
            return Err(ConfigError::Invalid(
                "routing.delegated_timeout_secs must be positive".to_string(),
            ));
        }
        check_upper_bound("routing.delegated_timeout_secs", Duration::from_secs(routing.delegated_timeout_secs))?;
        check_upper_bound("provider_query.max_query_secs", Duration::from_secs(self.provider_query.max_query_secs))?;

        let endpoints = routing
            .http_routers
            .iter()
            .map(|entry| {
                let descriptor = EndpointDescriptor::new(entry.url.clone());
                match &entry.capabilities {
                    Some(names) => Ok(descriptor.with_capabilities(EndpointCapabilities::from_names(names.as_slice())?)),
                    None => Ok(descriptor),
                }
            })
            .collect::<Result<Vec<_>, RoutingError>>()?;

        let denied_providers = routing
            .ignore_providers
            .iter()
            .map(|id| parse_peer(id, "routing.ignore_providers"))
            .collect::<Result<Vec<_>, _>>()?;

        let query = &self.provider_query;
        Ok(RoutingStackConfig {
            dht_mode: self.dht_mode()?,
            endpoints,
            delegated_timeout: Duration::from_secs(routing.delegated_timeout_secs),
            provider_limits: ProviderQueryLimits {
                max_in_flight: query.max_in_flight,
                max_providers: query.max_providers,
                max_query_duration: Duration::from_secs(query.max_query_secs),
            },
            denied_providers,
        })
    }

    pub fn exchange_config(&self) -> Result<ExchangeConfig, ConfigError> {
        let exchange = &self.exchange;
        if exchange.per_block_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "exchange.per_block_timeout_ms must be positive".to_string(),
            ));
        }
        check_upper_bound("exchange.per_block_timeout_ms", Duration::from_millis(exchange.per_block_timeout_ms))?;
        if exchange.shared_cache && exchange.max_ledger_wants == 0 {
            return Err(ConfigError::Invalid(
                "exchange.max_ledger_wants must be positive when shared_cache is on".to_string(),
            ));
        }
        Ok(ExchangeConfig {
            per_block_timeout: Duration::from_millis(exchange.per_block_timeout_ms),
            want_have_replace_size: exchange.want_have_replace_size,
            shared_cache: exchange.shared_cache,
            max_ledger_wants: exchange.max_ledger_wants,
        })
    }

    /// Peering entries as address records.
    pub fn peers(&self) -> Result<Vec<AddrInfo>, ConfigError> {
        self.peering
            .peers
            .iter()
            .map(|entry| Ok(AddrInfo::new(parse_peer(&entry.id, "peering.peers")?).with_addrs(entry.addrs.clone())))
            .collect()
    }

    pub fn peering(&self) -> Result<PeeringSet, ConfigError> {
        Ok(PeeringSet::new(self.peers()?.into_iter().map(|info| info.id)))
    }

    /// The seeded identity, or `None` when no seed is configured.
    pub fn identity(&self) -> Result<Option<Identity>, ConfigError> {
        let identity = &self.identity;
        match (&identity.seed, identity.seed_index) {
            (None, None) => Ok(None),
            (None, Some(_)) => Err(ConfigError::Invalid(
                "identity.seed_index is set without identity.seed".to_string(),
            )),
            (Some(_), None) => Err(ConfigError::Invalid(
                "identity.seed requires identity.seed_index".to_string(),
            )),
            (Some(seed), Some(index)) => {
                let seed: Seed = seed.parse()?;
                Ok(Some(Identity::derive(&seed, index)?))
            }
        }
    }
}

fn check_upper_bound(field: &str, timeout: Duration) -> Result<(), ConfigError> {
    if timeout > Duration::from_secs(MAX_TIMEOUT_SECS) {
        return Err(ConfigError::Invalid(format!(
            "{field} exceeds the {MAX_TIMEOUT_SECS}s limit"
        )));
    }
    Ok(())
}

fn parse_peer(id: &str, field: &str) -> Result<PeerId, ConfigError> {
    id.parse()
        .map_err(|e| ConfigError::Invalid(format!("{field}: {e}")))
}
