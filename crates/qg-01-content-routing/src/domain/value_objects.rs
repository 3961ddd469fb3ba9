//! # Domain Value Objects
//!
//! Immutable configuration values for routing assembly.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::errors::RoutingError;

/// Which DHT client (if any) participates in routing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DhtMode {
    /// Always-consistent client only.
    Standard,
    /// Accelerated client when ready, standard client otherwise.
    #[default]
    Accelerated,
    /// No DHT; delegated routers only.
    Off,
}

impl FromStr for DhtMode {
    type Err = RoutingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "accelerated" => Ok(Self::Accelerated),
            "off" | "none" | "disabled" => Ok(Self::Off),
            other => Err(RoutingError::Construction(format!(
                "unknown DHT mode {other:?} (expected standard, accelerated or off)"
            ))),
        }
    }
}

impl fmt::Display for DhtMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => f.write_str("standard"),
            Self::Accelerated => f.write_str("accelerated"),
            Self::Off => f.write_str("off"),
        }
    }
}

/// Caps applied by the provider query manager. Zero means unlimited.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProviderQueryLimits {
    /// Concurrent discovery queries across all callers.
    pub max_in_flight: usize,
    /// Provider records returned per logical query.
    pub max_providers: usize,
    /// Wall-clock bound per query.
    pub max_query_duration: Duration,
}

impl ProviderQueryLimits {
    /// Per-query deadline, if bounded.
    pub fn query_deadline(&self) -> Option<Duration> {
        (!self.max_query_duration.is_zero()).then_some(self.max_query_duration)
    }

    /// Effective result cap given a caller-supplied limit (0 = none).
    pub fn effective_cap(&self, caller_limit: usize) -> usize {
        match (self.max_providers, caller_limit) {
            (0, n) | (n, 0) => n,
            (a, b) => a.min(b),
        }
    }
}
