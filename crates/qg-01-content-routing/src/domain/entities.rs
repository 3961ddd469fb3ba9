//! # Domain Entities
//!
//! Delegated routing endpoints and the read-only capabilities they advertise.

use super::errors::RoutingError;

/// Read-only capabilities advertised by one delegated routing endpoint.
///
/// Publishing is deliberately absent: the gateway never writes to a
/// delegated router.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EndpointCapabilities {
    /// Provider record lookups (`/routing/v1/providers`).
    pub providers: bool,
    /// Peer record lookups (`/routing/v1/peers`).
    pub peers: bool,
    /// Name record lookups (`/routing/v1/ipns`, GET only).
    pub ipns_get: bool,
}

impl EndpointCapabilities {
    /// Every read capability.
    pub const ALL: Self = Self {
        providers: true,
        peers: true,
        ipns_get: true,
    };

    /// Provider lookups only.
    pub const PROVIDERS_ONLY: Self = Self {
        providers: true,
        peers: false,
        ipns_get: false,
    };

    /// Parse a declarative capability list (`providers`, `peers`, `ipns`).
    ///
    /// An empty list yields the empty set; unknown names are a
    /// construction error.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, RoutingError> {
        let mut caps = Self::default();
        for name in names {
            match name.as_ref().trim().to_ascii_lowercase().as_str() {
                "providers" => caps.providers = true,
                "peers" => caps.peers = true,
                "ipns" | "ipns-get" => caps.ipns_get = true,
                other => {
                    return Err(RoutingError::Construction(format!(
                        "unknown delegated routing capability {other:?}"
                    )))
                }
            }
        }
        Ok(caps)
    }

    /// Union of both capability sets.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            providers: self.providers || other.providers,
            peers: self.peers || other.peers,
            ipns_get: self.ipns_get || other.ipns_get,
        }
    }

    /// No capability is enabled.
    pub fn is_empty(&self) -> bool {
        !(self.providers || self.peers || self.ipns_get)
    }
}

/// One configured delegated routing endpoint, before grouping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointDescriptor {
    /// Endpoint URL as written in configuration.
    pub url: String,
    /// Explicit capability override; `None` uses the well-known default.
    pub capabilities: Option<EndpointCapabilities>,
}

impl EndpointDescriptor {
    /// Endpoint relying on default capabilities.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            capabilities: None,
        }
    }

    /// Endpoint with an explicit capability set.
    pub fn with_capabilities(mut self, capabilities: EndpointCapabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }
}

/// A unique base address with the union of its declared capabilities.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupedEndpoint {
    /// Normalised base address.
    pub base_url: String,
    /// Never empty once grouping has finished.
    pub capabilities: EndpointCapabilities,
}
