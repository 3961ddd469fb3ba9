//! # Capability-Grouped Delegated Routers
//!
//! Normalises delegated routing endpoint addresses, merges duplicates with
//! the union of their capabilities and wires each surviving base address
//! into a `RoutingBackend` exposing only its declared facets. Endpoints
//! left with no capability are dropped with a warning.

use std::sync::Arc;

use reqwest::Url;
use tracing::warn;

use crate::domain::{EndpointCapabilities, EndpointDescriptor, GroupedEndpoint, RoutingError};
use crate::ports::{ContentDiscovery, PeerRouting, RoutingBackend, ValueStore};

/// Hosts whose well-known capability set is narrower than "everything".
const PROVIDERS_ONLY_HOSTS: &[&str] = &["cid.contact"];

const ROUTING_V1_SUFFIX: &str = "/routing/v1";

/// Canonical base address of a delegated router.
///
/// Lower-cases scheme and host, keeps only a non-default port, drops
/// trailing slashes and a trailing `/routing/v1` segment.
pub fn normalize_endpoint(raw: &str) -> Result<String, RoutingError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| RoutingError::Construction(format!("invalid router address {raw:?}: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(RoutingError::Construction(format!(
            "router address {raw:?} must use http or https"
        )));
    }
    let host = url
        .host_str()
        .ok_or_else(|| RoutingError::Construction(format!("router address {raw:?} has no host")))?;

    let mut base = format!("{}://{}", url.scheme(), host.to_ascii_lowercase());
    if let Some(port) = url.port() {
        base.push_str(&format!(":{port}"));
    }

    let mut path = url.path().trim_end_matches('/');
    if let Some(stripped) = path.strip_suffix(ROUTING_V1_SUFFIX) {
        path = stripped.trim_end_matches('/');
    }
    base.push_str(path);
    Ok(base)
}

/// Capability set assumed for an endpoint configured without a descriptor.
pub fn default_capabilities(base_url: &str) -> EndpointCapabilities {
    let host = Url::parse(base_url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_ascii_lowercase));

    match host {
        Some(host)
            if PROVIDERS_ONLY_HOSTS
                .iter()
                .any(|known| host == *known || host.ends_with(&format!(".{known}"))) =>
        {
            EndpointCapabilities::PROVIDERS_ONLY
        }
        _ => EndpointCapabilities::ALL,
    }
}

/// Group endpoints by normalised base address, preserving first-seen order.
pub fn group_endpoints(endpoints: &[EndpointDescriptor]) -> Result<Vec<GroupedEndpoint>, RoutingError> {
    let mut grouped: Vec<GroupedEndpoint> = Vec::with_capacity(endpoints.len());

    for endpoint in endpoints {
        let base_url = normalize_endpoint(&endpoint.url)?;
        let capabilities = endpoint
            .capabilities
            .unwrap_or_else(|| default_capabilities(&base_url));

        match grouped.iter_mut().find(|g| g.base_url == base_url) {
            Some(existing) => existing.capabilities = existing.capabilities.union(capabilities),
            None => grouped.push(GroupedEndpoint {
                base_url,
                capabilities,
            }),
        }
    }

    grouped.retain(|group| {
        if group.capabilities.is_empty() {
            warn!(router = %group.base_url, "[qg-01] Skipping delegated router with no capabilities");
            return false;
        }
        true
    });
    Ok(grouped)
}

/// Expose only the enabled read facets of `client`.
pub fn wire_delegated<C>(name: impl Into<String>, client: Arc<C>, capabilities: EndpointCapabilities) -> RoutingBackend
where
    C: ValueStore + PeerRouting + ContentDiscovery + 'static,
{
    let mut backend = RoutingBackend::named(name);
    if capabilities.ipns_get {
        backend = backend.with_values(client.clone());
    }
    if capabilities.peers {
        backend = backend.with_peers(client.clone());
    }
    if capabilities.providers {
        backend = backend.with_discovery(client);
    }
    backend
}
