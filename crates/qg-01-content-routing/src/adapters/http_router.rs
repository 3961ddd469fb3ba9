//! HTTP Delegated Routing V1 client.
//!
//! Implements the read-only subset of the Routing V1 API:
//!
//! - `GET /routing/v1/providers/{cid}`
//! - `GET /routing/v1/peers/{peer-id}`
//! - `GET /routing/v1/ipns/{name}`
//!
//! Which of these facets is actually wired into a `RoutingBackend` is
//! decided by endpoint grouping, not by this client.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use shared_types::{AddrInfo, ContentId, PeerId};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::{Capability, RoutingError};
use crate::ports::{ContentDiscovery, PeerRouting, ProviderStream, ValueStore};

const IPNS_PREFIX: &[u8] = b"/ipns/";
const IPNS_RECORD_MEDIA_TYPE: &str = "application/vnd.ipfs.ipns-record";

/// Routing V1 client bound to one base address.
#[derive(Clone, Debug)]
pub struct HttpRouterClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ProvidersResponse {
    #[serde(rename = "Providers", default)]
    providers: Option<Vec<RecordJson>>,
}

#[derive(Debug, Deserialize)]
struct PeersResponse {
    #[serde(rename = "Peers", default)]
    peers: Option<Vec<RecordJson>>,
}

#[derive(Debug, Deserialize)]
struct RecordJson {
    #[serde(rename = "Schema", default)]
    schema: String,
    #[serde(rename = "ID", default)]
    id: Option<String>,
    #[serde(rename = "Addrs", default)]
    addrs: Option<Vec<String>>,
}

impl HttpRouterClient {
    /// Build a client for `base_url` (already normalised) with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RoutingError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .user_agent(concat!("quarry/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RoutingError::Construction(format!("http client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_error(&self, error: reqwest::Error) -> RoutingError {
        if error.is_timeout() {
            RoutingError::Timeout(self.timeout)
        } else {
            RoutingError::Transport(error.to_string())
        }
    }

    async fn get(&self, ctx: &CancellationToken, path: &str, accept: &str) -> Result<Vec<u8>, RoutingError> {
        let url = format!("{}/routing/v1/{}", self.base_url, path);
        let request = async {
            let response = self
                .client
                .get(&url)
                .header(reqwest::header::ACCEPT, accept)
                .send()
                .await
                .map_err(|e| self.map_error(e))?;

            match response.status() {
                StatusCode::NOT_FOUND => return Err(RoutingError::NotFound),
                status if !status.is_success() => {
                    return Err(RoutingError::Transport(format!("{url}: HTTP {status}")))
                }
                _ => {}
            }

            response
                .bytes()
                .await
                .map(|body| body.to_vec())
                .map_err(|e| self.map_error(e))
        };

        tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(RoutingError::Cancelled),
            result = request => result,
        }
    }

    async fn fetch_providers(&self, ctx: &CancellationToken, key: &ContentId) -> Result<Vec<AddrInfo>, RoutingError> {
        let body = self
            .get(ctx, &format!("providers/{key}"), "application/json")
            .await?;
        let parsed: ProvidersResponse = serde_json::from_slice(&body)
            .map_err(|e| RoutingError::Transport(format!("malformed providers response: {e}")))?;
        Ok(peer_records(parsed.providers.unwrap_or_default()))
    }
}

/// Keep only `peer` schema records with a parseable identity.
fn peer_records(records: Vec<RecordJson>) -> Vec<AddrInfo> {
    records
        .into_iter()
        .filter(|record| record.schema.eq_ignore_ascii_case("peer"))
        .filter_map(|record| {
            let id: PeerId = record.id?.parse().ok()?;
            Some(AddrInfo::new(id).with_addrs(record.addrs.unwrap_or_default()))
        })
        .collect()
}

#[async_trait]
impl ValueStore for HttpRouterClient {
    async fn get_value(&self, ctx: &CancellationToken, key: &[u8]) -> Result<Vec<u8>, RoutingError> {
        let name = key
            .strip_prefix(IPNS_PREFIX)
            .and_then(|name| std::str::from_utf8(name).ok())
            .filter(|name| !name.is_empty())
            .ok_or(RoutingError::Unsupported(Capability::ValueGet))?;

        self.get(ctx, &format!("ipns/{name}"), IPNS_RECORD_MEDIA_TYPE).await
    }
}

#[async_trait]
impl PeerRouting for HttpRouterClient {
    async fn find_peer(&self, ctx: &CancellationToken, peer: &PeerId) -> Result<AddrInfo, RoutingError> {
        let body = self
            .get(ctx, &format!("peers/{peer}"), "application/json")
            .await?;
        let parsed: PeersResponse = serde_json::from_slice(&body)
            .map_err(|e| RoutingError::Transport(format!("malformed peers response: {e}")))?;

        peer_records(parsed.peers.unwrap_or_default())
            .into_iter()
            .find(|record| &record.id == peer)
            .ok_or(RoutingError::NotFound)
    }
}

impl ContentDiscovery for HttpRouterClient {
    fn find_providers(&self, ctx: &CancellationToken, key: &ContentId, limit: usize) -> ProviderStream {
        let client = self.clone();
        let ctx = ctx.clone();
        let key = key.clone();

        let lookup = async move {
            match client.fetch_providers(&ctx, &key).await {
                Ok(mut records) => {
                    if limit > 0 {
                        records.truncate(limit);
                    }
                    records
                }
                Err(e) => {
                    debug!(router = %client.base_url, cid = %key, error = %e, "[qg-01] Delegated provider lookup failed");
                    Vec::new()
                }
            }
        };
        stream::once(lookup).flat_map(stream::iter).boxed()
    }
}
