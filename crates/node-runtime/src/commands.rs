//! One-shot lookups behind the `quarry-node` subcommands.

use futures::StreamExt;
use qg_01_content_routing::{RoutingBackend, RoutingError};
use shared_types::{AddrInfo, ContentId, PeerId};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Value-store key for an IPNS name; a full `/ipns/...` path is kept as is.
pub fn ipns_key(name: &str) -> Vec<u8> {
    let name = name.trim();
    match name.strip_prefix("/ipns/") {
        Some(_) => name.as_bytes().to_vec(),
        None => format!("/ipns/{name}").into_bytes(),
    }
}

/// Collect providers for `cid` until the stream ends or `ctx` is cancelled.
pub async fn find_providers(
    router: &RoutingBackend,
    ctx: &CancellationToken,
    cid: &ContentId,
    limit: usize,
) -> Vec<AddrInfo> {
    let mut providers = Vec::new();
    let mut stream = router.find_providers(ctx, cid, limit);
    while let Some(provider) = stream.next().await {
        debug!(cid = %cid, provider = %provider.id, "Provider found");
        providers.push(provider);
    }
    providers
}

pub async fn find_peer(
    router: &RoutingBackend,
    ctx: &CancellationToken,
    peer: &PeerId,
) -> Result<AddrInfo, RoutingError> {
    router.find_peer(ctx, peer).await
}

/// Raw name record bytes.
pub async fn resolve_ipns(
    router: &RoutingBackend,
    ctx: &CancellationToken,
    name: &str,
) -> Result<Vec<u8>, RoutingError> {
    router.get_value(ctx, &ipns_key(name)).await
}
