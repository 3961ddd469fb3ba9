//! # Gateway Lookup Flows
//!
//! A full gateway node assembled around a routing stack whose delegated
//! endpoints resolve to in-memory routers, queried through the same
//! lookups the `quarry-node` subcommands run.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio_util::sync::CancellationToken;

    use node_runtime::commands;
    use node_runtime::{GatewayConfig, GatewayContainer};
    use qg_01_content_routing::{wire_delegated, MemoryRouter, RoutingError, RoutingStack};
    use qg_02_block_exchange::LoopbackNetwork;
    use shared_types::{AddrInfo, ContentId, PeerId};

    const CONFIG: &str = r#"
[routing]
ignore_providers = ["12D3KooWSpammer"]

[[routing.http_routers]]
url = "https://indexer.example"
capabilities = ["providers"]

[[routing.http_routers]]
url = "https://delegated.example/routing/v1"

[provider_query]
max_providers = 2
max_query_secs = 5
"#;

    /// Node whose two delegated endpoints are in-memory routers.
    fn node(indexer: &Arc<MemoryRouter>, delegated: &Arc<MemoryRouter>) -> GatewayContainer {
        let config = GatewayConfig::from_toml_str(CONFIG).unwrap();
        let routing = RoutingStack::build_with(&config.routing_config().unwrap(), None, |group, _timeout| {
            let router = match group.base_url.as_str() {
                "https://indexer.example" => indexer.clone(),
                "https://delegated.example" => delegated.clone(),
                other => return Err(RoutingError::Construction(other.to_string())),
            };
            Ok(wire_delegated(group.base_url.clone(), router, group.capabilities))
        })
        .unwrap();
        GatewayContainer::with_routing(&config, routing, LoopbackNetwork::new()).unwrap()
    }

    fn provider(name: &str) -> AddrInfo {
        AddrInfo::new(name.parse().unwrap()).with_addrs(vec![format!("/dns4/{name}.example/tcp/4001")])
    }

    #[tokio::test(start_paused = true)]
    async fn test_providers_lookup_merges_routers_within_caps() {
        let indexer = Arc::new(MemoryRouter::new());
        let delegated = Arc::new(MemoryRouter::new().with_latency(Duration::from_millis(20)));
        let cid = ContentId::raw(b"gateway content").unwrap();
        indexer.insert_provider(cid.clone(), provider("12D3KooWSpammer"));
        indexer.insert_provider(cid.clone(), provider("12D3KooWIndexed"));
        delegated.insert_provider(cid.clone(), provider("12D3KooWIndexed"));
        delegated.insert_provider(cid.clone(), provider("12D3KooWDelegated"));
        let node = node(&indexer, &delegated);
        let ctx = CancellationToken::new();

        let found = commands::find_providers(node.router(), &ctx, &cid, 0).await;
        let ids: Vec<&str> = found.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["12D3KooWIndexed", "12D3KooWDelegated"]);

        let capped = commands::find_providers(node.router(), &ctx, &cid, 1).await;
        assert_eq!(capped.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ipns_and_peer_lookups_skip_provider_only_router() {
        let indexer = Arc::new(MemoryRouter::new());
        let delegated = Arc::new(MemoryRouter::new());
        let peer: PeerId = "12D3KooWTarget".parse().unwrap();
        delegated.insert_value(b"/ipns/k51name", b"signed record".to_vec());
        delegated.insert_peer(provider("12D3KooWTarget"));
        let node = node(&indexer, &delegated);
        let ctx = CancellationToken::new();

        let record = commands::resolve_ipns(node.router(), &ctx, "k51name").await.unwrap();
        assert_eq!(record, b"signed record");

        let info = commands::find_peer(node.router(), &ctx, &peer).await.unwrap();
        assert_eq!(info.addrs, vec!["/dns4/12D3KooWTarget.example/tcp/4001".to_string()]);

        assert_eq!(indexer.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gateway_is_read_only() {
        let indexer = Arc::new(MemoryRouter::new());
        let delegated = Arc::new(MemoryRouter::new());
        let node = node(&indexer, &delegated);
        let ctx = CancellationToken::new();
        let cid = ContentId::raw(b"not announced").unwrap();

        node.router().provide(&ctx, &cid, true).await.unwrap();
        assert!(indexer.provided().is_empty());
        assert!(delegated.provided().is_empty());
        assert!(node.router().put_value(&ctx, b"/ipns/k51name", b"x".to_vec()).await.is_err());
    }
}
