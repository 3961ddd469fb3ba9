//! # Routing Stack Flows
//!
//! The routing stack is assembled from a parsed `GatewayConfig`, with
//! in-memory routers standing in for the delegated HTTP endpoints.
//!
//! ## Flows Tested:
//!
//! 1. **Fan-out**: the fastest delegated router answers, slow ones are cut at their timeout
//! 2. **Error tolerance**: failing delegated routers never fail a lookup
//! 3. **Provider caps**: deny list, dedup and count cap across routers
//! 4. **Cancellation and deadlines**: provider streams end on cancel or query deadline
//! 5. **Accelerated DHT**: readiness switches the active client between calls

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use futures::StreamExt;
    use tokio::time::Instant;
    use tokio_util::sync::CancellationToken;

    use node_runtime::GatewayConfig;
    use qg_01_content_routing::{
        wire_delegated, BundledDht, GroupedEndpoint, MemoryRouter, RoutingBackend, RoutingError, RoutingStack,
        RoutingStackConfig,
    };
    use shared_types::{AddrInfo, ContentId};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn provider(name: &str) -> AddrInfo {
        AddrInfo::new(name.parse().unwrap())
    }

    /// Routing configuration with one delegated router per URL.
    fn routing_config(urls: &[&str], extra: &str) -> RoutingStackConfig {
        let mut raw = String::from("[routing]\ndelegated_timeout_secs = 1\n");
        if urls.is_empty() {
            raw.push_str("http_routers = []\n");
        }
        for url in urls {
            raw.push_str(&format!("\n[[routing.http_routers]]\nurl = \"{url}\"\n"));
        }
        raw.push_str(extra);
        GatewayConfig::from_toml_str(&raw).unwrap().routing_config().unwrap()
    }

    /// Build the stack, resolving delegated endpoints to in-memory routers.
    fn build(
        config: &RoutingStackConfig,
        dht: Option<BundledDht>,
        routers: &[(&str, &Arc<MemoryRouter>)],
    ) -> RoutingStack {
        let routers: HashMap<String, Arc<MemoryRouter>> = routers
            .iter()
            .map(|(url, router)| (url.to_string(), Arc::clone(router)))
            .collect();
        RoutingStack::build_with(config, dht, |group: &GroupedEndpoint, _timeout| {
            let router = routers
                .get(&group.base_url)
                .cloned()
                .ok_or_else(|| RoutingError::Construction(group.base_url.clone()))?;
            Ok(wire_delegated(group.base_url.clone(), router, group.capabilities))
        })
        .unwrap()
    }

    // =============================================================================
    // FAN-OUT
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_fastest_delegated_router_answers() {
        let slow = Arc::new(MemoryRouter::new().with_latency(Duration::from_secs(5)));
        let fast = Arc::new(MemoryRouter::new().with_latency(Duration::from_millis(100)));
        slow.insert_value(b"/ipns/k51name", b"slow".to_vec());
        fast.insert_value(b"/ipns/k51name", b"fast".to_vec());

        let config = routing_config(&["https://slow.example", "https://FAST.example/routing/v1/"], "");
        let stack = build(
            &config,
            None,
            &[("https://slow.example", &slow), ("https://fast.example", &fast)],
        );
        let ctx = CancellationToken::new();

        let started = Instant::now();
        let value = stack.router().get_value(&ctx, b"/ipns/k51name").await.unwrap();
        assert_eq!(value, b"fast");
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_delegated_routers_yield_not_found_within_timeout() {
        let slow = Arc::new(MemoryRouter::new().with_latency(Duration::from_secs(30)));
        let broken = Arc::new(MemoryRouter::new().with_failure(RoutingError::Transport("502".to_string())));
        slow.insert_value(b"/ipns/k51name", b"too late".to_vec());

        let config = routing_config(&["https://slow.example", "https://broken.example"], "");
        let stack = build(
            &config,
            None,
            &[("https://slow.example", &slow), ("https://broken.example", &broken)],
        );
        let ctx = CancellationToken::new();

        let started = Instant::now();
        let result = stack.router().get_value(&ctx, b"/ipns/k51name").await;
        assert!(matches!(result, Err(RoutingError::NotFound)));
        assert!(started.elapsed() <= Duration::from_secs(1) + Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_only_router_never_sees_value_lookups() {
        let indexer = Arc::new(MemoryRouter::new());
        indexer.insert_value(b"/ipns/k51name", b"hidden".to_vec());

        let config = routing_config(&["https://cid.contact"], "");
        let stack = build(&config, None, &[("https://cid.contact", &indexer)]);
        let ctx = CancellationToken::new();

        assert!(matches!(
            stack.router().get_value(&ctx, b"/ipns/k51name").await,
            Err(RoutingError::NotFound)
        ));
        assert_eq!(indexer.calls(), 0);
    }

    // =============================================================================
    // PROVIDER CAPS
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_providers_are_filtered_deduplicated_and_capped() {
        let cid = ContentId::raw(b"popular").unwrap();
        let a = Arc::new(MemoryRouter::new());
        let b = Arc::new(MemoryRouter::new().with_latency(Duration::from_millis(50)));
        for name in ["12D3KooWBlocked", "12D3KooWOne", "12D3KooWTwo"] {
            a.insert_provider(cid.clone(), provider(name));
        }
        for name in ["12D3KooWTwo", "12D3KooWThree", "12D3KooWFour"] {
            b.insert_provider(cid.clone(), provider(name));
        }

        let extra = "\n[provider_query]\nmax_providers = 3\n";
        let mut config = routing_config(&["https://a.example", "https://b.example"], extra);
        config.denied_providers = vec!["12D3KooWBlocked".parse().unwrap()];
        let stack = build(&config, None, &[("https://a.example", &a), ("https://b.example", &b)]);
        let ctx = CancellationToken::new();

        let found: Vec<AddrInfo> = stack.router().find_providers(&ctx, &cid, 0).collect().await;
        let ids: Vec<&str> = found.iter().map(|p| p.id.as_str()).collect();

        assert_eq!(ids.len(), 3);
        assert!(!ids.contains(&"12D3KooWBlocked"));
        let mut unique = ids.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), ids.len());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_ends_provider_stream() {
        let cid = ContentId::raw(b"streamed").unwrap();
        let trickle = Arc::new(MemoryRouter::new().with_record_interval(Duration::from_secs(1)));
        for i in 0..5 {
            trickle.insert_provider(cid.clone(), provider(&format!("12D3KooWPeer{i}")));
        }

        let mut config = routing_config(&["https://trickle.example"], "");
        config.delegated_timeout = Duration::from_secs(60);
        let stack = build(&config, None, &[("https://trickle.example", &trickle)]);
        let ctx = CancellationToken::new();

        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            canceller.cancel();
        });

        let started = Instant::now();
        let found: Vec<AddrInfo> = stack.router().find_providers(&ctx, &cid, 0).collect().await;
        assert!(found.len() < 5);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_deadline_ends_provider_stream() {
        let cid = ContentId::raw(b"slow-trickle").unwrap();
        let trickle = Arc::new(MemoryRouter::new().with_record_interval(Duration::from_millis(400)));
        for i in 0..5 {
            trickle.insert_provider(cid.clone(), provider(&format!("12D3KooWPeer{i}")));
        }

        let mut config = routing_config(&["https://trickle.example"], "");
        config.delegated_timeout = Duration::from_secs(60);
        config.provider_limits.max_query_duration = Duration::from_secs(1);
        let stack = build(&config, None, &[("https://trickle.example", &trickle)]);
        let ctx = CancellationToken::new();

        let started = Instant::now();
        let found: Vec<AddrInfo> = stack.router().find_providers(&ctx, &cid, 0).collect().await;
        assert!(found.len() < 5);
        assert!(started.elapsed() <= Duration::from_secs(1) + Duration::from_millis(10));
        assert!(!ctx.is_cancelled());
    }

    // =============================================================================
    // ACCELERATED DHT
    // =============================================================================

    #[tokio::test]
    async fn test_accelerated_dht_follows_readiness() {
        let standard = Arc::new(MemoryRouter::new());
        let accelerated = Arc::new(MemoryRouter::new());
        standard.insert_value(b"/ipns/k51name", b"standard".to_vec());
        accelerated.insert_value(b"/ipns/k51name", b"accelerated".to_vec());
        accelerated.set_ready(false);
        let dht = BundledDht::new(
            RoutingBackend::full("standard", standard.clone()),
            RoutingBackend::full("accelerated", accelerated.clone()),
        );

        let mut config = routing_config(&[], "");
        config.dht_mode = "accelerated".parse().unwrap();
        let stack = build(&config, Some(dht), &[]);
        let ctx = CancellationToken::new();
        let key = ContentId::raw(b"announce").unwrap();

        assert_eq!(stack.router().get_value(&ctx, b"/ipns/k51name").await.unwrap(), b"standard");
        stack.router().provide(&ctx, &key, true).await.unwrap();
        assert_eq!(standard.provided(), vec![key.clone()]);

        accelerated.set_ready(true);
        assert_eq!(stack.router().get_value(&ctx, b"/ipns/k51name").await.unwrap(), b"accelerated");
        stack.router().provide(&ctx, &key, true).await.unwrap();
        assert_eq!(accelerated.provided(), vec![key]);
    }
}
