//! # Shared-Cache Exchange Flows
//!
//! Several gateway nodes, each assembled from its own TOML configuration,
//! share one loopback exchange network. The serving node runs in
//! shared-cache mode with a single peered node.
//!
//! ## Flows Tested:
//!
//! 1. **Peered fetch**: the peered node gets the block from the serving node's cache
//! 2. **Non-peered fetch**: an outsider gets silence and times out at its per-block deadline
//! 3. **Late arrival**: a want for a block not yet held is answered once the block arrives
//! 4. **Gap-bounded batch**: a batch yields what is available and closes after one stalled gap
//! 5. **Disconnect**: leaving the network clears the departed node's wants

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use futures::StreamExt;
    use tokio::time::Instant;
    use tokio_util::sync::CancellationToken;

    use node_runtime::{GatewayConfig, GatewayContainer, Identity, Seed};
    use qg_02_block_exchange::{BlockStore, ExchangeApi, ExchangeError, LoopbackNetwork};
    use shared_types::{Block, ContentId, PeerId};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const SEED: &str = "4d1f0c7a9be2365d8e0f11a2b3c4d5e6f708192a3b4c5d6e7f8091a2b3c4d5e6";
    const SERVER: i64 = 1;
    const FRIEND: i64 = 2;
    const STRANGER: i64 = 3;
    const BLOCK_TIMEOUT: Duration = Duration::from_millis(500);

    fn peer_id(index: i64) -> PeerId {
        let seed: Seed = SEED.parse().unwrap();
        Identity::derive(&seed, index).unwrap().peer_id().clone()
    }

    /// Configuration for node `index`; only the server runs a shared cache.
    fn node_config(index: i64) -> GatewayConfig {
        let shared_cache = index == SERVER;
        let mut raw = format!(
            "[routing]\nhttp_routers = []\n\n\
             [exchange]\nper_block_timeout_ms = {}\nshared_cache = {shared_cache}\n\n\
             [identity]\nseed = \"{SEED}\"\nseed_index = {index}\n",
            BLOCK_TIMEOUT.as_millis()
        );
        if shared_cache {
            raw.push_str(&format!("\n[peering]\npeers = [{{ id = \"{}\" }}]\n", peer_id(FRIEND)));
        }
        GatewayConfig::from_toml_str(&raw).unwrap()
    }

    struct Cluster {
        network: Arc<LoopbackNetwork>,
        server: GatewayContainer,
        friend: GatewayContainer,
        stranger: GatewayContainer,
    }

    fn cluster() -> Cluster {
        let network = LoopbackNetwork::new();
        let node = |index| GatewayContainer::on_network(&node_config(index), network.clone()).unwrap();
        Cluster {
            server: node(SERVER),
            friend: node(FRIEND),
            stranger: node(STRANGER),
            network,
        }
    }

    fn block(data: &'static [u8]) -> Block {
        Block::raw(data).unwrap()
    }

    // =============================================================================
    // SINGLE-BLOCK FETCHES
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_cluster_identities_and_roles() {
        let cluster = cluster();
        assert_eq!(cluster.server.identity().peer_id(), &peer_id(SERVER));
        assert_eq!(cluster.friend.identity().peer_id(), &peer_id(FRIEND));
        assert!(cluster.server.serves_peers());
        assert!(!cluster.friend.serves_peers());
        assert!(!cluster.stranger.serves_peers());
        assert_eq!(cluster.network.peers().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_peered_node_fetches_from_shared_cache() {
        let cluster = cluster();
        let cached = block(b"cached on the server");
        cluster.server.store().put(cached.clone()).await.unwrap();
        let ctx = CancellationToken::new();

        let fetched = cluster.friend.exchange().get_block(&ctx, &cached.cid).await.unwrap();
        assert_eq!(fetched, cached);
        assert!(cluster.friend.store().has(&cached.cid).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_peered_node_times_out() {
        let cluster = cluster();
        let cached = block(b"cached on the server");
        cluster.server.store().put(cached.clone()).await.unwrap();
        let ctx = CancellationToken::new();

        let started = Instant::now();
        let result = cluster.stranger.exchange().get_block(&ctx, &cached.cid).await;
        assert!(matches!(result, Err(ExchangeError::Timeout(t)) if t == BLOCK_TIMEOUT));
        assert!(started.elapsed() <= BLOCK_TIMEOUT + Duration::from_millis(10));
        assert!(!cluster.stranger.store().has(&cached.cid).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_block_is_pushed_to_waiting_peer() {
        let cluster = cluster();
        let late = block(b"arrives later");
        let ctx = CancellationToken::new();

        let friend_exchange = cluster.friend.exchange().clone();
        let fetch_ctx = ctx.clone();
        let cid = late.cid.clone();
        let fetch = tokio::spawn(async move { friend_exchange.get_block(&fetch_ctx, &cid).await });

        tokio::time::sleep(Duration::from_millis(100)).await;
        cluster.server.store().put(late.clone()).await.unwrap();
        cluster
            .server
            .exchange()
            .notify_new_blocks(&ctx, std::slice::from_ref(&late))
            .await
            .unwrap();

        assert_eq!(fetch.await.unwrap().unwrap(), late);
    }

    // =============================================================================
    // BATCH FETCHES
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_batch_closes_after_stalled_gap() {
        let cluster = cluster();
        let held = block(b"held by the server");
        let local = block(b"already local");
        let missing = ContentId::raw(b"nobody has this").unwrap();
        cluster.server.store().put(held.clone()).await.unwrap();
        cluster.friend.store().put(local.clone()).await.unwrap();
        let ctx = CancellationToken::new();

        let started = Instant::now();
        let blocks: Vec<Block> = cluster
            .friend
            .exchange()
            .get_blocks(&ctx, vec![missing, held.cid.clone(), local.cid.clone()])
            .collect()
            .await;

        assert_eq!(blocks, vec![local, held]);
        assert!(started.elapsed() <= BLOCK_TIMEOUT + Duration::from_millis(10));
        assert!(!ctx.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_batch_ends_promptly() {
        let cluster = cluster();
        let missing = ContentId::raw(b"never").unwrap();
        let ctx = CancellationToken::new();

        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let started = Instant::now();
        let blocks: Vec<Block> = cluster.friend.exchange().get_blocks(&ctx, vec![missing]).collect().await;
        assert!(blocks.is_empty());
        assert!(started.elapsed() < BLOCK_TIMEOUT);
    }

    // =============================================================================
    // DISCONNECT
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_leaving_clears_remembered_wants() {
        let cluster = cluster();
        let late = block(b"never delivered");
        let ctx = CancellationToken::new();

        let result = cluster.friend.exchange().get_block(&ctx, &late.cid).await;
        assert!(matches!(result, Err(ExchangeError::Timeout(_))));

        let responder = cluster.server.exchange().server().cloned().unwrap();
        assert_eq!(responder.ledger_len(&peer_id(FRIEND)), 1);

        cluster.friend.shutdown();
        assert_eq!(cluster.network.peers().len(), 2);
        assert_eq!(responder.ledger_len(&peer_id(FRIEND)), 0);
        assert_eq!(responder.ledger_peers(), 0);
    }
}
