//! In-memory routing backend.
//!
//! Answers from local tables after a configurable latency, and can be told
//! to fail or report not-ready. Also the fake used throughout the tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::RwLock;
use shared_types::{AddrInfo, ContentId, PeerId};
use tokio_util::sync::CancellationToken;

use crate::domain::RoutingError;
use crate::ports::{
    Bootstrap, ContentAnnouncer, ContentDiscovery, PeerRouting, ProvideMany, ProviderStream,
    ReadinessCheck, ValuePublisher, ValueStore, ValueStream,
};

/// Routing tables held in process memory.
pub struct MemoryRouter {
    values: RwLock<HashMap<Vec<u8>, Vec<Vec<u8>>>>,
    providers: RwLock<HashMap<ContentId, Vec<AddrInfo>>>,
    peers: RwLock<HashMap<PeerId, AddrInfo>>,
    provided: RwLock<Vec<ContentId>>,
    latency: RwLock<Duration>,
    record_interval: RwLock<Duration>,
    failure: RwLock<Option<RoutingError>>,
    ready: AtomicBool,
    calls: AtomicUsize,
}

impl MemoryRouter {
    pub fn new() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
            providers: RwLock::new(HashMap::new()),
            peers: RwLock::new(HashMap::new()),
            provided: RwLock::new(Vec::new()),
            latency: RwLock::new(Duration::ZERO),
            record_interval: RwLock::new(Duration::ZERO),
            failure: RwLock::new(None),
            ready: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        }
    }

    /// Delay before the first answer of every lookup.
    #[must_use]
    pub fn with_latency(self, latency: Duration) -> Self {
        *self.latency.write() = latency;
        self
    }

    /// Delay between successive streamed records.
    #[must_use]
    pub fn with_record_interval(self, interval: Duration) -> Self {
        *self.record_interval.write() = interval;
        self
    }

    /// Fail every lookup and bootstrap with `error`.
    #[must_use]
    pub fn with_failure(self, error: RoutingError) -> Self {
        *self.failure.write() = Some(error);
        self
    }

    /// Append a value; the last inserted value is the best one.
    pub fn insert_value(&self, key: &[u8], value: Vec<u8>) {
        self.values.write().entry(key.to_vec()).or_default().push(value);
    }

    pub fn insert_provider(&self, key: ContentId, provider: AddrInfo) {
        self.providers.write().entry(key).or_default().push(provider);
    }

    pub fn insert_peer(&self, info: AddrInfo) {
        self.peers.write().insert(info.id.clone(), info);
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Number of routing operations served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Keys announced through `provide`/`provide_many`.
    pub fn provided(&self) -> Vec<ContentId> {
        self.provided.read().clone()
    }

    /// Count the call, wait out the latency, then apply the failure switch.
    async fn begin(&self, ctx: &CancellationToken) -> Result<(), RoutingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let latency = *self.latency.read();
        if !latency.is_zero() {
            tokio::select! {
                biased;
                _ = ctx.cancelled() => return Err(RoutingError::Cancelled),
                _ = tokio::time::sleep(latency) => {}
            }
        }
        match self.failure.read().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl Default for MemoryRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// Emit `items` one at a time, sleeping `interval` between them.
fn paced<T: Send + 'static>(
    items: Vec<T>,
    interval: Duration,
    ctx: CancellationToken,
) -> stream::BoxStream<'static, T> {
    stream::unfold(
        (items.into_iter(), ctx, true),
        move |(mut items, ctx, first)| async move {
            let item = items.next()?;
            if !first && !interval.is_zero() {
                tokio::select! {
                    biased;
                    _ = ctx.cancelled() => return None,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
            if ctx.is_cancelled() {
                return None;
            }
            Some((item, (items, ctx, false)))
        },
    )
    .boxed()
}

#[async_trait]
impl ValueStore for MemoryRouter {
    async fn get_value(&self, ctx: &CancellationToken, key: &[u8]) -> Result<Vec<u8>, RoutingError> {
        self.begin(ctx).await?;
        self.values
            .read()
            .get(key)
            .and_then(|values| values.last().cloned())
            .ok_or(RoutingError::NotFound)
    }

    async fn search_value(&self, ctx: &CancellationToken, key: &[u8]) -> Result<ValueStream, RoutingError> {
        self.begin(ctx).await?;
        let values = self.values.read().get(key).cloned().unwrap_or_default();
        if values.is_empty() {
            return Err(RoutingError::NotFound);
        }
        Ok(paced(values, *self.record_interval.read(), ctx.clone()))
    }
}

#[async_trait]
impl ValuePublisher for MemoryRouter {
    async fn put_value(&self, ctx: &CancellationToken, key: &[u8], value: Vec<u8>) -> Result<(), RoutingError> {
        self.begin(ctx).await?;
        self.insert_value(key, value);
        Ok(())
    }
}

#[async_trait]
impl PeerRouting for MemoryRouter {
    async fn find_peer(&self, ctx: &CancellationToken, peer: &PeerId) -> Result<AddrInfo, RoutingError> {
        self.begin(ctx).await?;
        self.peers.read().get(peer).cloned().ok_or(RoutingError::NotFound)
    }
}

impl ContentDiscovery for MemoryRouter {
    fn find_providers(&self, ctx: &CancellationToken, key: &ContentId, limit: usize) -> ProviderStream {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failure.read().is_some() {
            return Box::pin(stream::empty());
        }
        let mut records = self.providers.read().get(key).cloned().unwrap_or_default();
        if limit > 0 {
            records.truncate(limit);
        }
        let latency = *self.latency.read();
        let interval = *self.record_interval.read();
        let ctx = ctx.clone();

        let delayed_start = {
            let ctx = ctx.clone();
            async move {
                if !latency.is_zero() {
                    tokio::select! {
                        biased;
                        _ = ctx.cancelled() => return false,
                        _ = tokio::time::sleep(latency) => {}
                    }
                }
                !ctx.is_cancelled()
            }
        };
        stream::once(delayed_start)
            .flat_map(move |go| {
                let records = if go { std::mem::take(&mut records) } else { Vec::new() };
                paced(records, interval, ctx.clone())
            })
            .boxed()
    }
}

#[async_trait]
impl ContentAnnouncer for MemoryRouter {
    async fn provide(&self, ctx: &CancellationToken, key: &ContentId, _announce: bool) -> Result<(), RoutingError> {
        self.begin(ctx).await?;
        self.provided.write().push(key.clone());
        Ok(())
    }
}

#[async_trait]
impl ProvideMany for MemoryRouter {
    async fn provide_many(&self, ctx: &CancellationToken, keys: &[ContentId]) -> Result<(), RoutingError> {
        self.begin(ctx).await?;
        self.provided.write().extend_from_slice(keys);
        Ok(())
    }
}

#[async_trait]
impl Bootstrap for MemoryRouter {
    async fn bootstrap(&self, ctx: &CancellationToken) -> Result<(), RoutingError> {
        self.begin(ctx).await
    }
}

impl ReadinessCheck for MemoryRouter {
    fn ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(name: &str) -> AddrInfo {
        AddrInfo::new(name.parse().unwrap())
    }

    #[tokio::test]
    async fn test_get_value_returns_latest() {
        let router = MemoryRouter::new();
        router.insert_value(b"/ipns/a", b"v1".to_vec());
        router.insert_value(b"/ipns/a", b"v2".to_vec());
        let ctx = CancellationToken::new();

        assert_eq!(router.get_value(&ctx, b"/ipns/a").await.unwrap(), b"v2");
        assert!(matches!(router.get_value(&ctx, b"/ipns/b").await, Err(RoutingError::NotFound)));
        assert_eq!(router.calls(), 2);
    }

    #[tokio::test]
    async fn test_search_value_streams_all() {
        let router = MemoryRouter::new();
        router.insert_value(b"k", b"1".to_vec());
        router.insert_value(b"k", b"2".to_vec());
        let ctx = CancellationToken::new();

        let values: Vec<_> = router.search_value(&ctx, b"k").await.unwrap().collect().await;
        assert_eq!(values, vec![b"1".to_vec(), b"2".to_vec()]);
    }

    #[tokio::test]
    async fn test_find_providers_respects_limit() {
        let router = MemoryRouter::new();
        let key = ContentId::raw(b"data").unwrap();
        for name in ["p1", "p2", "p3"] {
            router.insert_provider(key.clone(), peer(name));
        }
        let ctx = CancellationToken::new();

        assert_eq!(router.find_providers(&ctx, &key, 2).count().await, 2);
        assert_eq!(router.find_providers(&ctx, &key, 0).count().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_observes_cancellation() {
        let router = MemoryRouter::new().with_latency(Duration::from_secs(60));
        let ctx = CancellationToken::new();
        let cancel = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            cancel.cancel();
        });

        let result = router.find_peer(&ctx, &"p".parse().unwrap()).await;
        assert!(matches!(result, Err(RoutingError::Cancelled)));
    }

    #[tokio::test]
    async fn test_failure_switch() {
        let router = MemoryRouter::new().with_failure(RoutingError::Transport("down".into()));
        let ctx = CancellationToken::new();
        assert!(matches!(router.bootstrap(&ctx).await, Err(RoutingError::Transport(_))));

        let key = ContentId::raw(b"x").unwrap();
        router.insert_provider(key.clone(), peer("p1"));
        assert_eq!(router.find_providers(&ctx, &key, 0).count().await, 0);
    }

    #[tokio::test]
    async fn test_provide_records_keys() {
        let router = MemoryRouter::new();
        let ctx = CancellationToken::new();
        let a = ContentId::raw(b"a").unwrap();
        let b = ContentId::raw(b"b").unwrap();

        router.provide(&ctx, &a, true).await.unwrap();
        router.provide_many(&ctx, &[b.clone()]).await.unwrap();
        assert_eq!(router.provided(), vec![a, b]);
    }
}
