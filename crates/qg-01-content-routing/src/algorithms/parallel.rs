//! # Composite Parallel Router
//!
//! Fans routing queries out to an ordered set of entries (typically the DHT
//! plus any delegated routers) and merges or selects their answers.
//!
//! ## Semantics
//!
//! - `get_value`, `find_peer`: every capable entry is dispatched
//!   concurrently after its `execute_after` delay, under its own timeout.
//!   The first success wins; the remaining tasks are cancelled and aborted
//!   without being joined.
//! - `search_value`: resolves the first value the same way, then keeps
//!   relaying further values from entries not marked first-hit-only.
//! - `find_providers`: every entry's stream is relayed onto one merged
//!   stream in arrival order.
//! - `provide`, `put_value`, `provide_many`: sent to the primary entry only.
//! - `bootstrap`: run on every entry; failures are collected, never fail-fast.
//! - `ready`: false only if some entry explicitly reports not-ready.
//!
//! ## Error aggregation
//!
//! Failures from entries with `ignore_error_on_search` are dropped. Of the
//! rest, the first error that is not "not found like" is surfaced. If there
//! is none, the outcome is `NotFound`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{self, join_all};
use futures::stream::{self, StreamExt};
use shared_types::{AddrInfo, ContentId, PeerId};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::relay::{deadline_after, expires_at, Relay};
use crate::domain::{Capability, RoutingError};
use crate::ports::{
    Bootstrap, ContentAnnouncer, ContentDiscovery, PeerRouting, ProvideMany, ProviderStream,
    ReadinessCheck, RoutingBackend, ValuePublisher, ValueStore, ValueStream,
};

/// One source participating in the parallel router.
#[derive(Clone, Debug)]
pub struct ParallelRouteEntry {
    pub backend: RoutingBackend,
    /// Bound on the entry's answer; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Stagger before the entry is dispatched.
    pub execute_after: Duration,
    /// Failures of this entry never surface in the aggregate result.
    pub ignore_error_on_search: bool,
    /// Contribute at most one value to a value search.
    pub wait_for_first_hit_only: bool,
}

impl ParallelRouteEntry {
    /// Entry with no timeout, no delay and strict error propagation.
    pub fn new(backend: RoutingBackend) -> Self {
        Self {
            backend,
            timeout: None,
            execute_after: Duration::ZERO,
            ignore_error_on_search: false,
            wait_for_first_hit_only: false,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_execute_after(mut self, delay: Duration) -> Self {
        self.execute_after = delay;
        self
    }

    #[must_use]
    pub fn ignore_errors(mut self, ignore: bool) -> Self {
        self.ignore_error_on_search = ignore;
        self
    }

    #[must_use]
    pub fn first_hit_only(mut self, first_only: bool) -> Self {
        self.wait_for_first_hit_only = first_only;
        self
    }
}

/// Concurrent multi-source router.
#[derive(Clone, Debug)]
pub struct ParallelRouter {
    entries: Arc<[ParallelRouteEntry]>,
    primary: Option<usize>,
}

impl ParallelRouter {
    pub fn new(entries: Vec<ParallelRouteEntry>) -> Self {
        Self {
            entries: entries.into(),
            primary: None,
        }
    }

    /// Designate the entry that receives provide and put traffic.
    pub fn with_primary(mut self, index: usize) -> Result<Self, RoutingError> {
        if index >= self.entries.len() {
            return Err(RoutingError::Construction(format!(
                "primary entry {index} out of range ({} entries)",
                self.entries.len()
            )));
        }
        self.primary = Some(index);
        Ok(self)
    }

    pub fn entries(&self) -> &[ParallelRouteEntry] {
        &self.entries
    }

    pub fn primary(&self) -> Option<&ParallelRouteEntry> {
        self.primary.map(|index| &self.entries[index])
    }

    /// Dispatch `call` to every entry supporting `capability`; first success wins.
    async fn first_hit<T, F, Fut>(
        &self,
        ctx: &CancellationToken,
        capability: Capability,
        call: F,
    ) -> Result<T, RoutingError>
    where
        T: Send + 'static,
        F: Fn(RoutingBackend, CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, RoutingError>> + Send + 'static,
    {
        let token = ctx.child_token();
        let _guard = token.clone().drop_guard();
        let mut tasks = JoinSet::new();

        for (index, entry) in self.entries.iter().enumerate() {
            if !entry.backend.supports(capability) {
                continue;
            }
            let fut = call(entry.backend.clone(), token.clone());
            let entry_token = token.clone();
            let (delay, limit) = (entry.execute_after, entry.timeout);
            tasks.spawn(async move { (index, run_entry(entry_token, delay, limit, fut).await) });
        }

        let mut errors = Vec::new();
        loop {
            tokio::select! {
                biased;
                _ = ctx.cancelled() => return Err(RoutingError::Cancelled),
                joined = tasks.join_next() => match joined {
                    None => break,
                    Some(Ok((index, Ok(value)))) => {
                        debug!(
                            router = %self.entries[index].backend.name(),
                            op = %capability,
                            "[qg-01] Parallel entry answered first"
                        );
                        return Ok(value);
                    }
                    Some(Ok((index, Err(e)))) => self.record_failure(index, capability, e, &mut errors),
                    Some(Err(e)) => warn!(op = %capability, error = %e, "[qg-01] Parallel entry task failed"),
                },
            }
        }

        if ctx.is_cancelled() {
            return Err(RoutingError::Cancelled);
        }
        Err(aggregate(errors))
    }

    fn record_failure(
        &self,
        index: usize,
        capability: Capability,
        error: RoutingError,
        errors: &mut Vec<RoutingError>,
    ) {
        let entry = &self.entries[index];
        match &error {
            RoutingError::Timeout(after) => warn!(
                router = %entry.backend.name(),
                op = %capability,
                after = ?after,
                "[qg-01] Parallel entry timed out"
            ),
            other => debug!(
                router = %entry.backend.name(),
                op = %capability,
                error = %other,
                ignored = entry.ignore_error_on_search,
                "[qg-01] Parallel entry failed"
            ),
        }
        if !entry.ignore_error_on_search {
            errors.push(error);
        }
    }
}

/// Run one entry's future after its delay, under its timeout and the token.
async fn run_entry<T>(
    token: CancellationToken,
    delay: Duration,
    limit: Option<Duration>,
    fut: impl Future<Output = Result<T, RoutingError>>,
) -> Result<T, RoutingError> {
    if !delay.is_zero() {
        tokio::select! {
            _ = token.cancelled() => return Err(RoutingError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
    }

    let bounded = async {
        match limit {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .unwrap_or(Err(RoutingError::Timeout(limit))),
            None => fut.await,
        }
    };

    tokio::select! {
        biased;
        _ = token.cancelled() => Err(RoutingError::Cancelled),
        result = bounded => result,
    }
}

/// Pick the most informative error from the non-ignored failures.
pub fn aggregate(errors: Vec<RoutingError>) -> RoutingError {
    errors
        .into_iter()
        .find(|e| !e.is_not_found_like())
        .unwrap_or(RoutingError::NotFound)
}

type SearchItem = (usize, Result<Vec<u8>, RoutingError>);

#[async_trait]
impl ValueStore for ParallelRouter {
    async fn get_value(&self, ctx: &CancellationToken, key: &[u8]) -> Result<Vec<u8>, RoutingError> {
        let key: Arc<[u8]> = Arc::from(key);
        self.first_hit(ctx, Capability::ValueGet, move |backend, token| {
            let key = key.clone();
            async move { backend.get_value(&token, &key).await }
        })
        .await
    }

    async fn search_value(&self, ctx: &CancellationToken, key: &[u8]) -> Result<ValueStream, RoutingError> {
        let key: Arc<[u8]> = Arc::from(key);
        let mut relay: Relay<SearchItem> = Relay::new(ctx);

        for (index, entry) in self.entries.iter().enumerate() {
            if !entry.backend.supports(Capability::ValueSearch) {
                continue;
            }
            let backend = entry.backend.clone();
            let key = key.clone();
            let (delay, limit, first_only) =
                (entry.execute_after, entry.timeout, entry.wait_for_first_hit_only);

            relay.spawn(move |tx, token| async move {
                let deadline = limit.and_then(|limit| deadline_after(delay.saturating_add(limit)));
                let opened = run_entry(token.clone(), delay, limit, async {
                    backend.search_value(&token, &key).await
                })
                .await;

                let mut values = match opened {
                    Ok(values) => values,
                    Err(e) => {
                        let _ = tx.send((index, Err(e))).await;
                        return;
                    }
                };

                let expired = expires_at(deadline);
                tokio::pin!(expired);

                let mut sent = 0usize;
                loop {
                    let next = tokio::select! {
                        biased;
                        _ = token.cancelled() => None,
                        _ = &mut expired => None,
                        value = values.next() => value,
                    };
                    let Some(value) = next else { break };
                    if tx.send((index, Ok(value))).await.is_err() {
                        return;
                    }
                    sent += 1;
                    if first_only {
                        return;
                    }
                }
                if sent == 0 {
                    let error = match deadline {
                        Some(at) if tokio::time::Instant::now() >= at => {
                            RoutingError::Timeout(limit.unwrap_or_default())
                        }
                        _ => RoutingError::NotFound,
                    };
                    let _ = tx.send((index, Err(error))).await;
                }
            });
        }

        let mut merged = relay.into_stream();
        let mut errors = Vec::new();
        let first = loop {
            match merged.next().await {
                Some((_, Ok(value))) => break value,
                Some((index, Err(e))) => self.record_failure(index, Capability::ValueSearch, e, &mut errors),
                None if ctx.is_cancelled() => return Err(RoutingError::Cancelled),
                None => return Err(aggregate(errors)),
            }
        };

        let rest = merged.filter_map(|(_, result)| future::ready(result.ok()));
        Ok(stream::once(future::ready(first)).chain(rest).boxed())
    }
}

#[async_trait]
impl ValuePublisher for ParallelRouter {
    async fn put_value(&self, ctx: &CancellationToken, key: &[u8], value: Vec<u8>) -> Result<(), RoutingError> {
        match self.primary() {
            Some(entry) => entry.backend.put_value(ctx, key, value).await,
            None => Err(RoutingError::Unsupported(Capability::ValuePut)),
        }
    }
}

#[async_trait]
impl PeerRouting for ParallelRouter {
    async fn find_peer(&self, ctx: &CancellationToken, peer: &PeerId) -> Result<AddrInfo, RoutingError> {
        let peer = peer.clone();
        self.first_hit(ctx, Capability::PeerFind, move |backend, token| {
            let peer = peer.clone();
            async move { backend.find_peer(&token, &peer).await }
        })
        .await
    }
}

impl ContentDiscovery for ParallelRouter {
    fn find_providers(&self, ctx: &CancellationToken, key: &ContentId, limit: usize) -> ProviderStream {
        let mut relay = Relay::new(ctx);
        for entry in self.entries.iter() {
            if !entry.backend.supports(Capability::ProviderFind) {
                continue;
            }
            let backend = entry.backend.clone();
            let key = key.clone();
            relay.forward(entry.execute_after, entry.timeout, move |token| {
                backend.find_providers(token, &key, limit)
            });
        }

        let merged = relay.into_stream();
        if limit > 0 {
            merged.take(limit).boxed()
        } else {
            merged.boxed()
        }
    }
}

#[async_trait]
impl ContentAnnouncer for ParallelRouter {
    async fn provide(&self, ctx: &CancellationToken, key: &ContentId, announce: bool) -> Result<(), RoutingError> {
        match self.primary() {
            Some(entry) => entry.backend.provide(ctx, key, announce).await,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ProvideMany for ParallelRouter {
    async fn provide_many(&self, ctx: &CancellationToken, keys: &[ContentId]) -> Result<(), RoutingError> {
        match self.primary() {
            Some(entry) => entry.backend.provide_many(ctx, keys).await,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Bootstrap for ParallelRouter {
    async fn bootstrap(&self, ctx: &CancellationToken) -> Result<(), RoutingError> {
        let runs = self
            .entries
            .iter()
            .filter(|entry| entry.backend.supports(Capability::Bootstrap))
            .map(|entry| async move {
                let result = entry.backend.bootstrap(ctx).await;
                if let Err(e) = &result {
                    warn!(router = %entry.backend.name(), error = %e, "[qg-01] Bootstrap failed");
                }
                result
            });

        let errors: Vec<RoutingError> = join_all(runs)
            .await
            .into_iter()
            .filter_map(Result::err)
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(RoutingError::Multiple(errors))
        }
    }
}

impl ReadinessCheck for ParallelRouter {
    fn ready(&self) -> bool {
        self.entries
            .iter()
            .all(|entry| entry.backend.ready().unwrap_or(true))
    }
}
