//! # Bounded Provider Query Manager
//!
//! Wraps provider discovery with three optional caps (zero = unlimited):
//! concurrent in-flight queries across all callers, provider records per
//! query, and wall-clock time per query. Denied peers and duplicates are
//! dropped before the record cap is applied.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::StreamExt;
use shared_types::{AddrInfo, ContentId, PeerId};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, Instrument};
use uuid::Uuid;

use super::relay::{deadline_after, expires_at, Relay};
use crate::domain::{Capability, ProviderQueryLimits};
use crate::ports::{ContentDiscovery, ProviderStream, RoutingBackend};

pub struct ProviderQueryManager {
    inner: RoutingBackend,
    limits: ProviderQueryLimits,
    in_flight: Option<Arc<Semaphore>>,
    deny: Arc<HashSet<PeerId>>,
}

impl ProviderQueryManager {
    pub fn new(inner: RoutingBackend, limits: ProviderQueryLimits) -> Self {
        let in_flight = (limits.max_in_flight > 0).then(|| Arc::new(Semaphore::new(limits.max_in_flight)));
        Self {
            inner,
            limits,
            in_flight,
            deny: Arc::new(HashSet::new()),
        }
    }

    /// Providers never returned to callers.
    #[must_use]
    pub fn with_denied(mut self, peers: impl IntoIterator<Item = PeerId>) -> Self {
        self.deny = Arc::new(peers.into_iter().collect());
        self
    }

    pub fn limits(&self) -> &ProviderQueryLimits {
        &self.limits
    }

    /// Queries currently holding an in-flight slot.
    pub fn in_flight(&self) -> usize {
        self.in_flight
            .as_ref()
            .map(|sem| self.limits.max_in_flight - sem.available_permits())
            .unwrap_or(0)
    }
}

impl ContentDiscovery for ProviderQueryManager {
    fn find_providers(&self, ctx: &CancellationToken, key: &ContentId, limit: usize) -> ProviderStream {
        if !self.inner.supports(Capability::ProviderFind) {
            return Box::pin(futures::stream::empty());
        }

        let cap = self.limits.effective_cap(limit);
        let deadline = self.limits.query_deadline().and_then(deadline_after);
        let inner = self.inner.clone();
        let semaphore = self.in_flight.clone();
        let deny = self.deny.clone();
        let key = key.clone();
        let span = info_span!("provider_query", query_id = %Uuid::new_v4(), cid = %key, cap);

        let mut relay: Relay<AddrInfo> = Relay::new(ctx);
        relay.spawn(move |tx, token| {
            async move {
                let expired = expires_at(deadline);
                tokio::pin!(expired);

                let _permit = match semaphore {
                    Some(semaphore) => tokio::select! {
                        biased;
                        _ = token.cancelled() => return,
                        _ = &mut expired => {
                            debug!("[qg-01] Provider query expired waiting for a slot");
                            return;
                        }
                        permit = semaphore.acquire_owned() => match permit {
                            Ok(permit) => Some(permit),
                            Err(_) => return,
                        },
                    },
                    None => None,
                };

                let mut source = inner.find_providers(&token, &key, 0);
                let mut seen = HashSet::new();
                let mut sent = 0usize;
                loop {
                    let next = tokio::select! {
                        biased;
                        _ = token.cancelled() => None,
                        _ = &mut expired => {
                            debug!(sent, "[qg-01] Provider query hit its time limit");
                            None
                        }
                        provider = source.next() => provider,
                    };
                    let Some(provider) = next else { break };

                    if deny.contains(&provider.id) || !seen.insert(provider.id.clone()) {
                        continue;
                    }
                    if tx.send(provider).await.is_err() {
                        break;
                    }
                    sent += 1;
                    if cap > 0 && sent >= cap {
                        break;
                    }
                }
                debug!(sent, "[qg-01] Provider query finished");
            }
            .instrument(span)
        });

        relay.into_stream().boxed()
    }
}
