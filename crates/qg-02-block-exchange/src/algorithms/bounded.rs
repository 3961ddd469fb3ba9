//! # Bounded Block Exchange
//!
//! Wraps the block exchange client so that one slow block can never stall a
//! request indefinitely:
//!
//! - a single fetch runs under its own per-block deadline and fails alone;
//! - a batch fetch yields locally held blocks first, then network blocks
//!   through a `DeadlineStream`, ending silently after one stalled gap.
//!
//! Fetched blocks are written to the local store. New blocks are not
//! announced to the client's own want bookkeeping; only the shared-cache
//! server, when present, is notified so it can serve peered peers.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use shared_types::{Block, ContentId};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::deadline_stream::DeadlineStream;
use super::server::SharedCacheServer;
use crate::domain::{ExchangeConfig, ExchangeError};
use crate::ports::{BlockNetwork, BlockStore, BlockStream, ExchangeApi};

#[derive(Clone)]
pub struct BoundedExchange {
    store: Arc<dyn BlockStore>,
    network: Arc<dyn BlockNetwork>,
    config: ExchangeConfig,
    server: Option<Arc<SharedCacheServer>>,
}

impl BoundedExchange {
    pub fn new(store: Arc<dyn BlockStore>, network: Arc<dyn BlockNetwork>, config: ExchangeConfig) -> Self {
        Self {
            store,
            network,
            config,
            server: None,
        }
    }

    /// Notify `server` of new blocks.
    #[must_use]
    pub fn with_server(mut self, server: Arc<SharedCacheServer>) -> Self {
        self.server = Some(server);
        self
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    pub fn server(&self) -> Option<&Arc<SharedCacheServer>> {
        self.server.as_ref()
    }

    async fn local(&self, cid: &ContentId) -> Result<Option<Block>, ExchangeError> {
        if !self.store.has(cid).await? {
            return Ok(None);
        }
        let data = self.store.get(cid).await?;
        Ok(Some(Block::new(cid.clone(), data)))
    }

    async fn keep(&self, block: &Block) {
        if let Err(e) = self.store.put(block.clone()).await {
            warn!(cid = %block.cid, error = %e, "[qg-02] Failed to store fetched block");
            return;
        }
        if let Some(server) = &self.server {
            server.notify_new_blocks(std::slice::from_ref(block)).await;
        }
    }
}

#[async_trait]
impl ExchangeApi for BoundedExchange {
    async fn get_block(&self, ctx: &CancellationToken, cid: &ContentId) -> Result<Block, ExchangeError> {
        if let Some(block) = self.local(cid).await? {
            return Ok(block);
        }

        let deadline = self.config.per_block_timeout;
        let fetch_ctx = ctx.child_token();
        let _guard = fetch_ctx.clone().drop_guard();

        let fetched = tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(ExchangeError::Cancelled),
            result = tokio::time::timeout(deadline, self.network.fetch_block(&fetch_ctx, cid)) => result,
        };

        match fetched {
            Ok(Ok(block)) => {
                self.keep(&block).await;
                Ok(block)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                debug!(cid = %cid, after = ?deadline, "[qg-02] Block fetch timed out");
                Err(ExchangeError::Timeout(deadline))
            }
        }
    }

    fn get_blocks(&self, ctx: &CancellationToken, cids: Vec<ContentId>) -> BlockStream {
        let exchange = self.clone();
        let ctx = ctx.clone();

        let split = async move {
            let mut local = Vec::new();
            let mut missing = Vec::new();
            for cid in cids {
                match exchange.local(&cid).await {
                    Ok(Some(block)) => local.push(block),
                    Ok(None) => missing.push(cid),
                    Err(e) => {
                        debug!(cid = %cid, error = %e, "[qg-02] Store lookup failed, fetching from network");
                        missing.push(cid);
                    }
                }
            }

            let remote = if missing.is_empty() || ctx.is_cancelled() {
                stream::empty().boxed()
            } else {
                let fetch_ctx = ctx.child_token();
                let source = exchange.network.fetch_blocks(&fetch_ctx, missing);
                let keeper = exchange.clone();
                DeadlineStream::new(source, exchange.config.per_block_timeout, fetch_ctx)
                    .then(move |block| {
                        let keeper = keeper.clone();
                        async move {
                            keeper.keep(&block).await;
                            block
                        }
                    })
                    .boxed()
            };

            let cancelled = ctx.clone();
            stream::iter(local)
                .chain(remote)
                .take_until(async move { cancelled.cancelled().await })
        };

        stream::once(split).flatten().boxed()
    }

    async fn notify_new_blocks(&self, _ctx: &CancellationToken, blocks: &[Block]) -> Result<(), ExchangeError> {
        match &self.server {
            Some(server) => {
                server.notify_new_blocks(blocks).await;
                Ok(())
            }
            None => Ok(()),
        }
    }
}
