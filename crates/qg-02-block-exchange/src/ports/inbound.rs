//! # Inbound Ports (API)

use async_trait::async_trait;
use shared_types::{Block, ContentId, PeerId};
use tokio_util::sync::CancellationToken;

use super::outbound::BlockStream;
use crate::domain::{ExchangeError, Want};

/// Block fetching as seen by the gateway.
#[async_trait]
pub trait ExchangeApi: Send + Sync {
    /// Fetch one block under a fresh per-block deadline.
    async fn get_block(&self, ctx: &CancellationToken, cid: &ContentId) -> Result<Block, ExchangeError>;

    /// Fetch many blocks. The stream ends early and silently when the gap
    /// between two blocks exceeds the per-block deadline.
    fn get_blocks(&self, ctx: &CancellationToken, cids: Vec<ContentId>) -> BlockStream;

    /// Announce blocks added locally.
    async fn notify_new_blocks(&self, ctx: &CancellationToken, blocks: &[Block]) -> Result<(), ExchangeError>;
}

/// Entry point for want-lists arriving from remote peers.
#[async_trait]
pub trait WantHandler: Send + Sync {
    async fn handle_wants(&self, from: &PeerId, wants: Vec<Want>);

    /// Forget everything `peer` asked for (disconnect).
    fn cancel_wants(&self, peer: &PeerId);
}
