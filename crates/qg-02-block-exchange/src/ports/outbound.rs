//! # Outbound Ports (SPI)
//!
//! What the exchange needs from its surroundings: a local block store, the
//! underlying peer-to-peer exchange client and a way to message peers.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use shared_types::{Block, ContentId, PeerId, StorageError};
use tokio_util::sync::CancellationToken;

use crate::domain::{ExchangeError, ServerMessage};

/// Blocks delivered lazily, in arrival order.
pub type BlockStream = BoxStream<'static, Block>;

/// Local block store. Implemented outside this crate in production.
#[async_trait]
pub trait BlockStore: Send + Sync {
    async fn has(&self, cid: &ContentId) -> Result<bool, StorageError>;

    /// Fails with `StorageError::NotFound` when absent.
    async fn get(&self, cid: &ContentId) -> Result<Bytes, StorageError>;

    async fn put(&self, block: Block) -> Result<(), StorageError>;

    async fn delete(&self, cid: &ContentId) -> Result<(), StorageError>;

    /// Payload size in bytes.
    async fn size(&self, cid: &ContentId) -> Result<usize, StorageError>;
}

/// The underlying block exchange client.
///
/// Streams must end once `ctx` is cancelled. A stream may stay open
/// indefinitely while peers stay silent; bounding it is the caller's job.
#[async_trait]
pub trait BlockNetwork: Send + Sync {
    fn fetch_blocks(&self, ctx: &CancellationToken, cids: Vec<ContentId>) -> BlockStream;

    /// Fetch one block.
    async fn fetch_block(&self, ctx: &CancellationToken, cid: &ContentId) -> Result<Block, ExchangeError> {
        self.fetch_blocks(ctx, vec![cid.clone()])
            .next()
            .await
            .ok_or_else(|| ExchangeError::NotFound(cid.clone()))
    }
}

/// Delivers server responses to remote peers.
#[async_trait]
pub trait PeerSender: Send + Sync {
    async fn send(&self, to: &PeerId, message: ServerMessage) -> Result<(), ExchangeError>;
}
