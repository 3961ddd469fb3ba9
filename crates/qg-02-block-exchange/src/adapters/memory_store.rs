//! In-memory block store.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use shared_types::{Block, ContentId, StorageError};

use crate::ports::BlockStore;

/// Block store held in process memory.
#[derive(Default)]
pub struct MemoryBlockStore {
    blocks: RwLock<HashMap<ContentId, Bytes>>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.read().is_empty()
    }

    /// Total payload bytes held.
    pub fn total_size(&self) -> usize {
        self.blocks.read().values().map(Bytes::len).sum()
    }
}

#[async_trait]
impl BlockStore for MemoryBlockStore {
    async fn has(&self, cid: &ContentId) -> Result<bool, StorageError> {
        Ok(self.blocks.read().contains_key(cid))
    }

    async fn get(&self, cid: &ContentId) -> Result<Bytes, StorageError> {
        self.blocks
            .read()
            .get(cid)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(cid.to_string()))
    }

    async fn put(&self, block: Block) -> Result<(), StorageError> {
        self.blocks.write().insert(block.cid, block.data);
        Ok(())
    }

    async fn delete(&self, cid: &ContentId) -> Result<(), StorageError> {
        self.blocks.write().remove(cid);
        Ok(())
    }

    async fn size(&self, cid: &ContentId) -> Result<usize, StorageError> {
        self.blocks
            .read()
            .get(cid)
            .map(Bytes::len)
            .ok_or_else(|| StorageError::NotFound(cid.to_string()))
    }
}
