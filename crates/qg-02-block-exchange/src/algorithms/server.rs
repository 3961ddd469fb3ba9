//! # Shared-Cache Server Responder
//!
//! Serves the local block store to peers in the `PeeringSet` and to nobody
//! else. Requests from other peers get no response and leave no state.
//!
//! ## Response rules
//!
//! | Want | Block held | Response |
//! |------|-----------|----------|
//! | any | no | silence (remembered in the peer's ledger) |
//! | block | yes | the block |
//! | have | yes, size <= replace threshold | the block |
//! | have | yes, larger | "have" |
//!
//! Wants for blocks not held yet are answered from `notify_new_blocks`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{Block, ContentId, PeerId};
use tracing::{debug, trace, warn};

use crate::domain::{ExchangeConfig, ExchangeError, PeeringSet, ServerMessage, Want, WantType};
use crate::ports::{BlockStore, PeerSender, WantHandler};

pub struct SharedCacheServer {
    peering: PeeringSet,
    store: Arc<dyn BlockStore>,
    sender: Arc<dyn PeerSender>,
    config: ExchangeConfig,
    /// Outstanding wants of peered peers only.
    ledger: RwLock<HashMap<PeerId, HashMap<ContentId, WantType>>>,
}

impl SharedCacheServer {
    pub fn new(
        peering: PeeringSet,
        store: Arc<dyn BlockStore>,
        sender: Arc<dyn PeerSender>,
        config: ExchangeConfig,
    ) -> Self {
        Self {
            peering,
            store,
            sender,
            config,
            ledger: RwLock::new(HashMap::new()),
        }
    }

    pub fn peering(&self) -> &PeeringSet {
        &self.peering
    }

    /// Wants remembered for `peer`.
    pub fn ledger_len(&self, peer: &PeerId) -> usize {
        self.ledger.read().get(peer).map_or(0, HashMap::len)
    }

    /// Number of peers with outstanding wants.
    pub fn ledger_peers(&self) -> usize {
        self.ledger.read().len()
    }

    /// Answer `want` from the store, or `None` when the block is not held.
    async fn answer(&self, cid: &ContentId, want_type: WantType) -> Result<Option<ServerMessage>, ExchangeError> {
        if !self.store.has(cid).await? {
            return Ok(None);
        }
        let message = match want_type {
            WantType::Block => ServerMessage::Block(Block::new(cid.clone(), self.store.get(cid).await?)),
            WantType::Have => {
                let size = self.store.size(cid).await?;
                if self.config.replaces_have(size) {
                    ServerMessage::Block(Block::new(cid.clone(), self.store.get(cid).await?))
                } else {
                    ServerMessage::Have(cid.clone())
                }
            }
        };
        Ok(Some(message))
    }

    fn remember(&self, peer: &PeerId, want: Want) {
        let mut ledger = self.ledger.write();
        let wants = ledger.entry(peer.clone()).or_default();
        if wants.len() >= self.config.max_ledger_wants && !wants.contains_key(&want.cid) {
            debug!(peer = %peer, cid = %want.cid, "[qg-02] Ledger full, dropping want");
            return;
        }
        // A block want supersedes a have want for the same block.
        let entry = wants.entry(want.cid).or_insert(want.want_type);
        if want.want_type == WantType::Block {
            *entry = WantType::Block;
        }
    }

    async fn deliver(&self, peer: &PeerId, message: ServerMessage) {
        if let Err(e) = self.sender.send(peer, message).await {
            warn!(peer = %peer, error = %e, "[qg-02] Failed to send to peer");
        }
    }

    /// Push newly added blocks to peered peers that asked for them.
    pub async fn notify_new_blocks(&self, blocks: &[Block]) {
        let mut due: Vec<(PeerId, ServerMessage)> = Vec::new();
        {
            let mut ledger = self.ledger.write();
            for (peer, wants) in ledger.iter_mut() {
                for block in blocks {
                    let Some(want_type) = wants.remove(&block.cid) else {
                        continue;
                    };
                    let message = match want_type {
                        WantType::Have if !self.config.replaces_have(block.size()) => {
                            ServerMessage::Have(block.cid.clone())
                        }
                        _ => ServerMessage::Block(block.clone()),
                    };
                    due.push((peer.clone(), message));
                }
            }
            ledger.retain(|_, wants| !wants.is_empty());
        }

        for (peer, message) in due {
            self.deliver(&peer, message).await;
        }
    }
}

#[async_trait]
impl WantHandler for SharedCacheServer {
    async fn handle_wants(&self, from: &PeerId, wants: Vec<Want>) {
        if !self.peering.contains(from) {
            trace!(peer = %from, wants = wants.len(), "[qg-02] Ignoring wants from non-peered peer");
            return;
        }

        for want in wants {
            match self.answer(&want.cid, want.want_type).await {
                Ok(Some(message)) => self.deliver(from, message).await,
                Ok(None) => self.remember(from, want),
                Err(e) => debug!(peer = %from, cid = %want.cid, error = %e, "[qg-02] Store lookup failed"),
            }
        }
    }

    fn cancel_wants(&self, peer: &PeerId) {
        self.ledger.write().remove(peer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryBlockStore;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<(PeerId, ServerMessage)>>,
    }

    impl RecordingSender {
        fn take(&self) -> Vec<(PeerId, ServerMessage)> {
            std::mem::take(&mut *self.sent.lock())
        }
    }

    #[async_trait]
    impl PeerSender for RecordingSender {
        async fn send(&self, to: &PeerId, message: ServerMessage) -> Result<(), ExchangeError> {
            self.sent.lock().push((to.clone(), message));
            Ok(())
        }
    }

    fn peer(name: &str) -> PeerId {
        name.parse().unwrap()
    }

    fn setup(replace_size: usize) -> (Arc<MemoryBlockStore>, Arc<RecordingSender>, SharedCacheServer) {
        let store = Arc::new(MemoryBlockStore::new());
        let sender = Arc::new(RecordingSender::default());
        let config = ExchangeConfig {
            want_have_replace_size: replace_size,
            shared_cache: true,
            ..Default::default()
        };
        let server = SharedCacheServer::new(
            PeeringSet::new(vec![peer("12D3KooWFriend")]),
            store.clone(),
            sender.clone(),
            config,
        );
        (store, sender, server)
    }

    #[tokio::test]
    async fn test_non_peered_requests_get_silence_and_no_state() {
        let (store, sender, server) = setup(0);
        let block = Block::raw(&b"cached"[..]).unwrap();
        store.put(block.clone()).await.unwrap();

        server
            .handle_wants(&peer("12D3KooWStranger"), vec![Want::block(block.cid.clone())])
            .await;
        server
            .handle_wants(&peer("12D3KooWStranger"), vec![Want::have(ContentId::raw(b"missing").unwrap())])
            .await;

        assert!(sender.take().is_empty());
        assert_eq!(server.ledger_peers(), 0);
    }

    #[tokio::test]
    async fn test_peered_block_want_is_served() {
        let (store, sender, server) = setup(0);
        let block = Block::raw(&b"cached"[..]).unwrap();
        store.put(block.clone()).await.unwrap();

        server
            .handle_wants(&peer("12D3KooWFriend"), vec![Want::block(block.cid.clone())])
            .await;

        assert_eq!(sender.take(), vec![(peer("12D3KooWFriend"), ServerMessage::Block(block))]);
    }

    #[tokio::test]
    async fn test_missing_block_is_never_answered_with_dont_have() {
        let (_store, sender, server) = setup(1024);
        let missing = ContentId::raw(b"missing").unwrap();

        server
            .handle_wants(&peer("12D3KooWFriend"), vec![Want::have(missing)])
            .await;

        assert!(sender.take().is_empty());
        assert_eq!(server.ledger_len(&peer("12D3KooWFriend")), 1);
    }

    #[tokio::test]
    async fn test_want_have_replacement_threshold() {
        let (store, sender, server) = setup(8);
        let small = Block::raw(&b"tiny"[..]).unwrap();
        let large = Block::raw(&b"definitely larger than eight"[..]).unwrap();
        store.put(small.clone()).await.unwrap();
        store.put(large.clone()).await.unwrap();

        server
            .handle_wants(
                &peer("12D3KooWFriend"),
                vec![Want::have(small.cid.clone()), Want::have(large.cid.clone())],
            )
            .await;

        let sent: Vec<ServerMessage> = sender.take().into_iter().map(|(_, m)| m).collect();
        assert_eq!(sent, vec![ServerMessage::Block(small), ServerMessage::Have(large.cid)]);
    }

    #[tokio::test]
    async fn test_replacement_disabled_at_zero() {
        let (store, sender, server) = setup(0);
        let small = Block::raw(&b"tiny"[..]).unwrap();
        store.put(small.clone()).await.unwrap();

        server
            .handle_wants(&peer("12D3KooWFriend"), vec![Want::have(small.cid.clone())])
            .await;

        let sent: Vec<ServerMessage> = sender.take().into_iter().map(|(_, m)| m).collect();
        assert_eq!(sent, vec![ServerMessage::Have(small.cid)]);
    }

    #[tokio::test]
    async fn test_notify_pushes_remembered_wants() {
        let (store, sender, server) = setup(0);
        let block = Block::raw(&b"later"[..]).unwrap();

        server
            .handle_wants(&peer("12D3KooWFriend"), vec![Want::block(block.cid.clone())])
            .await;
        assert!(sender.take().is_empty());

        store.put(block.clone()).await.unwrap();
        server.notify_new_blocks(std::slice::from_ref(&block)).await;

        assert_eq!(sender.take(), vec![(peer("12D3KooWFriend"), ServerMessage::Block(block))]);
        assert_eq!(server.ledger_peers(), 0);
    }

    #[tokio::test]
    async fn test_cancel_wants_clears_ledger() {
        let (_store, sender, server) = setup(0);
        let block = Block::raw(&b"never"[..]).unwrap();

        server
            .handle_wants(&peer("12D3KooWFriend"), vec![Want::block(block.cid.clone())])
            .await;
        server.cancel_wants(&peer("12D3KooWFriend"));
        server.notify_new_blocks(&[block]).await;

        assert!(sender.take().is_empty());
    }

    #[tokio::test]
    async fn test_ledger_is_bounded() {
        let store = Arc::new(MemoryBlockStore::new());
        let sender = Arc::new(RecordingSender::default());
        let config = ExchangeConfig {
            shared_cache: true,
            max_ledger_wants: 2,
            ..Default::default()
        };
        let server = SharedCacheServer::new(PeeringSet::new(vec![peer("12D3KooWFriend")]), store, sender, config);

        let wants = (0u8..5)
            .map(|i| Want::block(ContentId::raw(&[i]).unwrap()))
            .collect();
        server.handle_wants(&peer("12D3KooWFriend"), wants).await;

        assert_eq!(server.ledger_len(&peer("12D3KooWFriend")), 2);
    }
}
