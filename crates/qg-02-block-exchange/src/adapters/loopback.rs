//! In-process block exchange network.
//!
//! Nodes join a shared `LoopbackNetwork` and get a `LoopbackEndpoint`,
//! which is both their exchange client (`BlockNetwork`) and the sender
//! their server responder answers through (`PeerSender`). A client sends
//! block wants to every node with a mounted responder and waits for blocks
//! on its own inbox. Silent peers keep the fetch open; bounding it is left
//! to the caller.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::RwLock;
use shared_types::{ContentId, PeerId};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::domain::{ExchangeError, ServerMessage, Want};
use crate::ports::{BlockNetwork, BlockStream, PeerSender, WantHandler};

const INBOX_CAPACITY: usize = 256;

/// A message as it arrives at a node.
#[derive(Clone, Debug)]
pub struct Delivery {
    pub from: PeerId,
    pub message: ServerMessage,
}

struct Node {
    inbox: broadcast::Sender<Delivery>,
    responder: Option<Arc<dyn WantHandler>>,
}

#[derive(Default)]
pub struct LoopbackNetwork {
    nodes: RwLock<HashMap<PeerId, Node>>,
}

impl LoopbackNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Connect `peer`, replacing any earlier node with the same identity.
    pub fn join(self: &Arc<Self>, peer: PeerId) -> LoopbackEndpoint {
        let (inbox, _) = broadcast::channel(INBOX_CAPACITY);
        self.nodes.write().insert(
            peer.clone(),
            Node {
                inbox,
                responder: None,
            },
        );
        LoopbackEndpoint {
            local: peer,
            network: self.clone(),
        }
    }

    /// Let `peer` answer wants from other nodes.
    pub fn mount(&self, peer: &PeerId, responder: Arc<dyn WantHandler>) {
        if let Some(node) = self.nodes.write().get_mut(peer) {
            node.responder = Some(responder);
        }
    }

    /// Disconnect `peer`; remaining responders forget its wants.
    pub fn leave(&self, peer: &PeerId) {
        let responders: Vec<Arc<dyn WantHandler>> = {
            let mut nodes = self.nodes.write();
            nodes.remove(peer);
            nodes.values().filter_map(|node| node.responder.clone()).collect()
        };
        for responder in responders {
            responder.cancel_wants(peer);
        }
    }

    pub fn peers(&self) -> Vec<PeerId> {
        self.nodes.read().keys().cloned().collect()
    }

    fn subscribe(&self, peer: &PeerId) -> Option<broadcast::Receiver<Delivery>> {
        self.nodes.read().get(peer).map(|node| node.inbox.subscribe())
    }

    fn responder(&self, peer: &PeerId) -> Option<Arc<dyn WantHandler>> {
        self.nodes.read().get(peer).and_then(|node| node.responder.clone())
    }

    fn responders_except(&self, peer: &PeerId) -> Vec<(PeerId, Arc<dyn WantHandler>)> {
        self.nodes
            .read()
            .iter()
            .filter(|(id, _)| *id != peer)
            .filter_map(|(id, node)| node.responder.clone().map(|r| (id.clone(), r)))
            .collect()
    }

    fn deliver(&self, from: &PeerId, to: &PeerId, message: ServerMessage) -> Result<(), ExchangeError> {
        let nodes = self.nodes.read();
        let node = nodes
            .get(to)
            .ok_or_else(|| ExchangeError::Network(format!("peer {to} not connected")))?;
        // No receiver means nobody is fetching right now; the message is dropped.
        let _ = node.inbox.send(Delivery {
            from: from.clone(),
            message,
        });
        Ok(())
    }
}

/// One node's view of the loopback network.
#[derive(Clone)]
pub struct LoopbackEndpoint {
    local: PeerId,
    network: Arc<LoopbackNetwork>,
}

impl LoopbackEndpoint {
    pub fn local_peer(&self) -> &PeerId {
        &self.local
    }

    pub fn network(&self) -> &Arc<LoopbackNetwork> {
        &self.network
    }
}

struct FetchState {
    inbox: broadcast::Receiver<Delivery>,
    pending: HashSet<ContentId>,
    local: PeerId,
    network: Arc<LoopbackNetwork>,
    ctx: CancellationToken,
}

#[async_trait]
impl BlockNetwork for LoopbackEndpoint {
    fn fetch_blocks(&self, ctx: &CancellationToken, cids: Vec<ContentId>) -> BlockStream {
        let Some(inbox) = self.network.subscribe(&self.local) else {
            return stream::empty().boxed();
        };
        let remotes = self.network.responders_except(&self.local);
        if remotes.is_empty() || cids.is_empty() {
            return stream::empty().boxed();
        }

        let state = FetchState {
            inbox,
            pending: cids.iter().cloned().collect(),
            local: self.local.clone(),
            network: self.network.clone(),
            ctx: ctx.clone(),
        };
        let wants: Vec<Want> = cids.into_iter().map(Want::block).collect();
        let local = self.local.clone();

        let send_wants = async move {
            for (peer, responder) in &remotes {
                trace!(to = %peer, wants = wants.len(), "[qg-02] Sending wants");
                responder.handle_wants(&local, wants.clone()).await;
            }
            state
        };

        stream::once(send_wants)
            .flat_map(|state| stream::unfold(state, next_block))
            .boxed()
    }
}

async fn next_block(mut state: FetchState) -> Option<(shared_types::Block, FetchState)> {
    loop {
        if state.pending.is_empty() {
            return None;
        }
        let delivery = tokio::select! {
            biased;
            _ = state.ctx.cancelled() => return None,
            received = state.inbox.recv() => received,
        };

        match delivery {
            Ok(Delivery {
                message: ServerMessage::Block(block),
                from,
            }) => {
                if !block.cid.verifies(&block.data) {
                    debug!(from = %from, cid = %block.cid, "[qg-02] Dropping block with bad digest");
                    continue;
                }
                if state.pending.remove(&block.cid) {
                    return Some((block, state));
                }
            }
            Ok(Delivery {
                message: ServerMessage::Have(cid),
                from,
            }) => {
                if !state.pending.contains(&cid) {
                    continue;
                }
                if let Some(responder) = state.network.responder(&from) {
                    responder.handle_wants(&state.local, vec![Want::block(cid)]).await;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                debug!(skipped, "[qg-02] Inbox lagged");
            }
            Err(RecvError::Closed) => return None,
        }
    }
}

#[async_trait]
impl PeerSender for LoopbackEndpoint {
    async fn send(&self, to: &PeerId, message: ServerMessage) -> Result<(), ExchangeError> {
        self.network.deliver(&self.local, to, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryBlockStore;
    use crate::algorithms::SharedCacheServer;
    use crate::domain::{ExchangeConfig, PeeringSet};
    use crate::ports::BlockStore;
    use shared_types::Block;
    use std::time::Duration;

    fn peer(name: &str) -> PeerId {
        name.parse().unwrap()
    }

    #[tokio::test]
    async fn test_fetch_from_peered_responder() {
        let network = LoopbackNetwork::new();
        let server_node = network.join(peer("12D3KooWServer"));
        let client_node = network.join(peer("12D3KooWClient"));

        let store = Arc::new(MemoryBlockStore::new());
        let block = Block::raw(&b"shared"[..]).unwrap();
        store.put(block.clone()).await.unwrap();
        let server = Arc::new(SharedCacheServer::new(
            PeeringSet::new(vec![peer("12D3KooWClient")]),
            store,
            Arc::new(server_node),
            ExchangeConfig::default(),
        ));
        network.mount(&peer("12D3KooWServer"), server);

        let ctx = CancellationToken::new();
        let fetched = client_node.fetch_block(&ctx, &block.cid).await.unwrap();
        assert_eq!(fetched, block);
    }

    #[tokio::test]
    async fn test_no_responders_ends_immediately() {
        let network = LoopbackNetwork::new();
        let alone = network.join(peer("12D3KooWAlone"));
        let ctx = CancellationToken::new();
        let cid = ContentId::raw(b"x").unwrap();

        assert!(matches!(
            alone.fetch_block(&ctx, &cid).await,
            Err(ExchangeError::NotFound(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_responder_keeps_fetch_open_until_cancelled() {
        let network = LoopbackNetwork::new();
        let server_node = network.join(peer("12D3KooWServer"));
        let client_node = network.join(peer("12D3KooWClient"));
        let server = Arc::new(SharedCacheServer::new(
            PeeringSet::new(vec![peer("12D3KooWSomeoneElse")]),
            Arc::new(MemoryBlockStore::new()),
            Arc::new(server_node),
            ExchangeConfig::default(),
        ));
        network.mount(&peer("12D3KooWServer"), server);

        let ctx = CancellationToken::new();
        let cid = ContentId::raw(b"x").unwrap();
        let pending = tokio::time::timeout(Duration::from_secs(5), client_node.fetch_block(&ctx, &cid)).await;
        assert!(pending.is_err());
    }

    #[tokio::test]
    async fn test_leave_cancels_wants() {
        let network = LoopbackNetwork::new();
        let server_node = network.join(peer("12D3KooWServer"));
        let client_node = network.join(peer("12D3KooWClient"));
        let server = Arc::new(SharedCacheServer::new(
            PeeringSet::new(vec![peer("12D3KooWClient")]),
            Arc::new(MemoryBlockStore::new()),
            Arc::new(server_node),
            ExchangeConfig::default(),
        ));
        network.mount(&peer("12D3KooWServer"), server.clone());

        let ctx = CancellationToken::new();
        let cid = ContentId::raw(b"missing").unwrap();
        let mut fetch = client_node.fetch_blocks(&ctx, vec![cid]);
        let _ = tokio::time::timeout(Duration::from_millis(10), fetch.next()).await;
        assert_eq!(server.ledger_len(&peer("12D3KooWClient")), 1);

        network.leave(&peer("12D3KooWClient"));
        assert_eq!(server.ledger_len(&peer("12D3KooWClient")), 0);
    }
}
