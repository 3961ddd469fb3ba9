//! # Domain Entities
//!
//! Want-list entries, server messages and the peering allow-list.

use std::collections::HashSet;
use std::sync::Arc;

use shared_types::{Block, ContentId, PeerId};

/// What a peer asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WantType {
    /// "Do you have it?"
    Have,
    /// "Send it to me."
    Block,
}

/// One want-list entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Want {
    pub cid: ContentId,
    pub want_type: WantType,
}

impl Want {
    pub fn have(cid: ContentId) -> Self {
        Self {
            cid,
            want_type: WantType::Have,
        }
    }

    pub fn block(cid: ContentId) -> Self {
        Self {
            cid,
            want_type: WantType::Block,
        }
    }
}

/// Messages the server responder may send.
///
/// There is no "don't have" variant: a missing block is answered with
/// silence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServerMessage {
    Block(Block),
    Have(ContentId),
}

/// Peers explicitly trusted for cache sharing. Fixed for the process lifetime.
#[derive(Clone, Debug, Default)]
pub struct PeeringSet {
    peers: Arc<HashSet<PeerId>>,
}

impl PeeringSet {
    pub fn new(peers: impl IntoIterator<Item = PeerId>) -> Self {
        Self {
            peers: Arc::new(peers.into_iter().collect()),
        }
    }

    pub fn contains(&self, peer: &PeerId) -> bool {
        self.peers.contains(peer)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PeerId> {
        self.peers.iter()
    }
}
