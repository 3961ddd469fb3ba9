//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Content**: `ContentId`, `Block`
//! - **Networking**: `PeerId`, `AddrInfo`

use bytes::Bytes;
use cid::multihash::Multihash;
use cid::Cid;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::errors::IdentifierError;

/// Multicodec for raw binary blocks.
pub const CODEC_RAW: u64 = 0x55;
/// Multicodec for dag-pb (UnixFS) blocks.
pub const CODEC_DAG_PB: u64 = 0x70;
/// Multicodec for dag-cbor blocks.
pub const CODEC_DAG_CBOR: u64 = 0x71;
/// Multicodec for libp2p public keys (IPNS names).
pub const CODEC_LIBP2P_KEY: u64 = 0x72;
/// Multihash code for SHA2-256.
pub const MULTIHASH_SHA2_256: u64 = 0x12;

// =============================================================================
// CLUSTER A: CONTENT
// =============================================================================

/// An immutable, content-derived identifier (hash + codec tag).
///
/// Equality is value equality over the full CID bytes, so a CIDv0 and the
/// equivalent CIDv1 are distinct keys.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentId(Cid);

impl ContentId {
    /// Wrap an already-parsed CID.
    pub fn new(cid: Cid) -> Self {
        Self(cid)
    }

    /// Build a CIDv1 by hashing `data` with SHA2-256 under `codec`.
    pub fn from_data(codec: u64, data: &[u8]) -> Result<Self, IdentifierError> {
        let digest = Sha256::digest(data);
        let hash = Multihash::<64>::wrap(MULTIHASH_SHA2_256, &digest)
            .map_err(|e| IdentifierError::InvalidDigest(e.to_string()))?;
        Ok(Self(Cid::new_v1(codec, hash)))
    }

    /// Raw-codec CID for `data`.
    pub fn raw(data: &[u8]) -> Result<Self, IdentifierError> {
        Self::from_data(CODEC_RAW, data)
    }

    /// Codec tag.
    pub fn codec(&self) -> u64 {
        self.0.codec()
    }

    /// Multihash digest bytes (without the multihash prefix).
    pub fn digest(&self) -> &[u8] {
        self.0.hash().digest()
    }

    /// Binary CID encoding.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes()
    }

    /// Borrow the inner CID.
    pub fn as_cid(&self) -> &Cid {
        &self.0
    }

    /// Whether `data` hashes to this identifier's SHA2-256 digest.
    ///
    /// Identifiers using another hash function never verify.
    pub fn verifies(&self, data: &[u8]) -> bool {
        self.0.hash().code() == MULTIHASH_SHA2_256 && Sha256::digest(data).as_slice() == self.digest()
    }
}

impl FromStr for ContentId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Cid::try_from(s)
            .map(Self)
            .map_err(|e| IdentifierError::InvalidContentId {
                input: s.to_string(),
                reason: e.to_string(),
            })
    }
}

impl TryFrom<String> for ContentId {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ContentId> for String {
    fn from(id: ContentId) -> Self {
        id.0.to_string()
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self.0)
    }
}

/// A block of content-addressed data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    /// Identifier the data was requested under.
    pub cid: ContentId,
    /// Raw block bytes.
    pub data: Bytes,
}

impl Block {
    /// Pair data with its identifier.
    pub fn new(cid: ContentId, data: impl Into<Bytes>) -> Self {
        Self {
            cid,
            data: data.into(),
        }
    }

    /// Hash `data` as a raw block.
    pub fn raw(data: impl Into<Bytes>) -> Result<Self, IdentifierError> {
        let data = data.into();
        let cid = ContentId::raw(&data)?;
        Ok(Self { cid, data })
    }

    /// Size of the payload in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

// =============================================================================
// CLUSTER B: NETWORKING
// =============================================================================

/// Opaque identity of a network peer.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PeerId(String);

impl PeerId {
    /// Textual form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PeerId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(IdentifierError::EmptyPeerId);
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl TryFrom<String> for PeerId {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PeerId> for String {
    fn from(id: PeerId) -> Self {
        id.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({})", self.0)
    }
}

/// A peer together with the addresses it can be dialed on.
///
/// Returned by provider lookups and peer lookups alike.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddrInfo {
    /// Peer identity.
    pub id: PeerId,
    /// Multiaddr strings.
    #[serde(default)]
    pub addrs: Vec<String>,
}

impl AddrInfo {
    /// Record with no known addresses.
    pub fn new(id: PeerId) -> Self {
        Self {
            id,
            addrs: Vec::new(),
        }
    }

    /// Attach addresses.
    pub fn with_addrs(mut self, addrs: Vec<String>) -> Self {
        self.addrs = addrs;
        self
    }
}
