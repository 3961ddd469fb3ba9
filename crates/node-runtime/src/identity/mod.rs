//! # Node Identity
//!
//! A fleet of gateways can share one secret seed and still get distinct,
//! stable identities: node `n` uses `HMAC-SHA256(seed, "quarry-identity-" || n)`
//! as its secret. Without a seed the node runs under a throwaway identity.

use std::fmt;
use std::str::FromStr;

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};
use shared_types::{IdentifierError, PeerId};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Seed length in bytes.
pub const SEED_LEN: usize = 32;

const DERIVATION_PREFIX: &[u8] = b"quarry-identity-";

/// Identity derivation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    /// Seed is not 32 bytes of hex.
    #[error("Invalid identity seed: {0}")]
    InvalidSeed(String),

    /// Seed index must be at least 1.
    #[error("Invalid seed index {0}: must be >= 1")]
    InvalidIndex(i64),

    #[error("Invalid peer identity: {0}")]
    PeerId(#[from] IdentifierError),
}

/// Shared secret seed, hex-encoded in configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct Seed([u8; SEED_LEN]);

impl FromStr for Seed {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim()).map_err(|e| IdentityError::InvalidSeed(e.to_string()))?;
        let seed: [u8; SEED_LEN] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| IdentityError::InvalidSeed(format!("expected {SEED_LEN} bytes, got {}", b.len())))?;
        Ok(Self(seed))
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Seed(..)")
    }
}

/// The node's secret and the peer identity derived from it.
#[derive(Clone)]
pub struct Identity {
    secret: [u8; 32],
    peer_id: PeerId,
    index: Option<u64>,
}

impl Identity {
    /// Derive identity number `index` from `seed`.
    pub fn derive(seed: &Seed, index: i64) -> Result<Self, IdentityError> {
        if index < 1 {
            return Err(IdentityError::InvalidIndex(index));
        }

        let mut mac = HmacSha256::new_from_slice(&seed.0).map_err(|e| IdentityError::InvalidSeed(e.to_string()))?;
        mac.update(DERIVATION_PREFIX);
        mac.update(index.to_string().as_bytes());
        let secret: [u8; 32] = mac.finalize().into_bytes().into();

        Ok(Self {
            peer_id: peer_id_for(&secret)?,
            secret,
            index: Some(index as u64),
        })
    }

    /// Fresh random identity, gone on restart.
    pub fn ephemeral() -> Result<Self, IdentityError> {
        let mut secret = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);
        Ok(Self {
            peer_id: peer_id_for(&secret)?,
            secret,
            index: None,
        })
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    pub fn secret(&self) -> &[u8; 32] {
        &self.secret
    }

    /// Seed index, `None` for an ephemeral identity.
    pub fn index(&self) -> Option<u64> {
        self.index
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("peer_id", &self.peer_id)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

fn peer_id_for(secret: &[u8; 32]) -> Result<PeerId, IdentityError> {
    let digest = Sha256::digest(secret);
    Ok(format!("qg{}", hex::encode(&digest[..20])).parse()?)
}
