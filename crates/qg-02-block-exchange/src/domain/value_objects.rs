//! # Domain Value Objects

use std::time::Duration;

use super::entities::PeeringSet;

/// Default bound on a single block (or gap between batch blocks).
pub const DEFAULT_PER_BLOCK_TIMEOUT: Duration = Duration::from_secs(60);

/// Blocks at or under this size answer want-have with the block itself.
pub const DEFAULT_WANT_HAVE_REPLACE_SIZE: usize = 1024;

/// Outstanding wants remembered per peered peer.
pub const DEFAULT_MAX_LEDGER_WANTS: usize = 1024;

/// Block exchange configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExchangeConfig {
    /// Deadline for one block, and for each gap in a batch
    pub per_block_timeout: Duration,
    /// Want-have replacement threshold in bytes (0 disables)
    pub want_have_replace_size: usize,
    /// Serve the local cache to peered peers
    pub shared_cache: bool,
    /// Ledger bound per peered peer
    pub max_ledger_wants: usize,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            per_block_timeout: DEFAULT_PER_BLOCK_TIMEOUT,
            want_have_replace_size: DEFAULT_WANT_HAVE_REPLACE_SIZE,
            shared_cache: false,
            max_ledger_wants: DEFAULT_MAX_LEDGER_WANTS,
        }
    }
}

impl ExchangeConfig {
    /// The server responder runs only with shared cache on and at least one peer.
    pub fn serves(&self, peering: &PeeringSet) -> bool {
        self.shared_cache && !peering.is_empty()
    }

    /// Whether a block of `size` bytes replaces a "have" answer.
    pub fn replaces_have(&self, size: usize) -> bool {
        self.want_have_replace_size > 0 && size <= self.want_have_replace_size
    }
}
