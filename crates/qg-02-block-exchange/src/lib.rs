//! # QG-02 Block Exchange
//!
//! Decides how to fetch: wraps the peer-to-peer block exchange with
//! per-block deadlines and, in shared-cache mode, a server responder that
//! only answers explicitly peered nodes.
//!
//! **Subsystem ID:** 2
//! **Architecture:** Hexagonal (Ports/Adapters)
//!
//! ## Guarantees
//!
//! | Path | Bound |
//! |------|-------|
//! | `get_block` | One fresh per-block deadline; expiry fails that request only |
//! | `get_blocks` | Timer re-armed per forwarded block; a stalled gap ends the stream silently |
//! | Serving | Non-peered peers get silence; missing blocks get silence, never "don't have" |
//!
//! ## Module Structure
//!
//! ```text
//! qg-02-block-exchange/
//! ├── domain/          # ExchangeError, wants, PeeringSet, ExchangeConfig
//! ├── ports/           # ExchangeApi, WantHandler, BlockStore, BlockNetwork, PeerSender
//! ├── algorithms/      # DeadlineStream, BoundedExchange, SharedCacheServer
//! ├── adapters/        # MemoryBlockStore, LoopbackNetwork
//! └── service.rs       # ExchangeService assembly
//! ```

#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::{LoopbackEndpoint, LoopbackNetwork, MemoryBlockStore};
pub use algorithms::{BoundedExchange, DeadlineState, DeadlineStream, SharedCacheServer};
pub use domain::{
    ExchangeConfig, ExchangeError, PeeringSet, ServerMessage, Want, WantType,
    DEFAULT_MAX_LEDGER_WANTS, DEFAULT_PER_BLOCK_TIMEOUT, DEFAULT_WANT_HAVE_REPLACE_SIZE,
};
pub use ports::{BlockNetwork, BlockStore, BlockStream, ExchangeApi, PeerSender, WantHandler};
pub use service::ExchangeService;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
