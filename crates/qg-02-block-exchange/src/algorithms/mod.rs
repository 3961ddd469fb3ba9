//! # Algorithms Module
//!
//! - **deadline_stream**: gap-bounded stream with one reusable timer
//! - **bounded**: `BoundedExchange`, the timeout-guarded client
//! - **server**: `SharedCacheServer`, the peering-filtered responder

pub mod bounded;
pub mod deadline_stream;
pub mod server;

pub use bounded::BoundedExchange;
pub use deadline_stream::{DeadlineState, DeadlineStream};
pub use server::SharedCacheServer;
