//! # Adapters
//!
//! - `MemoryBlockStore`: block store in process memory
//! - `LoopbackNetwork`: in-process exchange network for tests and local setups

pub mod loopback;
pub mod memory_store;

pub use loopback::{Delivery, LoopbackEndpoint, LoopbackNetwork};
pub use memory_store::MemoryBlockStore;
