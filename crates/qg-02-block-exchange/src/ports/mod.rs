//! # Ports
//!
//! - **inbound**: `ExchangeApi` for the gateway, `WantHandler` for remote peers
//! - **outbound**: `BlockStore`, `BlockNetwork`, `PeerSender`

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
