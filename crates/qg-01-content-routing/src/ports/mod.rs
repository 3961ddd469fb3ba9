//! # Ports
//!
//! - **outbound**: the routing facets a backend can implement
//! - **inbound**: `RoutingBackend`, the capability bundle exposed to callers

pub mod inbound;
pub mod outbound;

pub use inbound::RoutingBackend;
pub use outbound::*;
