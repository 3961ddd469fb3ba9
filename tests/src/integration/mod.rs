//! # Integration Flows
//!
//! Each module assembles real subsystem services over in-memory adapters
//! and checks behaviour that only shows up when they run together.

pub mod exchange_flows;
pub mod gateway_flows;
pub mod routing_flows;
