//! # Algorithms Module
//!
//! The routing composition logic. Everything here is written against
//! `RoutingBackend`, so any mix of DHT clients, delegated routers and
//! fakes can be composed.
//!
//! - **parallel**: Composite Parallel Router (fan-out, first-hit, merge)
//! - **composer**: per-operation backend assignment
//! - **bundled_dht**: readiness-switched standard/accelerated DHT
//! - **grouping**: delegated endpoint normalisation and capability wiring
//! - **provider_query**: bounded provider discovery
//! - **relay**: fan-in stream shared by the above

pub mod bundled_dht;
pub mod composer;
pub mod grouping;
pub mod parallel;
pub mod provider_query;
pub mod relay;

pub use bundled_dht::BundledDht;
pub use composer::Composer;
pub use grouping::{default_capabilities, group_endpoints, normalize_endpoint, wire_delegated};
pub use parallel::{ParallelRouteEntry, ParallelRouter};
pub use provider_query::ProviderQueryManager;
pub use relay::{Relay, RelayStream};
