//! # QG-01 Content Routing
//!
//! Decides where to look for content: composes a DHT client and any number
//! of HTTP delegated routers into one routing object.
//!
//! **Subsystem ID:** 1
//! **Architecture:** Hexagonal (Ports/Adapters)
//!
//! ## Components
//!
//! | Component | Role |
//! |-----------|------|
//! | `Composer` | One backend per routing operation |
//! | `BundledDht` | Standard vs accelerated DHT, re-chosen on every call |
//! | `group_endpoints` / `wire_delegated` | Delegated routers exposing only advertised capabilities |
//! | `ParallelRouter` | Concurrent fan-out with timeout, stagger and error-tolerance policy |
//! | `ProviderQueryManager` | In-flight, result-count and wall-clock caps on provider discovery |
//! | `RoutingStack` | Assembly from configuration |
//!
//! ## Module Structure
//!
//! ```text
//! qg-01-content-routing/
//! ├── domain/          # RoutingError, Capability, endpoint capabilities, DhtMode
//! ├── ports/           # Facet traits, RoutingBackend
//! ├── algorithms/      # Parallel router, composer, bundled DHT, grouping, PQM
//! ├── adapters/        # Routing V1 HTTP client, in-memory and null routers
//! └── service.rs       # RoutingStack assembly
//! ```
//!
//! Every operation takes a `CancellationToken`; cancelling it stops all
//! in-flight sub-queries.

#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::{HttpRouterClient, MemoryRouter, NullRouter};
pub use algorithms::{
    default_capabilities, group_endpoints, normalize_endpoint, wire_delegated, BundledDht, Composer,
    ParallelRouteEntry, ParallelRouter, ProviderQueryManager,
};
pub use domain::{
    Capability, DhtMode, EndpointCapabilities, EndpointDescriptor, GroupedEndpoint,
    ProviderQueryLimits, RoutingError,
};
pub use ports::{
    Bootstrap, ContentAnnouncer, ContentDiscovery, PeerRouting, ProvideMany, ProviderStream,
    ReadinessCheck, RoutingBackend, ValuePublisher, ValueStore, ValueStream,
};
pub use service::{RoutingStack, RoutingStackConfig, DEFAULT_DELEGATED_TIMEOUT};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
