//! # Quarry Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # Criterion benchmarks for the routing fan-out
//! └── src/integration/  # Cross-subsystem flows
//!     ├── routing_flows.rs   # Routing stack assembled from configuration
//!     ├── exchange_flows.rs  # Shared-cache serving between gateway nodes
//!     └── gateway_flows.rs   # CLI lookups against an assembled node
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p qg-tests
//!
//! # By category
//! cargo test -p qg-tests integration::exchange_flows
//!
//! # Benchmarks
//! cargo bench -p qg-tests
//! ```

pub mod integration;
