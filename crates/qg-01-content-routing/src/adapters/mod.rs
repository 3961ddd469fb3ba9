//! # Adapters
//!
//! Concrete routing backends:
//!
//! - `HttpRouterClient`: HTTP Delegated Routing V1 client (reqwest)
//! - `MemoryRouter`: in-process routing table, used for tests and local setups
//! - `NullRouter`: always-empty stub for deployments with no routing source

pub mod http_router;
pub mod memory;
pub mod null;

pub use http_router::HttpRouterClient;
pub use memory::MemoryRouter;
pub use null::NullRouter;
