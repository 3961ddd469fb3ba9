//! # Domain Module
//!
//! Core domain types for the content routing subsystem.
//!
//! - **errors**: `RoutingError` taxonomy and `Capability`
//! - **entities**: `EndpointCapabilities`, `EndpointDescriptor`, `GroupedEndpoint`
//! - **value_objects**: `DhtMode`, `ProviderQueryLimits`
//!
//! Nothing in here performs I/O.

pub mod entities;
pub mod errors;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use value_objects::*;
