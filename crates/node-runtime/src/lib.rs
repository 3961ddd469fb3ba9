//! # Node Runtime Library
//!
//! This library exposes the internal modules of the node runtime for testing.
//! The main entry point is the `quarry-node` binary.
//!
//! ## Modular Structure
//!
//! - `container/` - Configuration and subsystem assembly
//! - `identity/` - Seeded node identity derivation
//! - `commands` - One-shot routing lookups used by the CLI

#![allow(clippy::too_many_lines)]

pub mod commands;
pub mod container;
pub mod identity;

pub use container::{ConfigError, GatewayConfig, GatewayContainer};
pub use identity::{Identity, IdentityError, Seed};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
