//! # Shared Types Crate
//!
//! This crate contains the identifiers and records exchanged between the
//! routing and block exchange subsystems.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: Cross-subsystem types are defined here.
//! - **Value Identity**: `ContentId` and `PeerId` compare by value and are
//!   cheap to clone; neither carries mutable state.
//! - **No I/O**: Nothing in this crate touches the network or disk.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
