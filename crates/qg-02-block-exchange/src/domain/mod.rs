//! # Domain Module
//!
//! - **errors**: `ExchangeError`
//! - **entities**: wants, server messages, `PeeringSet`
//! - **value_objects**: `ExchangeConfig`

pub mod entities;
pub mod errors;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use value_objects::*;
