//! # Quarry Telemetry
//!
//! Structured logging for the Quarry gateway.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use quarry_telemetry::{init_logging, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging(&TelemetryConfig::from_env())?;
//!     // Application code here
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `QG_SERVICE_NAME` | `quarry` | Service name in log lines |
//! | `QG_LOG_LEVEL` / `RUST_LOG` | `info` | `EnvFilter` directive |
//! | `QG_CONSOLE_OUTPUT` | `true` | Write logs to stderr |
//! | `QG_JSON_LOGS` | `false` (`true` in containers) | JSON log lines |

mod config;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use tracing_setup::{env_filter, init_logging};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Failed to install log subscriber: {0}")]
    Init(String),
}
