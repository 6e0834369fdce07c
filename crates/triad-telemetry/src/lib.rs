//! Triad Telemetry - Logging for the Triad event registry.
//!
//! This crate provides:
//! - Configurable logging setup with multiple formats and targets
//! - Rolling file output via `tracing-appender`
//! - With the `config` feature, conversion from the `[log]` section of a
//!   `triad-config` file
//!
//! # Example
//!
//! ```rust,no_run
//! use triad_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), triad_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("triad_events=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!("Logging ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileLogConfig, FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging,
    setup_logging,
};
