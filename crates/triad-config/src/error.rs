//! Configuration error types.

use std::io;
use thiserror::Error;
use triad_events::EventError;

/// Configuration error type.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// Path to the config file that could not be read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML configuration.
    #[error("Failed to parse config file at {path}: {source}")]
    ParseError {
        /// Path to the config file that failed to parse.
        path: String,
        /// Underlying TOML parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Configuration validation failed.
    #[error("Validation error in field '{field}': {message}")]
    ValidationError {
        /// Field that failed validation.
        field: String,
        /// Validation failure description.
        message: String,
    },

    /// An `[event]` entry was not a list of callbacks.
    #[error("Invalid event configuration in {path}: '{event}' must be a list of callbacks")]
    InvalidEventTable {
        /// Source the entry came from.
        path: String,
        /// Offending event name.
        event: String,
    },

    /// A callback descriptor does not describe anything callable.
    #[error("Event '{event}': {descriptor} is not callable")]
    NotCallable {
        /// Event the descriptor was registered for.
        event: String,
        /// Rendered descriptor.
        descriptor: String,
    },

    /// A descriptor names a service the container does not know.
    #[error("Event '{event}': unknown service '{type_id}'")]
    UnknownService {
        /// Event the descriptor was registered for.
        event: String,
        /// Requested service type id.
        type_id: String,
    },

    /// A descriptor names a function the container does not know.
    #[error("Event '{event}': unknown function '{name}'")]
    UnknownFunction {
        /// Event the descriptor was registered for.
        event: String,
        /// Requested function name.
        name: String,
    },

    /// The registry rejected a registration.
    #[error("Registration failed: {0}")]
    Registration(#[from] EventError),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
