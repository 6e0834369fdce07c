//! Error types for registration and listener execution.

use thiserror::Error;

/// Errors returned by registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    /// The event name was empty.
    #[error("event name must not be empty")]
    EmptyEventName,
}

/// Result type for registry operations.
pub type EventResult<T> = Result<T, EventError>;

/// Error returned by a listener invocation.
///
/// Listeners report failure through this type; the registry captures it
/// and never propagates it to the publisher.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// A plain failure message.
    #[error("{0}")]
    Message(String),

    /// The payload could not be decoded or encoded.
    #[error("payload error: {0}")]
    Payload(#[from] serde_json::Error),

    /// A registry call made by the listener failed.
    #[error(transparent)]
    Registry(#[from] EventError),

    /// Any other error raised by the listener.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl ListenerError {
    /// Create a failure from a message.
    #[must_use]
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Wrap an arbitrary error.
    #[must_use]
    pub fn other<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Other(Box::new(error))
    }
}

impl From<std::io::Error> for ListenerError {
    fn from(error: std::io::Error) -> Self {
        Self::other(error)
    }
}
