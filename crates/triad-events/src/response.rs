//! Per-listener outcomes of a publish.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::listener::ListenerHandle;

/// How a listener invocation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The listener returned an error.
    Error,
    /// The listener panicked.
    Panic,
}

/// A captured listener failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenerFailure {
    /// Handle of the failing registration.
    pub handle: ListenerHandle,
    /// Name reported by the listener.
    pub listener: String,
    /// Event name the listener was invoked with.
    pub event: String,
    /// Error or panic.
    pub kind: FailureKind,
    /// Rendered error message or panic payload.
    pub message: String,
    /// When the failure was captured.
    pub occurred_at: DateTime<Utc>,
}

impl std::fmt::Display for ListenerFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verb = match self.kind {
            FailureKind::Error => "failed",
            FailureKind::Panic => "panicked",
        };
        write!(
            f,
            "listener {} ({}) {verb} on '{}': {}",
            self.handle, self.listener, self.event, self.message
        )
    }
}

/// Outcome of one listener invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "data")]
pub enum Response {
    /// The listener returned a value, possibly `null`.
    Value(Value),
    /// The listener failed; dispatch continued.
    Failed(ListenerFailure),
}

impl Response {
    /// The returned value, if the listener succeeded.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            Self::Failed(_) => None,
        }
    }

    /// The captured failure, if the listener failed.
    #[must_use]
    pub fn failure(&self) -> Option<&ListenerFailure> {
        match self {
            Self::Value(_) => None,
            Self::Failed(f) => Some(f),
        }
    }

    /// Check if this response is a captured failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Result of [`Registry::emit`](crate::Registry::emit).
#[derive(Debug, Clone, PartialEq)]
pub enum PublishOutcome {
    /// Every response of a non-halting publish, in dispatch order.
    Responses(Vec<Response>),
    /// The first non-null value of a halting publish, or `None`.
    Halted(Option<Value>),
}

impl PublishOutcome {
    /// The collected responses of a non-halting publish.
    #[must_use]
    pub fn responses(&self) -> Option<&[Response]> {
        match self {
            Self::Responses(r) => Some(r),
            Self::Halted(_) => None,
        }
    }

    /// The halting value, if any.
    #[must_use]
    pub fn halted_value(&self) -> Option<&Value> {
        match self {
            Self::Halted(v) => v.as_ref(),
            Self::Responses(_) => None,
        }
    }
}
