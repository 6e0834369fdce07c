//! Error sinks for captured listener failures.

use tracing::error;

use crate::response::ListenerFailure;

/// Receiver for listener failures captured during publish.
///
/// Sinks are called synchronously from the publishing thread, after the
/// failure has been recorded and before the next listener runs.
pub trait ErrorSink: Send + Sync {
    /// Record a captured failure.
    fn log_error(&self, failure: &ListenerFailure);
}

impl<F> ErrorSink for F
where
    F: Fn(&ListenerFailure) + Send + Sync,
{
    fn log_error(&self, failure: &ListenerFailure) {
        self(failure);
    }
}

/// Sink that forwards failures to `tracing` at error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn log_error(&self, failure: &ListenerFailure) {
        error!(
            handle = %failure.handle,
            listener = %failure.listener,
            event = %failure.event,
            kind = ?failure.kind,
            error = %failure.message,
            "Listener failed"
        );
    }
}
