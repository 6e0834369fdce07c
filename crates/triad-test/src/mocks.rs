//! Mock listeners and error sinks for testing.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use triad_events::{ErrorSink, Listener, ListenerError, ListenerFailure, ListenerResult};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One recorded listener invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Name of the listener that ran.
    pub listener: String,
    /// Event name it was invoked with.
    pub event: String,
    /// Payload it received.
    pub payload: Value,
}

/// Shared, ordered log of listener invocations.
///
/// Clones share the same log, so listeners created from one `CallLog`
/// record into a single sequence that reflects dispatch order.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl CallLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Listener names in invocation order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .map(|call| call.listener.clone())
            .collect()
    }

    /// Full invocation records.
    #[must_use]
    pub fn records(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    /// Number of recorded invocations.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Check if nothing was invoked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock(&self.calls).is_empty()
    }

    /// Forget every recorded invocation.
    pub fn clear(&self) {
        lock(&self.calls).clear();
    }

    /// A listener that records its call and returns `value`.
    #[must_use]
    pub fn returning(&self, name: &str, value: Value) -> Arc<dyn Listener> {
        Arc::new(RecordingListener::new(self, name, Behavior::Return(value)))
    }

    /// A listener that records its call and returns an error.
    #[must_use]
    pub fn failing(&self, name: &str) -> Arc<dyn Listener> {
        Arc::new(RecordingListener::new(
            self,
            name,
            Behavior::Fail(format!("{name} failed")),
        ))
    }

    /// A listener that records its call and panics.
    #[must_use]
    pub fn panicking(&self, name: &str) -> Arc<dyn Listener> {
        Arc::new(RecordingListener::new(
            self,
            name,
            Behavior::Panic(format!("{name} panicked")),
        ))
    }

    fn record(&self, listener: &str, payload: &Value, event: &str) {
        lock(&self.calls).push(RecordedCall {
            listener: listener.to_owned(),
            event: event.to_owned(),
            payload: payload.clone(),
        });
    }
}

#[derive(Debug, Clone)]
enum Behavior {
    Return(Value),
    Fail(String),
    Panic(String),
}

/// Listener that records each invocation into a [`CallLog`].
#[derive(Debug)]
pub struct RecordingListener {
    name: String,
    log: CallLog,
    behavior: Behavior,
}

impl RecordingListener {
    fn new(log: &CallLog, name: &str, behavior: Behavior) -> Self {
        Self {
            name: name.to_owned(),
            log: log.clone(),
            behavior,
        }
    }
}

impl Listener for RecordingListener {
    fn call(&self, payload: &Value, event: &str) -> ListenerResult {
        self.log.record(&self.name, payload, event);
        match &self.behavior {
            Behavior::Return(value) => Ok(value.clone()),
            Behavior::Fail(message) => Err(ListenerError::msg(message.clone())),
            Behavior::Panic(message) => panic!("{message}"),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Error sink that keeps every failure in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    failures: Mutex<Vec<ListenerFailure>>,
}

impl MemorySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Captured failures in the order they were reported.
    #[must_use]
    pub fn failures(&self) -> Vec<ListenerFailure> {
        lock(&self.failures).clone()
    }

    /// Number of captured failures.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.failures).len()
    }

    /// Check if no failure was reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock(&self.failures).is_empty()
    }
}

impl ErrorSink for MemorySink {
    fn log_error(&self, failure: &ListenerFailure) {
        lock(&self.failures).push(failure.clone());
    }
}
