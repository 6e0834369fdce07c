//! Listener trait, handles, and registration input.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ListenerError;

/// Result returned by a listener invocation.
pub type ListenerResult = Result<Value, ListenerError>;

/// Trait for synchronous event listeners.
///
/// A listener receives the published payload and the name the event was
/// published under. Returning `Value::Bool(false)` stops dispatch to the
/// remaining listeners of that publish.
///
/// Any `Fn(&Value, &str) -> ListenerResult + Send + Sync` closure is a
/// listener.
pub trait Listener: Send + Sync {
    /// Called when a matching event is published.
    ///
    /// # Errors
    ///
    /// Returns a [`ListenerError`] when the listener fails. The registry
    /// captures the failure and continues with the next listener.
    fn call(&self, payload: &Value, event: &str) -> ListenerResult;

    /// Optional name for debugging.
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "anonymous"
    }
}

impl<F> Listener for F
where
    F: Fn(&Value, &str) -> ListenerResult + Send + Sync,
{
    fn call(&self, payload: &Value, event: &str) -> ListenerResult {
        self(payload, event)
    }
}

/// A closure listener with a name attached.
pub struct NamedListener<F>
where
    F: Fn(&Value, &str) -> ListenerResult + Send + Sync,
{
    name: String,
    handler: F,
}

impl<F> NamedListener<F>
where
    F: Fn(&Value, &str) -> ListenerResult + Send + Sync,
{
    /// Create a new named listener.
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }
}

impl<F> Listener for NamedListener<F>
where
    F: Fn(&Value, &str) -> ListenerResult + Send + Sync,
{
    fn call(&self, payload: &Value, event: &str) -> ListenerResult {
        (self.handler)(payload, event)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> fmt::Debug for NamedListener<F>
where
    F: Fn(&Value, &str) -> ListenerResult + Send + Sync,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedListener")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Registration handle for a listener.
///
/// Handles are issued in strictly increasing order and are never reused,
/// so they double as the dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListenerHandle(u64);

impl ListenerHandle {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw handle value.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Registration input before it reaches the registry.
///
/// The registry only accepts resolved listeners. `TypeMethod` references
/// are turned into listeners by a container before `subscribe` is called.
#[derive(Clone)]
pub enum ListenerSpec {
    /// An already-callable listener.
    Direct(Arc<dyn Listener>),
    /// A method on a service identified by type id.
    TypeMethod {
        /// Identifier the container knows the service by.
        type_id: String,
        /// Method to bind.
        method: String,
    },
}

impl ListenerSpec {
    /// Create a direct spec from any listener.
    pub fn direct(listener: impl Listener + 'static) -> Self {
        Self::Direct(Arc::new(listener))
    }

    /// Create a type/method reference.
    pub fn type_method(type_id: impl Into<String>, method: impl Into<String>) -> Self {
        Self::TypeMethod {
            type_id: type_id.into(),
            method: method.into(),
        }
    }
}

impl fmt::Debug for ListenerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct(listener) => f.debug_tuple("Direct").field(&listener.name()).finish(),
            Self::TypeMethod { type_id, method } => f
                .debug_struct("TypeMethod")
                .field("type_id", type_id)
                .field("method", method)
                .finish(),
        }
    }
}
