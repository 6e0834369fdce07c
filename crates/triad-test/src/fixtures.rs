//! Test fixtures for payloads, services and logging.

use std::sync::Arc;

use serde_json::{Value, json};
use triad_config::{Container, Service};
use triad_events::{ListenerError, ListenerResult, NamedListener};

/// Create a test payload.
#[must_use]
pub fn test_payload() -> Value {
    json!({
        "id": 42,
        "name": "test-user",
        "tags": ["alpha", "beta"],
    })
}

/// Service whose methods echo, veto, stay silent or fail.
///
/// - `echo` returns `{"event": <name>, "payload": <payload>}`
/// - `veto` returns `false`
/// - `silent` returns `null`
/// - `fail` returns an error
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoService;

impl Service for EchoService {
    fn has_method(&self, method: &str) -> bool {
        matches!(method, "echo" | "veto" | "silent" | "fail")
    }

    fn invoke(&self, method: &str, payload: &Value, event: &str) -> ListenerResult {
        match method {
            "echo" => Ok(json!({ "event": event, "payload": payload })),
            "veto" => Ok(Value::Bool(false)),
            "silent" => Ok(Value::Null),
            other => Err(ListenerError::msg(format!("EchoService::{other} failed"))),
        }
    }
}

/// Create a container with `EchoService` registered as `Echo` and an
/// `echo` function that returns the event name.
#[must_use]
pub fn test_container() -> Container {
    Container::new()
        .with_service("Echo", || EchoService)
        .with_function(
            "echo",
            Arc::new(NamedListener::new("echo", |_: &Value, event: &str| {
                Ok(json!(event))
            })),
        )
}

/// Install a test-friendly `tracing` subscriber.
///
/// Output goes through the test writer so it is captured per test. Safe to
/// call from every test; only the first call installs the subscriber.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}
