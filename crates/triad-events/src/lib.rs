//! Triad Events - In-process event registry and dispatcher.
//!
//! This crate provides:
//! - A [`Registry`] of exact-name and prefix-name listeners
//! - Deterministic dispatch in registration (handle) order
//! - Short-circuiting on `false` and halting on the first result
//! - Containment of listener errors and panics, with an optional error sink
//!
//! # Matching
//!
//! A listener registered under `order.paid` only sees events published as
//! `order.paid`. A listener registered under `order.*` sees every event whose
//! name starts with `order.`. When several prefixes match one event, the
//! listeners of all of them run, merged with the exact listeners by handle.
//!
//! # Example
//!
//! ```rust
//! use serde_json::{Value, json};
//! use triad_events::{Registry, Response};
//!
//! let registry = Registry::new();
//!
//! registry
//!     .subscribe_fn("order.*", "audit", |_: &Value, event: &str| Ok(json!(event)))
//!     .unwrap();
//! registry
//!     .subscribe_fn("order.paid", "invoice", |payload: &Value, _: &str| {
//!         Ok(payload["total"].clone())
//!     })
//!     .unwrap();
//!
//! let responses = registry.publish("order.paid", &json!({ "total": 42 }));
//! assert_eq!(
//!     responses,
//!     vec![Response::Value(json!("order.paid")), Response::Value(json!(42))]
//! );
//!
//! // Halting publish returns the first non-null value.
//! assert_eq!(
//!     registry.publish_until("order.paid", &json!({})),
//!     Some(json!("order.paid"))
//! );
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod listener;
mod pattern;
mod registry;
mod response;
mod sink;

pub use error::{EventError, EventResult, ListenerError};
pub use listener::{Listener, ListenerHandle, ListenerResult, ListenerSpec, NamedListener};
pub use pattern::{EventPattern, PREFIX_MARKER};
pub use registry::{RegisteredListener, Registry, ResolvedListener};
pub use response::{FailureKind, ListenerFailure, PublishOutcome, Response};
pub use sink::{ErrorSink, TracingSink};
