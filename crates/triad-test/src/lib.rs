//! Triad Test - Shared test utilities for the Triad event registry.
//!
//! This crate provides recording listeners, error sinks and fixtures that
//! can be used across Triad crates as a dev-dependency.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::json;
//! use triad_events::Registry;
//! use triad_test::{CallLog, MemorySink};
//!
//! let sink = Arc::new(MemorySink::new());
//! let registry = Registry::new().with_error_sink(sink.clone());
//! let log = CallLog::new();
//!
//! registry.subscribe("e", log.failing("bad")).unwrap();
//! registry.subscribe("e", log.returning("good", json!("ok"))).unwrap();
//! registry.publish("e", &json!({}));
//!
//! assert_eq!(log.calls(), vec!["bad", "good"]);
//! assert_eq!(sink.len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
