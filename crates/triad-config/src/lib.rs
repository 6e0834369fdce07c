#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Event-table configuration and bootstrap for the Triad event registry.
//!
//! This crate is the collaborator layer around `triad-events`: it reads
//! `(event name, callback)` declarations from TOML, resolves each callback
//! into a listener through a [`Container`], and subscribes the result to a
//! shared [`Registry`](triad_events::Registry).
//!
//! # File format
//!
//! ```toml
//! [log]
//! level = "info"
//!
//! [event]
//! "user.created" = [
//!     "audit.record",                            # named function
//!     ["Mailer", "welcome"],                     # (type id, method) pair
//!     { service = "Metrics", method = "count" }, # table form of the pair
//! ]
//! "user.*" = ["audit.record"]
//! ```
//!
//! Event names must be quoted: a bare `user.created` key is a nested TOML
//! table and is rejected.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use triad_config::{Bootstrap, Container};
//! use triad_events::Registry;
//!
//! let registry = Arc::new(Registry::new());
//! let bootstrap = Bootstrap::new(Arc::clone(&registry), Container::new());
//! bootstrap.start(std::path::Path::new(".")).unwrap();
//! ```
//!
//! # Merging
//!
//! The application config and every plugin config are merged additively:
//! an event declared in several files keeps all of their callbacks, in load
//! order. See [`loader`] for the discovery order.

/// Subscription of configured listeners.
pub mod bootstrap;
/// Descriptor resolution.
pub mod container;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Configuration struct definitions.
pub mod types;

// Re-export primary types at the crate root.
pub use bootstrap::Bootstrap;
pub use container::{Container, MethodListener, Service};
pub use error::{ConfigError, ConfigResult};
pub use loader::{Discovered, discover, load_file, load_str};
pub use types::{CallbackDescriptor, EventConfig, EventTable, LogSection};
