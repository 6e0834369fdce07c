//! Prelude module - commonly used types for convenient import.
//!
//! Use `use triad_events::prelude::*;` to import all essential types.

// Registry
pub use crate::{RegisteredListener, Registry, ResolvedListener};

// Listeners
pub use crate::{Listener, ListenerHandle, ListenerResult, ListenerSpec, NamedListener};

// Dispatch outcomes
pub use crate::{FailureKind, ListenerFailure, PublishOutcome, Response};

// Errors and sinks
pub use crate::{ErrorSink, EventError, EventResult, ListenerError, TracingSink};
