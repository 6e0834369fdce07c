//! Prelude module - commonly used test utilities.
//!
//! Use `use triad_test::prelude::*;` to import all essential types.

// Mocks
pub use crate::{CallLog, MemorySink, RecordingListener};

// Fixtures
pub use crate::{EchoService, init_test_logging, test_container, test_payload};
