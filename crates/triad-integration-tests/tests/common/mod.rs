//! Shared harness for integration tests.

use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;
use triad_config::Bootstrap;
use triad_events::Registry;
use triad_test::{MemorySink, test_container};

/// An application root on disk plus a registry wired to a memory sink.
///
/// The tempdir is cleaned up when the harness is dropped.
#[allow(dead_code)]
pub struct AppHarness {
    /// Shared registry.
    pub registry: Arc<Registry>,
    /// Sink receiving captured listener failures.
    pub sink: Arc<MemorySink>,
    /// Bootstrap using the test container.
    pub bootstrap: Bootstrap,
    root: TempDir,
}

#[allow(dead_code)]
impl AppHarness {
    /// Build a harness over an empty application root.
    pub fn new() -> Self {
        let root = TempDir::new().expect("failed to create tempdir");
        let sink = Arc::new(MemorySink::new());
        let registry = Arc::new(Registry::new().with_error_sink(sink.clone()));
        let bootstrap = Bootstrap::new(Arc::clone(&registry), test_container());

        Self {
            registry,
            sink,
            bootstrap,
            root,
        }
    }

    /// Root directory of the application tree.
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Write a file relative to the root, creating parent directories.
    pub fn write(&self, relative: &str, content: &str) {
        let path = self.root.path().join(relative);
        std::fs::create_dir_all(path.parent().expect("relative path has a parent"))
            .expect("failed to create config dir");
        std::fs::write(path, content).expect("failed to write config file");
    }
}
