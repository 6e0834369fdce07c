//! Subscribes configured listeners to a registry.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};
use triad_events::{Listener, ListenerHandle, Registry};

use crate::container::Container;
use crate::error::ConfigResult;
use crate::loader;
use crate::types::EventConfig;

/// Wires event configuration into a shared [`Registry`].
#[derive(Debug)]
pub struct Bootstrap {
    registry: Arc<Registry>,
    container: Container,
}

impl Bootstrap {
    /// Create a bootstrap for `registry`, resolving descriptors with
    /// `container`.
    #[must_use]
    pub fn new(registry: Arc<Registry>, container: Container) -> Self {
        Self {
            registry,
            container,
        }
    }

    /// The registry listeners are subscribed to.
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// The container used for resolution.
    #[must_use]
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Subscribe every listener declared in `config`.
    ///
    /// All descriptors are resolved before the first subscription, so a
    /// configuration that fails to resolve subscribes nothing. Listeners are
    /// subscribed in table order, then declaration order within an event.
    ///
    /// # Errors
    ///
    /// Returns the first resolution or registration error.
    pub fn load(&self, config: &EventConfig) -> ConfigResult<Vec<ListenerHandle>> {
        let mut resolved: Vec<(&str, Arc<dyn Listener>)> =
            Vec::with_capacity(config.events.callback_count());
        for (event, callbacks) in config.events.iter() {
            for descriptor in callbacks {
                resolved.push((event, self.container.resolve_descriptor(event, descriptor)?));
            }
        }

        let mut handles = Vec::with_capacity(resolved.len());
        for (event, listener) in resolved {
            let handle = self.registry.subscribe(event, listener)?;
            handles.push(handle);
        }

        debug!(count = handles.len(), "Configured listeners subscribed");
        Ok(handles)
    }

    /// Discover every event configuration under `root` and load it.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`](crate::ConfigError) if discovery or loading
    /// fails.
    pub fn start(&self, root: &Path) -> ConfigResult<Vec<ListenerHandle>> {
        let discovered = loader::discover(root)?;
        let handles = self.load(&discovered.config)?;

        info!(
            root = %root.display(),
            files = discovered.loaded_files.len(),
            events = discovered.config.events.len(),
            listeners = handles.len(),
            "Event listeners loaded"
        );
        Ok(handles)
    }
}
