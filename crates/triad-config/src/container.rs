//! Service container that resolves descriptors into listeners.
//!
//! Services are registered under a type id with a factory. The factory runs
//! on first use and the instance is shared by every listener bound to that
//! type id afterwards.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tracing::debug;
use triad_events::{Listener, ListenerResult, ListenerSpec};

use crate::error::{ConfigError, ConfigResult};
use crate::types::CallbackDescriptor;

/// An object whose methods can be bound as listeners.
pub trait Service: Send + Sync {
    /// Whether `method` can be invoked on this service.
    fn has_method(&self, method: &str) -> bool;

    /// Invoke `method` for a published event.
    ///
    /// # Errors
    ///
    /// Returns a listener error when the method fails.
    fn invoke(&self, method: &str, payload: &Value, event: &str) -> ListenerResult;
}

type ServiceFactory = Box<dyn Fn() -> Arc<dyn Service> + Send + Sync>;

/// A service method bound as a listener.
pub struct MethodListener {
    name: String,
    service: Arc<dyn Service>,
    method: String,
}

impl MethodListener {
    /// Bind `method` on `service`. Reported as `type_id::method`.
    pub fn new(type_id: &str, service: Arc<dyn Service>, method: impl Into<String>) -> Self {
        let method = method.into();
        Self {
            name: format!("{type_id}::{method}"),
            service,
            method,
        }
    }
}

impl Listener for MethodListener {
    fn call(&self, payload: &Value, event: &str) -> ListenerResult {
        self.service.invoke(&self.method, payload, event)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for MethodListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodListener")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Registry of services and named functions.
#[derive(Default)]
pub struct Container {
    factories: HashMap<String, ServiceFactory>,
    instances: Mutex<HashMap<String, Arc<dyn Service>>>,
    functions: HashMap<String, Arc<dyn Listener>>,
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut services: Vec<_> = self.factories.keys().collect();
        services.sort();
        let mut functions: Vec<_> = self.functions.keys().collect();
        functions.sort();
        f.debug_struct("Container")
            .field("services", &services)
            .field("functions", &functions)
            .finish_non_exhaustive()
    }
}

impl Container {
    /// Create an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service factory under a type id.
    ///
    /// Replaces any previous registration for the same id.
    pub fn register_service<S, F>(&mut self, type_id: impl Into<String>, factory: F)
    where
        S: Service + 'static,
        F: Fn() -> S + Send + Sync + 'static,
    {
        let type_id = type_id.into();
        self.instances
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&type_id);
        self.factories.insert(
            type_id,
            Box::new(move || Arc::new(factory()) as Arc<dyn Service>),
        );
    }

    /// Builder form of [`Container::register_service`].
    #[must_use]
    pub fn with_service<S, F>(mut self, type_id: impl Into<String>, factory: F) -> Self
    where
        S: Service + 'static,
        F: Fn() -> S + Send + Sync + 'static,
    {
        self.register_service(type_id, factory);
        self
    }

    /// Register a named function listener.
    pub fn register_function(&mut self, name: impl Into<String>, listener: Arc<dyn Listener>) {
        self.functions.insert(name.into(), listener);
    }

    /// Builder form of [`Container::register_function`].
    #[must_use]
    pub fn with_function(mut self, name: impl Into<String>, listener: Arc<dyn Listener>) -> Self {
        self.register_function(name, listener);
        self
    }

    /// Check if a service type id is registered.
    #[must_use]
    pub fn has_service(&self, type_id: &str) -> bool {
        self.factories.contains_key(type_id)
    }

    /// Get the shared instance for a type id, creating it on first use.
    #[must_use]
    pub fn service(&self, type_id: &str) -> Option<Arc<dyn Service>> {
        let factory = self.factories.get(type_id)?;
        let mut instances = self
            .instances
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let instance = instances.entry(type_id.to_owned()).or_insert_with(|| {
            debug!(type_id, "Instantiating service");
            factory()
        });
        Some(Arc::clone(instance))
    }

    /// Resolve registration input into a callable listener.
    ///
    /// `event` is only used in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownService`] if the type id is not
    /// registered and [`ConfigError::NotCallable`] if the service has no such
    /// method.
    pub fn resolve(&self, event: &str, spec: &ListenerSpec) -> ConfigResult<Arc<dyn Listener>> {
        match spec {
            ListenerSpec::Direct(listener) => Ok(Arc::clone(listener)),
            ListenerSpec::TypeMethod { type_id, method } => self.bind(event, type_id, method),
        }
    }

    /// Resolve a configuration descriptor into a callable listener.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownFunction`] for an unregistered function
    /// name, otherwise see [`Container::resolve`].
    pub fn resolve_descriptor(
        &self,
        event: &str,
        descriptor: &CallbackDescriptor,
    ) -> ConfigResult<Arc<dyn Listener>> {
        match descriptor {
            CallbackDescriptor::Function(name) => {
                self.functions
                    .get(name)
                    .cloned()
                    .ok_or_else(|| ConfigError::UnknownFunction {
                        event: event.to_owned(),
                        name: name.clone(),
                    })
            },
            CallbackDescriptor::Method(type_id, method)
            | CallbackDescriptor::Service {
                service: type_id,
                method,
            } => self.bind(event, type_id, method),
        }
    }

    fn bind(&self, event: &str, type_id: &str, method: &str) -> ConfigResult<Arc<dyn Listener>> {
        let service = self
            .service(type_id)
            .ok_or_else(|| ConfigError::UnknownService {
                event: event.to_owned(),
                type_id: type_id.to_owned(),
            })?;

        if !service.has_method(method) {
            return Err(ConfigError::NotCallable {
                event: event.to_owned(),
                descriptor: format!("{type_id}::{method}"),
            });
        }

        Ok(Arc::new(MethodListener::new(type_id, service, method)))
    }
}
