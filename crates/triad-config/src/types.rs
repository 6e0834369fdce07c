//! Event table and log section definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Configuration-level reference to a listener.
///
/// The [`Container`](crate::Container) turns a descriptor into a callable
/// listener before anything is subscribed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CallbackDescriptor {
    /// A function registered with the container by name.
    Function(String),
    /// A `[type id, method]` pair.
    Method(String, String),
    /// Table form of a type/method pair.
    Service {
        /// Type id the container knows the service by.
        service: String,
        /// Method to bind.
        method: String,
    },
}

impl CallbackDescriptor {
    /// Create a function descriptor.
    #[must_use]
    pub fn function(name: impl Into<String>) -> Self {
        Self::Function(name.into())
    }

    /// Create a type/method descriptor.
    #[must_use]
    pub fn method(type_id: impl Into<String>, method: impl Into<String>) -> Self {
        Self::Method(type_id.into(), method.into())
    }

    /// The `(type id, method)` pair, for method and service descriptors.
    #[must_use]
    pub fn type_method(&self) -> Option<(&str, &str)> {
        match self {
            Self::Function(_) => None,
            Self::Method(type_id, method)
            | Self::Service {
                service: type_id,
                method,
            } => Some((type_id.as_str(), method.as_str())),
        }
    }
}

impl fmt::Display for CallbackDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function(name) => write!(f, "{name}"),
            Self::Method(type_id, method)
            | Self::Service {
                service: type_id,
                method,
            } => write!(f, "{type_id}::{method}"),
        }
    }
}

/// Event name to ordered callbacks, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventTable {
    entries: Vec<(String, Vec<CallbackDescriptor>)>,
}

impl EventTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append callbacks for an event.
    ///
    /// If the event is already present the callbacks are added after the
    /// existing ones; the event keeps its original position.
    pub fn extend(
        &mut self,
        event: impl Into<String>,
        callbacks: impl IntoIterator<Item = CallbackDescriptor>,
    ) {
        let event = event.into();
        match self.entries.iter_mut().find(|(name, _)| *name == event) {
            Some((_, existing)) => existing.extend(callbacks),
            None => self.entries.push((event, callbacks.into_iter().collect())),
        }
    }

    /// Builder form of [`EventTable::extend`].
    #[must_use]
    pub fn with(
        mut self,
        event: impl Into<String>,
        callbacks: impl IntoIterator<Item = CallbackDescriptor>,
    ) -> Self {
        self.extend(event, callbacks);
        self
    }

    /// Callbacks declared for an event name.
    #[must_use]
    pub fn get(&self, event: &str) -> Option<&[CallbackDescriptor]> {
        self.entries
            .iter()
            .find(|(name, _)| name == event)
            .map(|(_, callbacks)| callbacks.as_slice())
    }

    /// Iterate over events in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[CallbackDescriptor])> {
        self.entries
            .iter()
            .map(|(name, callbacks)| (name.as_str(), callbacks.as_slice()))
    }

    /// Number of event names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table has no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of callbacks across all events.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.entries.iter().map(|(_, callbacks)| callbacks.len()).sum()
    }

    /// Merge another table into this one. Never replaces.
    pub fn merge(&mut self, other: Self) {
        for (event, callbacks) in other.entries {
            self.extend(event, callbacks);
        }
    }
}

/// The optional `[log]` table.
///
/// Strings only; conversion into a subscriber configuration lives in
/// `triad-telemetry`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSection {
    /// Log level filter (e.g. "info").
    pub level: Option<String>,
    /// Output format name (pretty, compact, json, full).
    pub format: Option<String>,
    /// Additional filter directives.
    pub directives: Vec<String>,
}

impl LogSection {
    /// Overlay another section: set fields win, directives accumulate.
    pub fn merge(&mut self, other: Self) {
        if other.level.is_some() {
            self.level = other.level;
        }
        if other.format.is_some() {
            self.format = other.format;
        }
        self.directives.extend(other.directives);
    }
}

/// A loaded configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventConfig {
    /// Listener declarations from `[event]`.
    pub events: EventTable,
    /// Logging settings from `[log]`.
    pub log: LogSection,
}

impl EventConfig {
    /// Additively merge a later source into this one.
    ///
    /// For an event present in both, `other`'s callbacks are appended after
    /// the existing ones.
    pub fn merge(&mut self, other: Self) {
        self.events.merge(other.events);
        self.log.merge(other.log);
    }
}
