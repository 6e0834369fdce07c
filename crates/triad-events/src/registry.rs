//! Listener registry and dispatcher.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;
use tracing::{debug, debug_span, trace};

use crate::error::EventResult;
use crate::listener::{Listener, ListenerHandle, ListenerResult, NamedListener};
use crate::pattern::{EventPattern, PREFIX_MARKER};
use crate::response::{FailureKind, ListenerFailure, PublishOutcome, Response};
use crate::sink::ErrorSink;

/// Listeners registered under one key, in handle order.
type Bucket = BTreeMap<ListenerHandle, Arc<dyn Listener>>;

#[derive(Default)]
struct RegistryState {
    exact: HashMap<String, Bucket>,
    prefixed: BTreeMap<String, Bucket>,
    last_handle: u64,
}

impl RegistryState {
    // A u64 counter is never exhausted by registrations.
    #[allow(clippy::arithmetic_side_effects)]
    fn mint(&mut self) -> ListenerHandle {
        self.last_handle += 1;
        ListenerHandle::new(self.last_handle)
    }

    /// Every bucket whose key matches `event`: the exact bucket plus all
    /// prefix buckets whose prefix starts `event`.
    fn matching_buckets<'a>(&'a self, event: &'a str) -> impl Iterator<Item = &'a Bucket> + 'a {
        self.exact.get(event).into_iter().chain(
            self.prefixed
                .iter()
                .filter(move |(prefix, _)| event.starts_with(prefix.as_str()))
                .map(|(_, bucket)| bucket),
        )
    }

    fn len(&self) -> usize {
        self.exact
            .values()
            .chain(self.prefixed.values())
            .map(BTreeMap::len)
            .sum()
    }
}

/// A listener selected for a publish, with its handle.
#[derive(Clone)]
pub struct ResolvedListener {
    /// Registration handle.
    pub handle: ListenerHandle,
    /// The listener.
    pub listener: Arc<dyn Listener>,
}

impl std::fmt::Debug for ResolvedListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedListener")
            .field("handle", &self.handle)
            .field("listener", &self.listener.name())
            .finish()
    }
}

/// A registration as reported by [`Registry::list_all`].
#[derive(Clone)]
pub struct RegisteredListener {
    /// Registration handle.
    pub handle: ListenerHandle,
    /// Name the listener was registered under, with the prefix marker
    /// re-appended for prefix subscriptions.
    pub event_name: String,
    /// The listener.
    pub listener: Arc<dyn Listener>,
}

impl std::fmt::Debug for RegisteredListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredListener")
            .field("handle", &self.handle)
            .field("event_name", &self.event_name)
            .field("listener", &self.listener.name())
            .finish()
    }
}

/// Registry of exact and prefix listeners.
///
/// The registry is `Send + Sync`; share it behind an `Arc`. Mutations and
/// listener resolution are serialized by a single lock, but listeners are
/// always invoked after the lock has been released, so a listener may
/// subscribe, unsubscribe or publish re-entrantly.
#[derive(Default)]
pub struct Registry {
    state: RwLock<RegistryState>,
    sink: Option<Arc<dyn ErrorSink>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("Registry")
            .field("exact_names", &state.exact.len())
            .field("prefixes", &state.prefixed.len())
            .field("listener_count", &state.len())
            .field("has_error_sink", &self.sink.is_some())
            .finish()
    }
}

impl Registry {
    /// Create an empty registry without an error sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an error sink that receives every captured listener failure.
    #[must_use]
    pub fn with_error_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a listener.
    ///
    /// A name ending in `*` registers a prefix subscription for the name
    /// without the marker. Returns a handle greater than every handle issued
    /// before.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::EmptyEventName`](crate::EventError::EmptyEventName)
    /// if `event` is empty. No handle is consumed in that case.
    pub fn subscribe(
        &self,
        event: &str,
        listener: Arc<dyn Listener>,
    ) -> EventResult<ListenerHandle> {
        let pattern = EventPattern::parse(event)?;
        let name = listener.name().to_owned();

        let handle = {
            let mut state = self.write();
            let handle = state.mint();
            let (map_kind, bucket) = match pattern {
                EventPattern::Exact(key) => ("exact", state.exact.entry(key).or_default()),
                EventPattern::Prefix(key) => ("prefix", state.prefixed.entry(key).or_default()),
            };
            bucket.insert(handle, listener);
            trace!(%handle, kind = map_kind, "Listener stored");
            handle
        };

        debug!(%handle, event = %event, listener = %name, "Listener subscribed");
        Ok(handle)
    }

    /// Register a closure under a name used in diagnostics.
    ///
    /// # Errors
    ///
    /// See [`Registry::subscribe`].
    pub fn subscribe_fn<F>(
        &self,
        event: &str,
        name: impl Into<String>,
        handler: F,
    ) -> EventResult<ListenerHandle>
    where
        F: Fn(&Value, &str) -> ListenerResult + Send + Sync + 'static,
    {
        self.subscribe(event, Arc::new(NamedListener::new(name, handler)))
    }

    /// Remove an exact-name registration.
    ///
    /// Returns `true` if `handle` was registered under exactly `event`.
    /// Prefix registrations are not removable through this method: a name
    /// carrying the marker never matches an exact bucket and returns `false`.
    pub fn unsubscribe(&self, event: &str, handle: ListenerHandle) -> bool {
        let removed = {
            let mut state = self.write();
            let Some(bucket) = state.exact.get_mut(event) else {
                if event.ends_with(PREFIX_MARKER) {
                    debug!(%handle, event = %event, "Prefix registrations cannot be unsubscribed");
                }
                return false;
            };
            let removed = bucket.remove(&handle);
            if bucket.is_empty() {
                state.exact.remove(event);
            }
            removed
        };

        // Dropped outside the lock: a listener's destructor may publish.
        match removed {
            Some(listener) => {
                debug!(%handle, event = %event, listener = %listener.name(), "Listener unsubscribed");
                drop(listener);
                true
            },
            None => false,
        }
    }

    /// Listeners that would run for `event`, in ascending handle order.
    ///
    /// Includes the exact bucket for `event` and every prefix bucket whose
    /// prefix starts `event`. The returned snapshot is unaffected by later
    /// registry changes.
    #[must_use]
    pub fn resolve_listeners(&self, event: &str) -> Vec<ResolvedListener> {
        let state = self.read();
        let merged: BTreeMap<ListenerHandle, &Arc<dyn Listener>> = state
            .matching_buckets(event)
            .flat_map(|bucket| bucket.iter().map(|(handle, listener)| (*handle, listener)))
            .collect();

        merged
            .into_iter()
            .map(|(handle, listener)| ResolvedListener {
                handle,
                listener: Arc::clone(listener),
            })
            .collect()
    }

    /// Check whether publishing `event` would invoke at least one listener.
    #[must_use]
    pub fn has_listener(&self, event: &str) -> bool {
        self.read()
            .matching_buckets(event)
            .any(|bucket| !bucket.is_empty())
    }

    /// Every registration in ascending handle order.
    #[must_use]
    pub fn list_all(&self) -> Vec<RegisteredListener> {
        let state = self.read();
        let exact = state
            .exact
            .iter()
            .flat_map(|(name, bucket)| bucket.iter().map(move |(h, l)| (*h, name.clone(), l)));
        let prefixed = state.prefixed.iter().flat_map(|(prefix, bucket)| {
            bucket
                .iter()
                .map(move |(h, l)| (*h, format!("{prefix}{PREFIX_MARKER}"), l))
        });

        let mut all: Vec<RegisteredListener> = exact
            .chain(prefixed)
            .map(|(handle, event_name, listener)| RegisteredListener {
                handle,
                event_name,
                listener: Arc::clone(listener),
            })
            .collect();
        all.sort_unstable_by_key(|entry| entry.handle);
        all
    }

    /// Number of registrations, exact and prefix.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Check if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Publish an event and collect every listener's response.
    ///
    /// Listeners run in handle order. A listener returning `false` stops
    /// dispatch after its response is recorded. Failures are captured as
    /// [`Response::Failed`] and do not stop dispatch.
    pub fn publish(&self, event: &str, payload: &Value) -> Vec<Response> {
        match self.dispatch(event, payload, false) {
            PublishOutcome::Responses(responses) => responses,
            PublishOutcome::Halted(_) => Vec::new(),
        }
    }

    /// Publish an event and return the first non-null value.
    ///
    /// Dispatch stops at the first listener returning anything other than
    /// `null`, including `false`. Failures are skipped. Returns `None` if no
    /// listener produced a value.
    pub fn publish_until(&self, event: &str, payload: &Value) -> Option<Value> {
        match self.dispatch(event, payload, true) {
            PublishOutcome::Halted(value) => value,
            PublishOutcome::Responses(_) => None,
        }
    }

    /// Publish with the halting policy chosen at runtime.
    pub fn emit(&self, event: &str, payload: &Value, halt: bool) -> PublishOutcome {
        self.dispatch(event, payload, halt)
    }

    fn dispatch(&self, event: &str, payload: &Value, halt: bool) -> PublishOutcome {
        let span = debug_span!("publish", event = %event, halt);
        let _guard = span.enter();

        let listeners = self.resolve_listeners(event);
        trace!(count = listeners.len(), "Resolved listeners");

        let mut responses = Vec::with_capacity(if halt { 0 } else { listeners.len() });
        for resolved in &listeners {
            let value = match invoke(resolved, payload, event) {
                Ok(value) => value,
                Err(failure) => {
                    self.report(&failure);
                    if !halt {
                        responses.push(Response::Failed(failure));
                    }
                    continue;
                },
            };

            if halt && !value.is_null() {
                trace!(handle = %resolved.handle, "Halted on first result");
                return PublishOutcome::Halted(Some(value));
            }

            let stop = value == Value::Bool(false);
            if !halt {
                responses.push(Response::Value(value));
            }
            if stop {
                trace!(handle = %resolved.handle, "Listener returned false, stopping dispatch");
                break;
            }
        }

        if halt {
            PublishOutcome::Halted(None)
        } else {
            PublishOutcome::Responses(responses)
        }
    }

    fn report(&self, failure: &ListenerFailure) {
        match &self.sink {
            Some(sink) => sink.log_error(failure),
            None => trace!(handle = %failure.handle, error = %failure.message, "Listener failed"),
        }
    }
}

/// Invoke one listener, turning errors and panics into a failure record.
fn invoke(
    resolved: &ResolvedListener,
    payload: &Value,
    event: &str,
) -> Result<Value, ListenerFailure> {
    trace!(handle = %resolved.handle, listener = %resolved.listener.name(), "Invoking listener");

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        resolved.listener.call(payload, event)
    }));

    let (kind, message) = match result {
        Ok(Ok(value)) => return Ok(value),
        Ok(Err(e)) => (FailureKind::Error, e.to_string()),
        Err(panic) => (FailureKind::Panic, panic_message(panic.as_ref())),
    };

    Err(ListenerFailure {
        handle: resolved.handle,
        listener: resolved.listener.name().to_owned(),
        event: event.to_owned(),
        kind,
        message,
        occurred_at: chrono::Utc::now(),
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EventError, ListenerError};
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type CallLog = Arc<Mutex<Vec<&'static str>>>;

    fn recording(log: &CallLog, tag: &'static str, result: Value) -> Arc<dyn Listener> {
        let log = Arc::clone(log);
        Arc::new(NamedListener::new(tag, move |_: &Value, _: &str| {
            log.lock().unwrap().push(tag);
            Ok(result.clone())
        }))
    }

    fn failing(log: &CallLog, tag: &'static str) -> Arc<dyn Listener> {
        let log = Arc::clone(log);
        Arc::new(NamedListener::new(tag, move |_: &Value, _: &str| {
            log.lock().unwrap().push(tag);
            Err(ListenerError::msg("listener exploded"))
        }))
    }

    fn calls(log: &CallLog) -> Vec<&'static str> {
        log.lock().unwrap().clone()
    }

    fn values(responses: &[Response]) -> Vec<Value> {
        responses
            .iter()
            .map(|r| r.value().cloned().unwrap_or(json!("<failed>")))
            .collect()
    }

    #[test]
    fn test_handles_strictly_increase() {
        let registry = Registry::new();
        let log = CallLog::default();

        let h1 = registry.subscribe("a", recording(&log, "1", json!(1))).unwrap();
        let h2 = registry.subscribe("b*", recording(&log, "2", json!(2))).unwrap();
        assert!(registry.unsubscribe("a", h1));
        let h3 = registry.subscribe("a", recording(&log, "3", json!(3))).unwrap();

        assert!(h1 < h2);
        assert!(h2 < h3);
        assert_ne!(h1, h3);
    }

    #[test]
    fn test_empty_name_rejected_without_consuming_handle() {
        let registry = Registry::new();
        let log = CallLog::default();

        let h1 = registry.subscribe("a", recording(&log, "1", json!(1))).unwrap();
        let err = registry.subscribe("", recording(&log, "x", json!(0)));
        assert_eq!(err.unwrap_err(), EventError::EmptyEventName);
        let h2 = registry.subscribe("a", recording(&log, "2", json!(2))).unwrap();

        assert_eq!(h2.get(), h1.get().saturating_add(1));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_exact_and_prefix_resolution() {
        let registry = Registry::new();
        let log = CallLog::default();

        let h_a = registry.subscribe("a*", recording(&log, "a*", json!(1))).unwrap();
        let h_exact = registry.subscribe("abc", recording(&log, "abc", json!(2))).unwrap();
        let h_ab = registry.subscribe("ab*", recording(&log, "ab*", json!(3))).unwrap();
        registry.subscribe("b*", recording(&log, "b*", json!(4))).unwrap();
        registry.subscribe("abcd", recording(&log, "abcd", json!(5))).unwrap();

        let handles: Vec<_> = registry
            .resolve_listeners("abc")
            .into_iter()
            .map(|r| r.handle)
            .collect();
        assert_eq!(handles, vec![h_a, h_exact, h_ab]);

        let responses = registry.publish("abc", &json!({}));
        assert_eq!(values(&responses), vec![json!(1), json!(2), json!(3)]);
        assert_eq!(calls(&log), vec!["a*", "abc", "ab*"]);
    }

    #[test]
    fn test_prefix_matches_bare_prefix() {
        let registry = Registry::new();
        let log = CallLog::default();
        registry.subscribe("user*", recording(&log, "user*", json!(1))).unwrap();

        assert!(registry.has_listener("user"));
        assert!(registry.has_listener("user.created"));
        assert!(!registry.has_listener("use"));
    }

    #[test]
    fn test_registration_order_across_buckets() {
        let registry = Registry::new();
        let log = CallLog::default();

        registry.subscribe("order.paid", recording(&log, "first", json!(1))).unwrap();
        registry.subscribe("order.*", recording(&log, "second", json!(2))).unwrap();
        registry.subscribe("order.paid", recording(&log, "third", json!(3))).unwrap();

        registry.publish("order.paid", &Value::Null);
        assert_eq!(calls(&log), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_false_stops_dispatch() {
        let registry = Registry::new();
        let log = CallLog::default();

        registry.subscribe("e", recording(&log, "l1", json!("v1"))).unwrap();
        registry.subscribe("e", recording(&log, "l2", json!(false))).unwrap();
        registry.subscribe("e", recording(&log, "l3", json!("v3"))).unwrap();

        let responses = registry.publish("e", &Value::Null);
        assert_eq!(values(&responses), vec![json!("v1"), json!(false)]);
        assert_eq!(calls(&log), vec!["l1", "l2"]);
    }

    #[test]
    fn test_halt_on_first_result() {
        let registry = Registry::new();
        let log = CallLog::default();

        registry.subscribe("e", recording(&log, "l1", Value::Null)).unwrap();
        registry.subscribe("e", recording(&log, "l2", json!("x"))).unwrap();
        registry.subscribe("e", recording(&log, "l3", json!("y"))).unwrap();

        assert_eq!(registry.publish_until("e", &Value::Null), Some(json!("x")));
        assert_eq!(calls(&log), vec!["l1", "l2"]);
    }

    #[test]
    fn test_halt_without_result_is_none() {
        let registry = Registry::new();
        let log = CallLog::default();

        assert_eq!(registry.publish_until("e", &Value::Null), None);

        registry.subscribe("e", recording(&log, "l1", Value::Null)).unwrap();
        registry.subscribe("e", failing(&log, "l2")).unwrap();

        let outcome = registry.emit("e", &Value::Null, true);
        assert_eq!(outcome, PublishOutcome::Halted(None));
        assert_eq!(calls(&log), vec!["l1", "l2"]);
    }

    #[test]
    fn test_halt_returns_false() {
        let registry = Registry::new();
        let log = CallLog::default();

        registry.subscribe("e", recording(&log, "l1", json!(false))).unwrap();
        registry.subscribe("e", recording(&log, "l2", json!("later"))).unwrap();

        assert_eq!(registry.publish_until("e", &Value::Null), Some(json!(false)));
        assert_eq!(calls(&log), vec!["l1"]);
    }

    #[test]
    fn test_failure_is_contained() {
        let registry = Registry::new();
        let log = CallLog::default();

        let h1 = registry.subscribe("e", failing(&log, "l1")).unwrap();
        registry.subscribe("e", recording(&log, "l2", json!("ok"))).unwrap();

        let responses = registry.publish("e", &json!({"id": 1}));
        assert_eq!(responses.len(), 2);

        let failure = responses[0].failure().unwrap();
        assert_eq!(failure.handle, h1);
        assert_eq!(failure.listener, "l1");
        assert_eq!(failure.event, "e");
        assert_eq!(failure.kind, FailureKind::Error);
        assert_eq!(failure.message, "listener exploded");
        assert_eq!(responses[1].value(), Some(&json!("ok")));
        assert_eq!(calls(&log), vec!["l1", "l2"]);
    }

    #[test]
    fn test_panic_is_contained() {
        let registry = Registry::new();
        registry
            .subscribe_fn("e", "panicky", |_: &Value, _: &str| -> ListenerResult {
                panic!("kaboom")
            })
            .unwrap();
        registry
            .subscribe_fn("e", "steady", |_: &Value, _: &str| Ok(json!("ok")))
            .unwrap();

        let responses = registry.publish("e", &Value::Null);
        let failure = responses[0].failure().unwrap();
        assert_eq!(failure.kind, FailureKind::Panic);
        assert_eq!(failure.message, "kaboom");
        assert_eq!(responses[1].value(), Some(&json!("ok")));
    }

    #[test]
    fn test_error_sink_receives_failures() {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let sink_log = Arc::clone(&captured);
        let sink = move |failure: &ListenerFailure| {
            sink_log.lock().unwrap().push(failure.clone());
        };

        let registry = Registry::new().with_error_sink(Arc::new(sink));
        let log = CallLog::default();
        let handle = registry.subscribe("e", failing(&log, "bad")).unwrap();

        registry.publish("e", &Value::Null);
        registry.publish_until("e", &Value::Null);

        let captured = captured.lock().unwrap();
        assert_eq!(captured.len(), 2);
        assert!(captured.iter().all(|f| f.handle == handle));
    }

    #[test]
    fn test_listener_receives_payload_and_event_name() {
        let registry = Registry::new();
        registry
            .subscribe_fn("user.*", "echo", |payload: &Value, event: &str| {
                Ok(json!({ "event": event, "id": payload["id"] }))
            })
            .unwrap();

        let responses = registry.publish("user.deleted", &json!({"id": 7}));
        assert_eq!(
            responses[0].value(),
            Some(&json!({ "event": "user.deleted", "id": 7 }))
        );
    }

    #[test]
    fn test_unsubscribe_missing_leaves_state_unchanged() {
        let registry = Registry::new();
        let log = CallLog::default();

        let h1 = registry.subscribe("a", recording(&log, "1", json!(1))).unwrap();
        let h2 = registry.subscribe("a*", recording(&log, "2", json!(2))).unwrap();

        let before: Vec<_> = registry.list_all().into_iter().map(|e| e.handle).collect();

        assert!(!registry.unsubscribe("a", h2));
        assert!(!registry.unsubscribe("b", h1));
        assert!(!registry.unsubscribe("a", ListenerHandle::new(999)));

        let after: Vec<_> = registry.list_all().into_iter().map(|e| e.handle).collect();
        assert_eq!(before, after);
        let resolved: Vec<_> = registry
            .resolve_listeners("a")
            .into_iter()
            .map(|r| r.handle)
            .collect();
        assert_eq!(resolved, vec![h1, h2]);
    }

    #[test]
    fn test_unsubscribe_prefix_is_noop() {
        let registry = Registry::new();
        let log = CallLog::default();

        let handle = registry.subscribe("a*", recording(&log, "p", json!(1))).unwrap();
        assert!(!registry.unsubscribe("a*", handle));
        assert!(!registry.unsubscribe("a", handle));
        assert!(registry.has_listener("abc"));
    }

    #[test]
    fn test_unsubscribe_removes_exact() {
        let registry = Registry::new();
        let log = CallLog::default();

        let handle = registry.subscribe("a", recording(&log, "1", json!(1))).unwrap();
        assert!(registry.unsubscribe("a", handle));
        assert!(!registry.unsubscribe("a", handle));
        assert!(!registry.has_listener("a"));
        assert!(registry.is_empty());
        assert!(registry.publish("a", &Value::Null).is_empty());
    }

    #[test]
    fn test_has_listener_agrees_with_resolve() {
        let registry = Registry::new();
        let log = CallLog::default();
        let names = ["", "a", "ab", "abc", "b", "x.y"];

        for name in names {
            assert_eq!(registry.has_listener(name), !registry.resolve_listeners(name).is_empty());
        }

        registry.subscribe("ab*", recording(&log, "1", json!(1))).unwrap();
        let handle = registry.subscribe("x.y", recording(&log, "2", json!(2))).unwrap();
        registry.unsubscribe("x.y", handle);

        for name in names {
            assert_eq!(registry.has_listener(name), !registry.resolve_listeners(name).is_empty());
        }
        assert!(registry.has_listener("abc"));
        assert!(!registry.has_listener("x.y"));
    }

    #[test]
    fn test_list_all_orders_by_handle() {
        let registry = Registry::new();
        let log = CallLog::default();

        registry.subscribe("z", recording(&log, "1", json!(1))).unwrap();
        registry.subscribe("a*", recording(&log, "2", json!(2))).unwrap();
        registry.subscribe("m", recording(&log, "3", json!(3))).unwrap();
        registry.subscribe("*", recording(&log, "4", json!(4))).unwrap();

        let names: Vec<_> = registry
            .list_all()
            .into_iter()
            .map(|e| (e.event_name, e.listener.name().to_owned()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("z".to_owned(), "1".to_owned()),
                ("a*".to_owned(), "2".to_owned()),
                ("m".to_owned(), "3".to_owned()),
                ("*".to_owned(), "4".to_owned()),
            ]
        );
    }

    #[test]
    fn test_reentrant_subscribe_from_listener() {
        let registry = Arc::new(Registry::new());
        let inner = Arc::downgrade(&registry);
        let added = Arc::new(AtomicUsize::new(0));
        let added_clone = Arc::clone(&added);

        registry
            .subscribe_fn("e", "spawner", move |_: &Value, _: &str| {
                if let Some(registry) = inner.upgrade() {
                    registry.subscribe_fn("e", "late", |_: &Value, _: &str| Ok(json!("late")))?;
                    added_clone.fetch_add(1, Ordering::SeqCst);
                }
                Ok(Value::Null)
            })
            .unwrap();

        // The snapshot taken at publish time excludes the listener added during dispatch.
        assert_eq!(registry.publish("e", &Value::Null).len(), 1);
        assert_eq!(added.load(Ordering::SeqCst), 1);
        assert_eq!(registry.publish("e", &Value::Null).len(), 2);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_drop_publishing_listener_does_not_deadlock() {
        struct PublishOnDrop(std::sync::Weak<Registry>);

        impl Drop for PublishOnDrop {
            fn drop(&mut self) {
                if let Some(registry) = self.0.upgrade() {
                    registry.publish("dropped", &Value::Null);
                }
            }
        }

        let registry = Arc::new(Registry::new());
        let guard = PublishOnDrop(Arc::downgrade(&registry));
        let handle = registry
            .subscribe_fn("e", "holder", move |_: &Value, _: &str| {
                let _ = &guard;
                Ok(Value::Null)
            })
            .unwrap();

        assert!(registry.unsubscribe("e", handle));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_subscribe_yields_unique_handles() {
        let registry = Arc::new(Registry::new());
        let mut tasks = Vec::new();

        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                (0..50)
                    .map(|_| {
                        registry
                            .subscribe_fn("load.*", "worker", |_: &Value, _: &str| Ok(json!(1)))
                            .unwrap()
                    })
                    .collect::<Vec<_>>()
            }));
        }

        let mut handles = Vec::new();
        for task in tasks {
            handles.extend(task.await.unwrap());
        }
        handles.sort_unstable();
        handles.dedup();

        assert_eq!(handles.len(), 400);
        assert_eq!(registry.publish("load.test", &Value::Null).len(), 400);
    }
}
