//! # Sequential dispatcher.
//!
//! [`Dispatcher`] executes listeners strictly in plan order: layers by
//! descending priority, entries inside a layer in topological order, one
//! listener at a time on the caller's stack.
//!
//! ## Recursion
//! A listener may call [`Dispatcher::emit`] itself; the nested emission runs
//! immediately and completely before the outer listener's invocation returns.
//! There is no queueing, no trampolining, and no framework depth guard — an
//! infinite chain (A → B → A) exhausts the native call stack, which the
//! engine does not catch or convert. The registry lock is never held across a
//! listener call, so re-entrant emission cannot deadlock.
//!
//! ## Failure
//! The first failing listener (error return, non-object result, or key
//! conflict) terminates the emission; later entries and layers do not run and
//! no partial merge is returned.
//!
//! ## Example
//! ```rust
//! use serde_json::json;
//! use eventvisor::{Dispatcher, Event, EventMeta, EventType, ListenerEntry, ListenerFn};
//!
//! static GREETING: EventType = EventType::new("greeting");
//!
//! struct Greeting { meta: EventMeta }
//! impl Event for Greeting {
//!     fn event_type(&self) -> &'static EventType { &GREETING }
//!     fn meta(&self) -> &EventMeta { &self.meta }
//!     fn as_any(&self) -> &dyn std::any::Any { self }
//! }
//!
//! let dispatcher = Dispatcher::new();
//! let hello = ListenerFn::arc("hello", |_ev| Ok(Some(json!({"hello": "world"}))));
//! dispatcher.add_listener(&[&GREETING], ListenerEntry::new(hello))?;
//!
//! let merged = dispatcher.emit(Greeting { meta: EventMeta::new() })?;
//! assert_eq!(merged["hello"], "world");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::dispatch::config::DispatcherConfig;
use crate::dispatch::merge::{MergedResult, merge_result};
use crate::error::{DispatchError, RegistryError};
use crate::events::{Event, EventType};
use crate::registry::{ListenerEntry, ListenerKey, ListenerRef, Registry};

/// Synchronous event dispatcher.
///
/// Owns its [`Registry`] one-to-one. A single logical executor is assumed:
/// the dispatcher serializes registry access internally, but concurrent
/// emission from multiple threads is not part of the design.
pub struct Dispatcher {
    registry: Mutex<Registry<ListenerRef>>,
    config: DispatcherConfig,
    closed: AtomicBool,
}

impl Dispatcher {
    /// Creates a dispatcher with default metadata generators.
    pub fn new() -> Self {
        Self::with_config(DispatcherConfig::default())
    }

    /// Creates a dispatcher with the given metadata generators.
    pub fn with_config(config: DispatcherConfig) -> Self {
        Self {
            registry: Mutex::new(Registry::new()),
            config,
            closed: AtomicBool::new(false),
        }
    }

    /// Registers a listener under every type in `event_types`.
    ///
    /// See [`ListenerEntry`] for priority and `after` dependencies. Fails
    /// with [`RegistryError`] on unknown dependencies or cycles; a rejected
    /// call changes nothing.
    pub fn add_listener(
        &self,
        event_types: &[&'static EventType],
        entry: ListenerEntry<ListenerRef>,
    ) -> Result<(), RegistryError> {
        self.registry().add(event_types, entry)
    }

    /// Removes listeners; mode depends on which arguments are present.
    ///
    /// | event_types | callback | effect |
    /// |---|---|---|
    /// | present | present | this callback, from exactly these types |
    /// | present | absent  | all listeners of these types |
    /// | absent  | present | this callback, everywhere |
    /// | absent  | absent  | `InvalidArgument` |
    pub fn remove_listener(
        &self,
        event_types: Option<&[&'static EventType]>,
        callback: Option<ListenerKey>,
    ) -> Result<(), RegistryError> {
        self.registry().remove(event_types, callback)
    }

    /// Dispatches `event`, returning the merged listener results.
    ///
    /// Stamps the event's id and timestamp (one-shot), resolves the plan for
    /// its runtime type, and invokes every matching listener in order.
    pub fn emit<E: Event>(&self, event: E) -> Result<MergedResult, DispatchError> {
        self.emit_arc(Arc::new(event))
    }

    /// Dispatches a pre-allocated event.
    ///
    /// Metadata slots are write-once: re-emitting the same `Arc` keeps the
    /// id and timestamp of its first emission.
    pub fn emit_arc(&self, event: Arc<dyn Event>) -> Result<MergedResult, DispatchError> {
        if self.is_closed() {
            return Err(DispatchError::Closed);
        }
        event
            .meta()
            .stamp((self.config.id_source)(), (self.config.clock)());

        // Clone the plan out so the registry lock is released before any
        // listener runs (listeners may re-enter emit or mutate the registry).
        let plan = self.registry().resolve_order(event.event_type())?;

        let mut merged = MergedResult::new();
        for layer in plan.layers() {
            for entry in layer.entries() {
                let output = entry.callback().on_event(event.as_ref()).map_err(|source| {
                    DispatchError::Listener {
                        listener: entry.name().to_string(),
                        source,
                    }
                })?;
                if let Some(value) = output {
                    merge_result(&mut merged, value, entry.name())?;
                }
            }
        }
        Ok(merged)
    }

    /// Marks the dispatcher closed; later emissions fail with
    /// [`DispatchError::Closed`].
    ///
    /// Idempotent. Nothing is in flight to wait for — all calls are
    /// synchronous by construction.
    pub fn shutdown(&self) {
        self.closed.store(true, AtomicOrdering::SeqCst);
    }

    /// True once [`Dispatcher::shutdown`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(AtomicOrdering::SeqCst)
    }

    fn registry(&self) -> MutexGuard<'_, Registry<ListenerRef>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventMeta;
    use crate::registry::{Callback, ListenerFn};
    use serde_json::json;
    use std::any::Any;
    use std::sync::Mutex as StdMutex;
    use std::time::SystemTime;

    static BASE: EventType = EventType::new("base");
    static DERIVED: EventType = EventType::with_parent("derived", &BASE);
    static PONG: EventType = EventType::new("pong");

    struct Ev {
        meta: EventMeta,
        ty: &'static EventType,
    }

    impl Ev {
        fn new(ty: &'static EventType) -> Self {
            Self {
                meta: EventMeta::new(),
                ty,
            }
        }
    }

    impl Event for Ev {
        fn event_type(&self) -> &'static EventType {
            self.ty
        }
        fn meta(&self) -> &EventMeta {
            &self.meta
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_subtype_emission_merges_across_hierarchy() {
        // Scenario: L1 on Base (priority 0), L2 on Derived (priority 10).
        let dispatcher = Dispatcher::new();
        let order = Arc::new(StdMutex::new(Vec::<&'static str>::new()));

        let o = order.clone();
        let l1 = ListenerFn::arc("l1", move |_ev| {
            o.lock().unwrap().push("l1");
            Ok(Some(json!({"a": 1})))
        });
        let o = order.clone();
        let l2 = ListenerFn::arc("l2", move |_ev| {
            o.lock().unwrap().push("l2");
            Ok(Some(json!({"b": 2})))
        });

        dispatcher.add_listener(&[&BASE], ListenerEntry::new(l1)).unwrap();
        dispatcher
            .add_listener(&[&DERIVED], ListenerEntry::new(l2).with_priority(10))
            .unwrap();

        let merged = dispatcher.emit(Ev::new(&DERIVED)).unwrap();
        assert_eq!(serde_json::Value::Object(merged), json!({"a": 1, "b": 2}));
        assert_eq!(*order.lock().unwrap(), ["l2", "l1"]);
    }

    #[test]
    fn test_key_conflict_fails_and_names_key() {
        // Scenario: same layer, l2 after l1, both return {"x": 1}.
        let dispatcher = Dispatcher::new();
        let l1 = ListenerFn::arc("l1", |_ev| Ok(Some(json!({"x": 1}))));
        let l2 = ListenerFn::arc("l2", |_ev| Ok(Some(json!({"x": 1}))));

        dispatcher
            .add_listener(&[&BASE], ListenerEntry::new(l1.clone()))
            .unwrap();
        dispatcher
            .add_listener(&[&BASE], ListenerEntry::new(l2).with_after(&l1))
            .unwrap();

        let err = dispatcher.emit(Ev::new(&BASE)).unwrap_err();
        match err {
            DispatchError::KeyConflict { listener, keys } => {
                assert_eq!(listener, "l2");
                assert_eq!(keys, ["x"]);
            }
            other => panic!("expected KeyConflict, got {other:?}"),
        }
    }

    #[test]
    fn test_later_layers_do_not_run_after_failure() {
        let dispatcher = Dispatcher::new();
        let ran_low = Arc::new(StdMutex::new(false));

        let failing = ListenerFn::arc("failing", |_ev| Err("boom".into()));
        let flag = ran_low.clone();
        let low = ListenerFn::arc("low", move |_ev| {
            *flag.lock().unwrap() = true;
            Ok(None)
        });

        dispatcher
            .add_listener(&[&BASE], ListenerEntry::new(failing).with_priority(10))
            .unwrap();
        dispatcher
            .add_listener(&[&BASE], ListenerEntry::new(low))
            .unwrap();

        let err = dispatcher.emit(Ev::new(&BASE)).unwrap_err();
        match err {
            DispatchError::Listener { listener, source } => {
                assert_eq!(listener, "failing");
                assert_eq!(source.to_string(), "boom");
            }
            other => panic!("expected Listener, got {other:?}"),
        }
        assert!(!*ran_low.lock().unwrap());
    }

    #[test]
    fn test_non_object_result_rejected() {
        let dispatcher = Dispatcher::new();
        let bad = ListenerFn::arc("bad", |_ev| Ok(Some(json!(42))));
        dispatcher.add_listener(&[&BASE], ListenerEntry::new(bad)).unwrap();

        let err = dispatcher.emit(Ev::new(&BASE)).unwrap_err();
        match err {
            DispatchError::InvalidResult { listener, found } => {
                assert_eq!(listener, "bad");
                assert_eq!(found, "number");
            }
            other => panic!("expected InvalidResult, got {other:?}"),
        }
    }

    #[test]
    fn test_none_results_contribute_nothing() {
        let dispatcher = Dispatcher::new();
        dispatcher
            .add_listener(&[&BASE], ListenerEntry::new(ListenerFn::arc("quiet", |_ev| Ok(None))))
            .unwrap();
        assert!(dispatcher.emit(Ev::new(&BASE)).unwrap().is_empty());
    }

    #[test]
    fn test_metadata_stamped_once() {
        let dispatcher = Dispatcher::with_config(
            DispatcherConfig::default().with_clock(Arc::new(|| SystemTime::UNIX_EPOCH)),
        );

        let ev: Arc<dyn Event> = Arc::new(Ev::new(&BASE));
        dispatcher.emit_arc(ev.clone()).unwrap();
        assert_eq!(ev.meta().id(), Some(1));
        assert_eq!(ev.meta().timestamp(), Some(SystemTime::UNIX_EPOCH));

        // Re-emitting the same value keeps its original metadata.
        dispatcher.emit_arc(ev.clone()).unwrap();
        assert_eq!(ev.meta().id(), Some(1));

        // A fresh event gets the next id.
        let fresh: Arc<dyn Event> = Arc::new(Ev::new(&BASE));
        dispatcher.emit_arc(fresh.clone()).unwrap();
        assert_eq!(fresh.meta().id(), Some(3));
    }

    #[test]
    fn test_duplicate_registration_runs_twice() {
        let dispatcher = Dispatcher::new();
        let count = Arc::new(StdMutex::new(0u32));
        let c = count.clone();
        let l = ListenerFn::arc("counted", move |_ev| {
            *c.lock().unwrap() += 1;
            Ok(None)
        });

        dispatcher
            .add_listener(&[&BASE], ListenerEntry::new(l.clone()))
            .unwrap();
        dispatcher.add_listener(&[&BASE], ListenerEntry::new(l)).unwrap();

        dispatcher.emit(Ev::new(&BASE)).unwrap();
        assert_eq!(*count.lock().unwrap(), 2);
    }

    #[test]
    fn test_nested_emit_recurses_directly() {
        let dispatcher = Arc::new(Dispatcher::new());
        let order = Arc::new(StdMutex::new(Vec::<&'static str>::new()));

        let o = order.clone();
        let inner = ListenerFn::arc("inner", move |_ev| {
            o.lock().unwrap().push("inner");
            Ok(Some(json!({"inner": true})))
        });
        dispatcher.add_listener(&[&PONG], ListenerEntry::new(inner)).unwrap();

        let d = dispatcher.clone();
        let o = order.clone();
        let outer = ListenerFn::arc("outer", move |_ev| {
            o.lock().unwrap().push("outer-before");
            let nested = d.emit(Ev::new(&PONG))?;
            assert_eq!(nested["inner"], true);
            o.lock().unwrap().push("outer-after");
            Ok(None)
        });
        dispatcher.add_listener(&[&BASE], ListenerEntry::new(outer)).unwrap();

        dispatcher.emit(Ev::new(&BASE)).unwrap();
        assert_eq!(
            *order.lock().unwrap(),
            ["outer-before", "inner", "outer-after"]
        );
    }

    #[test]
    fn test_shutdown_is_idempotent_and_rejects_emit() {
        let dispatcher = Dispatcher::new();
        dispatcher.shutdown();
        dispatcher.shutdown();
        assert!(dispatcher.is_closed());

        let err = dispatcher.emit(Ev::new(&BASE)).unwrap_err();
        assert!(matches!(err, DispatchError::Closed));
    }

    #[test]
    fn test_listener_can_mutate_registry_mid_emit() {
        // A listener that unregisters itself: the running plan is a snapshot,
        // the next emission sees the change.
        let dispatcher = Arc::new(Dispatcher::new());
        let count = Arc::new(StdMutex::new(0u32));

        let d = dispatcher.clone();
        let c = count.clone();
        let once_holder: Arc<StdMutex<Option<ListenerKey>>> = Arc::new(StdMutex::new(None));
        let key_cell = once_holder.clone();
        let once = ListenerFn::arc("once", move |_ev| {
            *c.lock().unwrap() += 1;
            let key = key_cell.lock().unwrap().take();
            if let Some(key) = key {
                d.remove_listener(None, Some(key))?;
            }
            Ok(None)
        });
        *once_holder.lock().unwrap() = Some(once.key());

        dispatcher.add_listener(&[&BASE], ListenerEntry::new(once)).unwrap();

        dispatcher.emit(Ev::new(&BASE)).unwrap();
        dispatcher.emit(Ev::new(&BASE)).unwrap();
        assert_eq!(*count.lock().unwrap(), 1);
    }
}
