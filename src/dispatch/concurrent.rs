//! # Layered-concurrent dispatcher.
//!
//! [`AsyncDispatcher`] shares plan resolution and metadata stamping with the
//! sequential [`Dispatcher`](crate::Dispatcher), but executes each priority
//! layer as one structured-concurrency scope:
//!
//! ```text
//! for layer in plan (priority descending):
//!     ├─► spawn every entry into one JoinSet, in topological order
//!     ├─► await all siblings jointly
//!     │     ├─ any failure ──► abort_all (best-effort cancel), keep draining,
//!     │     │                  fail with Aggregate { every observed failure }
//!     │     └─ all succeed ──► merge results in launch order
//!     └─► next layer only after the scope is fully drained
//! ```
//!
//! ## Rules
//! - Layers never overlap; siblings within a layer freely interleave.
//! - Launch order is the topological order, so merge conflicts are attributed
//!   deterministically even though completion order is not.
//! - Listener panics are caught per task (`catch_unwind`) and surface as
//!   [`DispatchError::Panicked`] inside the aggregate instead of tearing down
//!   the runtime.
//! - A listener awaiting its own nested `emit` suspends at that await point;
//!   the nested emission runs to completion through its own layers first.
//!   There is no framework depth guard, matching the sequential strategy.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use serde_json::Value;
use tokio::task::JoinSet;

use crate::dispatch::config::DispatcherConfig;
use crate::dispatch::merge::{MergedResult, merge_result};
use crate::error::{DispatchError, RegistryError};
use crate::events::{Event, EventType};
use crate::registry::{AsyncListenerRef, ListenerEntry, ListenerKey, ListenerOutput, Registry};

/// Asynchronous event dispatcher with same-priority parallelism.
///
/// Owns its [`Registry`] one-to-one, like the sequential dispatcher. Assumes
/// one cooperative scheduler; the registry lock is only held to register or
/// to resolve a plan, never across an await.
pub struct AsyncDispatcher {
    registry: Mutex<Registry<AsyncListenerRef>>,
    config: DispatcherConfig,
    closed: AtomicBool,
}

impl AsyncDispatcher {
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
    /// Same contract as the sequential dispatcher: unknown dependencies and
    /// cycles are rejected with nothing changed.
    pub fn add_listener(
        &self,
        event_types: &[&'static EventType],
        entry: ListenerEntry<AsyncListenerRef>,
    ) -> Result<(), RegistryError> {
        self.registry().add(event_types, entry)
    }

    /// Removes listeners; mode depends on which arguments are present (see
    /// [`Dispatcher::remove_listener`](crate::Dispatcher::remove_listener)).
    pub fn remove_listener(
        &self,
        event_types: Option<&[&'static EventType]>,
        callback: Option<ListenerKey>,
    ) -> Result<(), RegistryError> {
        self.registry().remove(event_types, callback)
    }

    /// Dispatches `event`, returning the merged listener results.
    pub async fn emit<E: Event>(&self, event: E) -> Result<MergedResult, DispatchError> {
        self.emit_arc(Arc::new(event)).await
    }

    /// Dispatches a pre-allocated event.
    ///
    /// Metadata slots are write-once: re-emitting the same `Arc` keeps the
    /// id and timestamp of its first emission.
    pub async fn emit_arc(&self, event: Arc<dyn Event>) -> Result<MergedResult, DispatchError> {
        if self.is_closed() {
            return Err(DispatchError::Closed);
        }
        event
            .meta()
            .stamp((self.config.id_source)(), (self.config.clock)());

        let plan = self.registry().resolve_order(event.event_type())?;

        let mut merged = MergedResult::new();
        for layer in plan.layers() {
            let entries = layer.entries();
            let mut scope: JoinSet<(usize, Result<ListenerOutput, String>)> = JoinSet::new();
            for (index, entry) in entries.iter().enumerate() {
                let callback = entry.callback().clone();
                let ev = Arc::clone(&event);
                scope.spawn(async move {
                    match AssertUnwindSafe(callback.on_event(ev)).catch_unwind().await {
                        Ok(output) => (index, Ok(output)),
                        Err(payload) => (index, Err(panic_message(payload))),
                    }
                });
            }

            let mut slots: Vec<Option<Value>> = Vec::new();
            slots.resize_with(entries.len(), || None);
            let mut failures: Vec<(usize, DispatchError)> = Vec::new();

            while let Some(joined) = scope.join_next().await {
                match joined {
                    Ok((index, Ok(Ok(output)))) => {
                        if let Some(value) = output {
                            slots[index] = Some(value);
                        }
                    }
                    Ok((index, Ok(Err(source)))) => {
                        failures.push((
                            index,
                            DispatchError::Listener {
                                listener: entries[index].name().to_string(),
                                source,
                            },
                        ));
                        scope.abort_all();
                    }
                    Ok((index, Err(info))) => {
                        failures.push((
                            index,
                            DispatchError::Panicked {
                                listener: entries[index].name().to_string(),
                                info,
                            },
                        ));
                        scope.abort_all();
                    }
                    // Cancelled siblings surface here after abort_all; their
                    // non-results are not failures of their own.
                    Err(_aborted) => {}
                }
            }

            if !failures.is_empty() {
                failures.sort_by_key(|&(index, _)| index);
                return Err(DispatchError::Aggregate {
                    errors: failures.into_iter().map(|(_, e)| e).collect(),
                });
            }

            // Merge in launch (topological) order, not completion order, so
            // conflict attribution is deterministic across runs.
            for (index, slot) in slots.into_iter().enumerate() {
                if let Some(value) = slot {
                    merge_result(&mut merged, value, entries[index].name())?;
                }
            }
        }
        Ok(merged)
    }

    /// Marks the dispatcher closed; later emissions fail with
    /// [`DispatchError::Closed`].
    ///
    /// Idempotent. No queued work exists to drain — this design performs no
    /// queueing.
    pub fn shutdown(&self) {
        self.closed.store(true, AtomicOrdering::SeqCst);
    }

    /// True once [`AsyncDispatcher::shutdown`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(AtomicOrdering::SeqCst)
    }

    fn registry(&self) -> MutexGuard<'_, Registry<AsyncListenerRef>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for AsyncDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Extracts a printable message from a panic payload.
fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
