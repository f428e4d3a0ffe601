//! # eventvisor
//!
//! **Eventvisor** is an in-process typed event dispatch engine for Rust.
//!
//! It provides primitives to declare event type hierarchies, register
//! listeners with priorities and intra-priority dependencies, and emit
//! events through sequential or layered-concurrent strategies with
//! deterministic ordering and conflict-checked result merging.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  EventType   │◄──│  EventType   │◄──│  EventType   │
//!     │   (root)     │   │  (parent)    │   │ (most-derived)│
//!     └──────────────┘   └──────────────┘   └──────┬───────┘
//!                                                  │ emit(event)
//!                                                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Dispatcher / AsyncDispatcher                                     │
//! │  - DispatcherConfig (id source + clock, stamps EventMeta)         │
//! │  - Registry (per-type listener tables, revision counter)          │
//! │  - ExecutionPlan cache (Arc-shared, keyed by revision)            │
//! └──────────────────────────────┬────────────────────────────────────┘
//!                                ▼
//!                  ┌───────────────────────────┐
//!                  │ ExecutionPlan              │
//!                  │  layer(prio=10): [a, b]    │  priorities descending,
//!                  │  layer(prio= 0): [c]       │  topo order inside layers
//!                  │  layer(prio=-5): [d, e, f] │
//!                  └───────────┬───────────────┘
//!                              ▼
//!              sequential: run in order, stop at first failure
//!              concurrent: JoinSet per layer, abort siblings on failure
//!                              ▼
//!              ┌─────────────────────────────────┐
//!              │ MergedResult (disjoint-key map) │
//!              └─────────────────────────────────┘
//! ```
//!
//! ### Emission
//! ```text
//! emit(event)
//!   ├─► reject if shut down (Closed)
//!   ├─► stamp metadata (id + timestamp, write-once)
//!   ├─► resolve plan for the event's type chain (cache by revision)
//!   ├─► for each layer, highest priority first:
//!   │     ├─ run every entry (in order / concurrently)
//!   │     ├─ any failure ─► fail the emission, later layers never run
//!   │     └─ merge object results; overlapping keys ─► KeyConflict
//!   └─► Ok(MergedResult)
//! ```
//!
//! ## Features
//! | Area              | Description                                                       | Key types / traits                         |
//! |-------------------|-------------------------------------------------------------------|--------------------------------------------|
//! | **Event model**   | Static type hierarchy plus write-once emission metadata.          | [`EventType`], [`Event`], [`EventMeta`]    |
//! | **Listeners**     | Sync/async callbacks as trait impls or plain closures.            | [`Listen`], [`ListenAsync`], [`ListenerFn`]|
//! | **Registration**  | Priorities, same-priority dependencies, four removal modes.       | [`ListenerEntry`], [`ListenerKey`]         |
//! | **Dispatch**      | Sequential and layered-concurrent strategies over shared plans.   | [`Dispatcher`], [`AsyncDispatcher`]        |
//! | **Merging**       | Disjoint-key union of listener results.                           | [`MergedResult`]                           |
//! | **Errors**        | Typed errors for registration and emission.                       | [`RegistryError`], [`DispatchError`]       |
//! | **Configuration** | Pluggable id and clock sources for metadata stamping.             | [`DispatcherConfig`]                       |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use serde_json::json;
//! use eventvisor::{Dispatcher, EventMeta, Event, EventType, ListenerEntry, ListenerFn};
//!
//! static USER: EventType = EventType::new("user");
//! static USER_CREATED: EventType = EventType::with_parent("user.created", &USER);
//!
//! struct UserCreated {
//!     meta: EventMeta,
//!     login: String,
//! }
//!
//! impl Event for UserCreated {
//!     fn event_type(&self) -> &'static EventType { &USER_CREATED }
//!     fn meta(&self) -> &EventMeta { &self.meta }
//!     fn as_any(&self) -> &dyn std::any::Any { self }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dispatcher = Dispatcher::new();
//!
//!     // Listeners on an ancestor type observe derived emissions too.
//!     dispatcher.add_listener(
//!         &[&USER],
//!         ListenerEntry::new(ListenerFn::arc("audit", |ev| {
//!             println!("audit: {}", ev.event_type().name());
//!             Ok(None)
//!         })),
//!     )?;
//!     dispatcher.add_listener(
//!         &[&USER_CREATED],
//!         ListenerEntry::new(ListenerFn::arc("welcome", |ev| {
//!             let created = ev.as_any().downcast_ref::<UserCreated>().unwrap();
//!             Ok(Some(json!({ "welcomed": created.login })))
//!         }))
//!         .with_priority(10),
//!     )?;
//!
//!     let merged = dispatcher.emit(UserCreated {
//!         meta: EventMeta::new(),
//!         login: "ada".into(),
//!     })?;
//!     assert_eq!(merged["welcomed"], "ada");
//!     Ok(())
//! }
//! ```
mod dispatch;
mod error;
mod events;
mod listeners;
mod registry;

// ---- Public re-exports ----

pub use dispatch::{
    AsyncDispatcher, ClockSource, Dispatcher, DispatcherConfig, IdSource, MergedResult,
};
pub use error::{DispatchError, ListenerError, RegistryError};
pub use events::{Ancestors, Event, EventMeta, EventType, TypeKey};
pub use registry::{
    AfterRef, AsyncListenerFn, AsyncListenerRef, Callback, ExecutionPlan, Layer, Listen,
    ListenAsync, ListenerEntry, ListenerFn, ListenerKey, ListenerOutput, ListenerRef,
};

// Optional: expose a simple built-in log listener (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use listeners::LogWriter;

use std::sync::OnceLock;

/// Returns the process-wide default sequential dispatcher.
///
/// Lazily created on first use with [`DispatcherConfig::default`]. Convenient
/// for applications that want one shared dispatcher without threading a
/// handle everywhere; libraries should prefer an explicitly owned
/// [`Dispatcher`].
pub fn default_dispatcher() -> &'static Dispatcher {
    static DEFAULT: OnceLock<Dispatcher> = OnceLock::new();
    DEFAULT.get_or_init(Dispatcher::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_dispatcher_is_shared() {
        let a = default_dispatcher() as *const Dispatcher;
        let b = default_dispatcher() as *const Dispatcher;
        assert_eq!(a, b);
    }
}
