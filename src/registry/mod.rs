//! Listener registry: callback contracts, entries, execution plans, and the
//! ordering/caching table consumed by the dispatchers.

mod entry;
mod plan;
mod table;

pub use entry::{
    AfterRef, AsyncListenerFn, AsyncListenerRef, Callback, Listen, ListenAsync, ListenerEntry,
    ListenerFn, ListenerKey, ListenerOutput, ListenerRef,
};
pub use plan::{ExecutionPlan, Layer};
pub(crate) use table::Registry;
