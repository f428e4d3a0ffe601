//! Event model: runtime type descriptors and the dispatchable-event contract.

mod event;
mod event_type;

pub use event::{Event, EventMeta};
pub use event_type::{Ancestors, EventType, TypeKey};
