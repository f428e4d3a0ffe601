//! # Event contract and engine-assigned metadata.
//!
//! [`Event`] is the trait every dispatched value implements. The engine treats
//! events as opaque apart from three things:
//!
//! - a stable runtime type ([`Event::event_type`]) for registry lookup,
//! - two one-shot metadata slots ([`EventMeta`]: identifier and timestamp),
//! - downcast access ([`Event::as_any`]) so listeners can recover the
//!   concrete type.
//!
//! ## Metadata lifecycle
//! Events are constructed by the caller with empty metadata, stamped exactly
//! once by the dispatcher during `emit`, then frozen behind `Arc<dyn Event>`
//! before any listener sees them. The slots are `OnceLock`s: the first write
//! wins and later writes are no-ops, so re-emitting the same value cannot
//! rewrite history.
//!
//! ## Example
//! ```rust
//! use eventvisor::{Event, EventMeta, EventType};
//!
//! static ORDER: EventType = EventType::new("order");
//!
//! struct OrderPlaced {
//!     meta: EventMeta,
//!     amount: u32,
//! }
//!
//! impl Event for OrderPlaced {
//!     fn event_type(&self) -> &'static EventType { &ORDER }
//!     fn meta(&self) -> &EventMeta { &self.meta }
//!     fn as_any(&self) -> &dyn std::any::Any { self }
//! }
//!
//! let ev = OrderPlaced { meta: EventMeta::new(), amount: 42 };
//! assert!(ev.meta().id().is_none()); // stamped by the dispatcher, not here
//! assert_eq!(ev.amount, 42);
//! ```

use std::any::Any;
use std::sync::OnceLock;
use std::time::SystemTime;

use crate::events::event_type::EventType;

/// Engine-assigned event metadata: identifier and timestamp.
///
/// Both slots are write-once. The dispatcher stamps them at the top of
/// `emit`; user code only reads them.
#[derive(Debug, Default)]
pub struct EventMeta {
    id: OnceLock<u64>,
    timestamp: OnceLock<SystemTime>,
}

impl EventMeta {
    /// Creates empty metadata (both slots unset).
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifier assigned by the dispatcher, if already emitted.
    pub fn id(&self) -> Option<u64> {
        self.id.get().copied()
    }

    /// Timestamp assigned by the dispatcher, if already emitted.
    pub fn timestamp(&self) -> Option<SystemTime> {
        self.timestamp.get().copied()
    }

    /// One-shot write of both slots. First write wins; later calls are no-ops.
    pub(crate) fn stamp(&self, id: u64, timestamp: SystemTime) {
        let _ = self.id.set(id);
        let _ = self.timestamp.set(timestamp);
    }
}

/// Contract for dispatchable events.
///
/// Implementations embed an [`EventMeta`] and point at their `static`
/// [`EventType`] descriptor. Everything else about the value is the
/// listener's business, reached through [`Event::as_any`] downcasting.
pub trait Event: Send + Sync + 'static {
    /// Runtime type descriptor used for listener lookup and ancestor matching.
    fn event_type(&self) -> &'static EventType;

    /// Engine-assigned metadata slots.
    fn meta(&self) -> &EventMeta;

    /// Downcast access to the concrete event value.
    fn as_any(&self) -> &dyn Any;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    static PING: EventType = EventType::new("ping");

    struct Ping {
        meta: EventMeta,
    }

    impl Event for Ping {
        fn event_type(&self) -> &'static EventType {
            &PING
        }
        fn meta(&self) -> &EventMeta {
            &self.meta
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_meta_starts_empty() {
        let ev = Ping {
            meta: EventMeta::new(),
        };
        assert!(ev.meta().id().is_none());
        assert!(ev.meta().timestamp().is_none());
    }

    #[test]
    fn test_stamp_is_one_shot() {
        let meta = EventMeta::new();
        let t0 = SystemTime::UNIX_EPOCH;
        let t1 = t0 + Duration::from_secs(5);

        meta.stamp(1, t0);
        meta.stamp(2, t1); // no-op: first write wins

        assert_eq!(meta.id(), Some(1));
        assert_eq!(meta.timestamp(), Some(t0));
    }

    #[test]
    fn test_downcast_through_dyn_event() {
        let ev: Box<dyn Event> = Box::new(Ping {
            meta: EventMeta::new(),
        });
        assert!(ev.as_any().downcast_ref::<Ping>().is_some());
        assert_eq!(ev.event_type().name(), "ping");
    }
}
