//! # Console log listener.
//!
//! [`LogWriter`] prints every event it observes to stdout. It is a stock
//! listener for demos and local debugging, not a logging framework; register
//! it near the bottom of the priority range so application listeners run
//! first.

use std::sync::Arc;

use async_trait::async_trait;

use crate::events::Event;
use crate::registry::{Listen, ListenAsync, ListenerOutput};

/// Prints observed events to stdout.
///
/// Works with both dispatch strategies. Always returns no result, so it never
/// participates in merging.
///
/// ## Example
/// ```rust
/// use std::sync::Arc;
/// use eventvisor::{Dispatcher, EventType, ListenerEntry, ListenerRef, LogWriter};
///
/// static AUDIT: EventType = EventType::new("audit");
///
/// let dispatcher = Dispatcher::new();
/// let writer: ListenerRef = Arc::new(LogWriter::new());
/// dispatcher.add_listener(
///     &[&AUDIT],
///     ListenerEntry::new(writer).with_priority(i32::MIN),
/// )?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct LogWriter;

impl LogWriter {
    pub fn new() -> Self {
        Self
    }

    fn write(&self, event: &dyn Event) {
        let meta = event.meta();
        let id = meta
            .id()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("[event] type={} id={}", event.event_type().name(), id);
    }
}

impl Listen for LogWriter {
    fn on_event(&self, event: &dyn Event) -> ListenerOutput {
        self.write(event);
        Ok(None)
    }

    fn name(&self) -> &str {
        "log-writer"
    }
}

#[async_trait]
impl ListenAsync for LogWriter {
    async fn on_event(&self, event: Arc<dyn Event>) -> ListenerOutput {
        self.write(event.as_ref());
        Ok(None)
    }

    fn name(&self) -> &str {
        "log-writer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventMeta, EventType};

    static AUDIT: EventType = EventType::new("audit");

    struct Ev {
        meta: EventMeta,
    }

    impl Event for Ev {
        fn event_type(&self) -> &'static EventType {
            &AUDIT
        }
        fn meta(&self) -> &EventMeta {
            &self.meta
        }
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    #[test]
    fn test_log_writer_returns_no_result() {
        let ev = Ev {
            meta: EventMeta::new(),
        };
        let out = Listen::on_event(&LogWriter::new(), &ev).unwrap();
        assert!(out.is_none());
    }
}
