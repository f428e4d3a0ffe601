//! # Dispatcher configuration.
//!
//! Provides [`DispatcherConfig`] — the pluggable metadata generators used to
//! stamp events at emission time.
//!
//! ## Defaults
//! - `id_source`: a per-config atomic counter starting at 1.
//! - `clock`: a wall-clock read (`SystemTime::now`).
//!
//! Both are plain zero-argument functions behind `Arc`, so tests can inject a
//! fixed clock or a deterministic id sequence without touching the dispatcher.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Zero-argument generator for event identifiers.
pub type IdSource = Arc<dyn Fn() -> u64 + Send + Sync>;

/// Zero-argument generator for event timestamps.
pub type ClockSource = Arc<dyn Fn() -> SystemTime + Send + Sync>;

/// Metadata generators supplied at dispatcher construction.
///
/// ## Example
/// ```rust
/// use std::sync::Arc;
/// use std::time::SystemTime;
/// use eventvisor::DispatcherConfig;
///
/// // Deterministic clock for tests.
/// let cfg = DispatcherConfig::default()
///     .with_clock(Arc::new(|| SystemTime::UNIX_EPOCH));
/// ```
#[derive(Clone)]
pub struct DispatcherConfig {
    /// Produces the `id` stamped onto each emitted event.
    pub id_source: IdSource,
    /// Produces the `timestamp` stamped onto each emitted event.
    pub clock: ClockSource,
}

impl DispatcherConfig {
    /// Replaces the identifier generator.
    pub fn with_id_source(mut self, id_source: IdSource) -> Self {
        self.id_source = id_source;
        self
    }

    /// Replaces the clock.
    pub fn with_clock(mut self, clock: ClockSource) -> Self {
        self.clock = clock;
        self
    }
}

impl Default for DispatcherConfig {
    /// Monotonic counter starting at 1, and a wall-clock read.
    fn default() -> Self {
        let counter = Arc::new(AtomicU64::new(0));
        Self {
            id_source: Arc::new(move || counter.fetch_add(1, AtomicOrdering::Relaxed) + 1),
            clock: Arc::new(SystemTime::now),
        }
    }
}
