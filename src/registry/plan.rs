//! # Execution plans.
//!
//! An [`ExecutionPlan`] is the resolved schedule for one event type: an
//! ordered sequence of [`Layer`]s, highest priority first. Each layer holds
//! the entries sharing one priority value, already placed in a
//! dependency-respecting topological order by the registry.
//!
//! Plans are immutable snapshots: the registry replaces them wholesale when
//! the listener set changes, never mutates them in place. Dispatchers hold a
//! plan through an `Arc`, so a plan stays valid for the duration of an
//! emission even if the registry is mutated by a nested listener call.

use std::fmt;

use crate::registry::entry::{Callback, ListenerEntry};

/// One priority layer of a resolved plan.
#[derive(Clone)]
pub struct Layer<C> {
    priority: i32,
    entries: Vec<ListenerEntry<C>>,
}

impl<C: Callback> Layer<C> {
    pub(crate) fn new(priority: i32, entries: Vec<ListenerEntry<C>>) -> Self {
        Self { priority, entries }
    }

    /// Priority value shared by every entry in this layer.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Entries in execution (topological) order.
    pub fn entries(&self) -> &[ListenerEntry<C>] {
        &self.entries
    }
}

impl<C: Callback> PartialEq for Layer<C> {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.entries == other.entries
    }
}

impl<C: Callback> Eq for Layer<C> {}

impl<C: Callback> fmt::Debug for Layer<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("priority", &self.priority)
            .field("entries", &self.entries)
            .finish()
    }
}

/// Resolved execution schedule for one event type.
///
/// Layers are ordered highest priority first; an empty plan means no listener
/// matches the type or any of its ancestors.
#[derive(Clone)]
pub struct ExecutionPlan<C> {
    layers: Vec<Layer<C>>,
}

impl<C: Callback> ExecutionPlan<C> {
    pub(crate) fn new(layers: Vec<Layer<C>>) -> Self {
        Self { layers }
    }

    /// Layers in execution order (priority descending).
    pub fn layers(&self) -> &[Layer<C>] {
        &self.layers
    }

    /// True when no listener matches.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Total number of entries across all layers.
    pub fn len(&self) -> usize {
        self.layers.iter().map(|l| l.entries.len()).sum()
    }
}

impl<C: Callback> PartialEq for ExecutionPlan<C> {
    fn eq(&self, other: &Self) -> bool {
        self.layers == other.layers
    }
}

impl<C: Callback> Eq for ExecutionPlan<C> {}

impl<C: Callback> fmt::Debug for ExecutionPlan<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionPlan")
            .field("layers", &self.layers)
            .finish()
    }
}
