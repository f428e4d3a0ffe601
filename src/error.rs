//! Error types used by the eventvisor registry and dispatchers.
//!
//! This module defines two main error enums:
//!
//! - [`RegistryError`] — registration-time failures (`add_listener` / `remove_listener`).
//! - [`DispatchError`] — dispatch-time failures surfaced by `emit`.
//!
//! Registration errors are all-or-nothing: a rejected call leaves the registry
//! untouched. Dispatch errors are never recovered internally — no retry, no
//! capture-and-continue. A failing listener fails the whole `emit` call.
//!
//! Both types provide `as_label()` for logging/metrics.

use thiserror::Error;

/// Boxed error type returned by listener callbacks.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// # Errors produced while mutating the listener registry.
///
/// All variants are raised synchronously by `add_listener` / `remove_listener`
/// before any state is changed.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RegistryError {
    /// An `after` dependency references a callback that is not registered anywhere.
    #[error("listener {listener:?} depends on unregistered callback {dependency:?}")]
    UnknownDependency {
        /// Debug name of the listener being added.
        listener: String,
        /// Label of the missing dependency.
        dependency: String,
    },

    /// Adding (or defensively, resolving) the listener would close a dependency cycle.
    #[error("cyclic dependency detected: {listener:?} -> ... -> {listener:?}")]
    CyclicDependency {
        /// Debug name of the listener on the cycle.
        listener: String,
    },

    /// Removal would leave surviving listeners with unsatisfiable `after` edges.
    #[error("cannot remove {removed:?}: still required by {dependents:?}")]
    DanglingDependency {
        /// Labels of the callbacks that were asked to be removed.
        removed: Vec<String>,
        /// Debug names of the surviving listeners that depend on them.
        dependents: Vec<String>,
    },

    /// The call itself was malformed (e.g. `remove_listener(None, None)`).
    #[error("invalid arguments: {reason}")]
    InvalidArgument {
        /// Human-readable description of what was wrong.
        reason: String,
    },
}

impl RegistryError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use eventvisor::RegistryError;
    ///
    /// let err = RegistryError::InvalidArgument { reason: "both arguments absent".into() };
    /// assert_eq!(err.as_label(), "registry_invalid_argument");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistryError::UnknownDependency { .. } => "registry_unknown_dependency",
            RegistryError::CyclicDependency { .. } => "registry_cyclic_dependency",
            RegistryError::DanglingDependency { .. } => "registry_dangling_dependency",
            RegistryError::InvalidArgument { .. } => "registry_invalid_argument",
        }
    }
}

/// # Errors produced while dispatching an event.
///
/// These surface from `Dispatcher::emit` / `AsyncDispatcher::emit`. The engine's
/// job is correct ordering and merging, not resilience: every variant terminates
/// the emission with no partial result.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The dispatcher was shut down; emissions are rejected.
    #[error("dispatcher is shut down")]
    Closed,

    /// A listener returned a value that is not a JSON object.
    #[error("listener {listener:?} returned a non-object value ({found})")]
    InvalidResult {
        /// Debug name of the offending listener.
        listener: String,
        /// Kind of value that was returned (e.g. "number", "array").
        found: &'static str,
    },

    /// A listener result would overwrite keys already merged by earlier listeners.
    #[error("listener {listener:?} conflicts on keys {keys:?}")]
    KeyConflict {
        /// Debug name of the offending listener.
        listener: String,
        /// The colliding keys.
        keys: Vec<String>,
    },

    /// A listener returned an error; it propagates unmodified to the caller.
    #[error("listener {listener:?} failed: {source}")]
    Listener {
        /// Debug name of the failed listener.
        listener: String,
        /// The listener's own error.
        #[source]
        source: ListenerError,
    },

    /// A listener panicked (concurrent strategy only; panics are isolated per task).
    #[error("listener {listener:?} panicked: {info}")]
    Panicked {
        /// Debug name of the panicked listener.
        listener: String,
        /// Extracted panic payload, if printable.
        info: String,
    },

    /// One or more listeners in a single concurrent layer failed.
    ///
    /// The concurrent strategy always reports layer failures through this
    /// variant so callers match a single shape, whether one sibling failed
    /// or several did. Errors are ordered by launch position.
    #[error("{} listener(s) failed in one layer", errors.len())]
    Aggregate {
        /// Every failure observed in the layer, in launch order.
        errors: Vec<DispatchError>,
    },

    /// Plan resolution failed (defensive; `add_listener` should reject cycles first).
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl DispatchError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use eventvisor::DispatchError;
    ///
    /// assert_eq!(DispatchError::Closed.as_label(), "dispatch_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            DispatchError::Closed => "dispatch_closed",
            DispatchError::InvalidResult { .. } => "dispatch_invalid_result",
            DispatchError::KeyConflict { .. } => "dispatch_key_conflict",
            DispatchError::Listener { .. } => "dispatch_listener_failed",
            DispatchError::Panicked { .. } => "dispatch_listener_panicked",
            DispatchError::Aggregate { .. } => "dispatch_layer_failed",
            DispatchError::Registry(e) => e.as_label(),
        }
    }
}
