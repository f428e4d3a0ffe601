//! # Listener callbacks and registry entries.
//!
//! Two callback contracts exist, one per execution strategy:
//!
//! - [`Listen`] — synchronous callbacks, driven by [`Dispatcher`](crate::Dispatcher).
//! - [`ListenAsync`] — asynchronous callbacks, driven by
//!   [`AsyncDispatcher`](crate::AsyncDispatcher).
//!
//! Both return [`ListenerOutput`]: `Ok(None)` contributes nothing to the
//! merged emission result, `Ok(Some(value))` must be a JSON object with keys
//! disjoint from every other listener's, and `Err` fails the emission.
//!
//! ## Identity
//! Listener identity is reference identity: [`ListenerKey`] is the address of
//! the `Arc` allocation behind the callback handle. Cloning a handle keeps its
//! key; constructing a new listener — even with the same name and body —
//! produces a fresh one. Names are debug labels only and never participate in
//! identity or deduplication.
//!
//! ## Example
//! ```rust
//! use eventvisor::{Callback, ListenerEntry, ListenerFn, ListenerRef};
//!
//! let audit: ListenerRef = ListenerFn::arc("audit", |_ev| Ok(None));
//! let entry = ListenerEntry::new(audit.clone()).with_priority(10);
//!
//! assert_eq!(entry.name(), "audit");
//! assert_eq!(entry.key(), audit.key()); // clones share identity
//! ```

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ListenerError;
use crate::events::Event;

/// Result of one listener invocation: an optional JSON object, or an error.
pub type ListenerOutput = Result<Option<Value>, ListenerError>;

/// Shared handle to a synchronous listener callback.
pub type ListenerRef = Arc<dyn Listen>;

/// Shared handle to an asynchronous listener callback.
pub type AsyncListenerRef = Arc<dyn ListenAsync>;

/// Contract for synchronous listeners.
///
/// Called in-line by the sequential dispatcher; a nested
/// `Dispatcher::emit` from inside `on_event` recurses directly on the call
/// stack and completes before this invocation returns.
pub trait Listen: Send + Sync + 'static {
    /// Handle a single event.
    fn on_event(&self, event: &dyn Event) -> ListenerOutput;

    /// Human-readable name (for logs and error messages).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Contract for asynchronous listeners.
///
/// Same-priority listeners run as sibling tasks, so implementations must be
/// prepared to be cancelled mid-flight when a sibling fails.
#[async_trait]
pub trait ListenAsync: Send + Sync + 'static {
    /// Handle a single event.
    async fn on_event(&self, event: Arc<dyn Event>) -> ListenerOutput;

    /// Human-readable name (for logs and error messages).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Function-backed synchronous listener.
///
/// Wraps a plain closure so callers don't need a named type per hook.
pub struct ListenerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> ListenerFn<F> {
    /// Creates a new function-backed listener.
    ///
    /// Prefer [`ListenerFn::arc`] when you immediately need a [`ListenerRef`].
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the listener and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> ListenerRef
    where
        F: Fn(&dyn Event) -> ListenerOutput + Send + Sync + 'static,
    {
        Arc::new(Self::new(name, f))
    }
}

impl<F> Listen for ListenerFn<F>
where
    F: Fn(&dyn Event) -> ListenerOutput + Send + Sync + 'static,
{
    fn on_event(&self, event: &dyn Event) -> ListenerOutput {
        (self.f)(event)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Function-backed asynchronous listener.
///
/// Wraps a closure `F: Fn(Arc<dyn Event>) -> Fut`, producing a fresh future
/// per invocation. Shared state goes through an explicit `Arc` inside the
/// closure, never hidden mutation.
pub struct AsyncListenerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> AsyncListenerFn<F> {
    /// Creates a new function-backed async listener.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the listener and returns it as a shared handle.
    pub fn arc<Fut>(name: impl Into<Cow<'static, str>>, f: F) -> AsyncListenerRef
    where
        F: Fn(Arc<dyn Event>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ListenerOutput> + Send + 'static,
    {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> ListenAsync for AsyncListenerFn<F>
where
    F: Fn(Arc<dyn Event>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ListenerOutput> + Send + 'static,
{
    async fn on_event(&self, event: Arc<dyn Event>) -> ListenerOutput {
        (self.f)(event).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Reference identity of a listener callback (the `Arc` allocation address).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerKey(usize);

/// Identity and labeling surface shared by both callback handle kinds.
///
/// Implemented for [`ListenerRef`] and [`AsyncListenerRef`]; the registry is
/// generic over this trait so both dispatchers share one implementation.
pub trait Callback: Clone + Send + Sync + 'static {
    /// Reference identity of the underlying callback.
    fn key(&self) -> ListenerKey;

    /// Debug label of the underlying callback.
    fn label(&self) -> String;
}

impl Callback for ListenerRef {
    fn key(&self) -> ListenerKey {
        ListenerKey(Arc::as_ptr(self) as *const () as usize)
    }

    fn label(&self) -> String {
        self.name().to_string()
    }
}

impl Callback for AsyncListenerRef {
    fn key(&self) -> ListenerKey {
        ListenerKey(Arc::as_ptr(self) as *const () as usize)
    }

    fn label(&self) -> String {
        self.name().to_string()
    }
}

/// A dependency edge captured at entry-build time.
///
/// Keeps the dependency's label next to its key so rejection messages can
/// name callbacks instead of printing addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AfterRef {
    key: ListenerKey,
    label: String,
}

impl AfterRef {
    /// Identity of the callback that must run first.
    pub fn key(&self) -> ListenerKey {
        self.key
    }

    /// Debug label of that callback.
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// A registered listener: callback handle plus scheduling metadata.
///
/// Built with chained setters, then handed to `add_listener`; immutable from
/// that point on.
///
/// ## Example
/// ```rust
/// use eventvisor::{ListenerEntry, ListenerFn, ListenerRef};
///
/// let first: ListenerRef = ListenerFn::arc("first", |_ev| Ok(None));
/// let second: ListenerRef = ListenerFn::arc("second", |_ev| Ok(None));
///
/// let entry = ListenerEntry::new(second.clone())
///     .with_priority(5)
///     .with_after(&first);
///
/// assert_eq!(entry.priority(), 5);
/// assert_eq!(entry.after().len(), 1);
/// ```
#[derive(Clone)]
pub struct ListenerEntry<C> {
    callback: C,
    priority: i32,
    after: Vec<AfterRef>,
    name: String,
}

impl<C: Callback> ListenerEntry<C> {
    /// Creates an entry with priority 0, no dependencies, and the callback's
    /// own label as its debug name.
    pub fn new(callback: C) -> Self {
        let name = callback.label();
        Self {
            callback,
            priority: 0,
            after: Vec::new(),
            name,
        }
    }

    /// Sets the priority (higher executes earlier; default 0).
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Declares that `dep` must execute before this listener.
    ///
    /// Only constrains ordering within the same priority layer; a dependency
    /// in a higher layer is already satisfied by layer order.
    pub fn with_after(mut self, dep: &C) -> Self {
        self.after.push(AfterRef {
            key: dep.key(),
            label: dep.label(),
        });
        self
    }

    /// Overrides the debug name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The callback handle.
    pub fn callback(&self) -> &C {
        &self.callback
    }

    /// Reference identity of the callback.
    pub fn key(&self) -> ListenerKey {
        self.callback.key()
    }

    /// Priority value (higher executes earlier).
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Dependency edges captured at build time.
    pub fn after(&self) -> &[AfterRef] {
        &self.after
    }

    /// Debug name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<C: Callback> PartialEq for ListenerEntry<C> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
            && self.priority == other.priority
            && self.after == other.after
            && self.name == other.name
    }
}

impl<C: Callback> Eq for ListenerEntry<C> {}

impl<C: Callback> fmt::Debug for ListenerEntry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerEntry")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("key", &self.key())
            .field("after", &self.after)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(name: &'static str) -> ListenerRef {
        ListenerFn::arc(name, |_ev| Ok(None))
    }

    #[test]
    fn test_clones_share_identity() {
        let l = noop("l");
        let c = l.clone();
        assert_eq!(l.key(), c.key());
    }

    #[test]
    fn test_distinct_listeners_have_distinct_keys() {
        // Same name, same body: identity is the allocation, not the label.
        let a = noop("same");
        let b = noop("same");
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn test_entry_defaults() {
        let l = noop("hook");
        let entry = ListenerEntry::new(l.clone());
        assert_eq!(entry.priority(), 0);
        assert!(entry.after().is_empty());
        assert_eq!(entry.name(), "hook");
        assert_eq!(entry.key(), l.key());
    }

    #[test]
    fn test_entry_builder_chain() {
        let dep = noop("dep");
        let l = noop("l");
        let entry = ListenerEntry::new(l)
            .with_priority(-3)
            .with_after(&dep)
            .with_name("renamed");
        assert_eq!(entry.priority(), -3);
        assert_eq!(entry.after()[0].key(), dep.key());
        assert_eq!(entry.after()[0].label(), "dep");
        assert_eq!(entry.name(), "renamed");
    }

    #[tokio::test]
    async fn test_async_fn_adapter() {
        let l: AsyncListenerRef = AsyncListenerFn::arc("async", |_ev| async { Ok(None) });
        assert_eq!(l.name(), "async");
        assert_eq!(l.key(), l.clone().key());
    }
}
