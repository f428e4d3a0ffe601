//! # Event type descriptors.
//!
//! [`EventType`] is a `'static` descriptor that gives an event value a stable
//! runtime type usable as a registry key, plus an explicit ancestor chain for
//! polymorphic matching. The hierarchy is modeled with parent pointers rather
//! than language inheritance: each descriptor optionally points at its parent,
//! and [`EventType::ancestors`] walks the chain most-derived first.
//!
//! Descriptors are declared as `static` items; identity is the address of the
//! static, so two distinct descriptors never compare equal even if they share
//! a name.
//!
//! ## Example
//! ```rust
//! use eventvisor::EventType;
//!
//! static BASE: EventType = EventType::new("base");
//! static DERIVED: EventType = EventType::with_parent("derived", &BASE);
//!
//! let chain: Vec<&str> = DERIVED.ancestors().map(|t| t.name()).collect();
//! assert_eq!(chain, ["derived", "base"]);
//! ```

/// Opaque identity of an [`EventType`] descriptor (its static address).
///
/// Used as the key of the registry's listener table and plan cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeKey(usize);

/// Runtime type descriptor for events.
///
/// Forms a single-parent hierarchy: listeners registered on an ancestor type
/// match every descendant. The chain terminates at a descriptor with no
/// parent; there is no implicit universal root.
#[derive(Debug)]
pub struct EventType {
    name: &'static str,
    parent: Option<&'static EventType>,
}

impl EventType {
    /// Creates a root descriptor with no parent.
    pub const fn new(name: &'static str) -> Self {
        Self { name, parent: None }
    }

    /// Creates a descriptor derived from `parent`.
    pub const fn with_parent(name: &'static str, parent: &'static EventType) -> Self {
        Self {
            name,
            parent: Some(parent),
        }
    }

    /// Human-readable type name (for logs and error messages).
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Parent descriptor, if any.
    pub fn parent(&self) -> Option<&'static EventType> {
        self.parent
    }

    /// Iterates the ancestor chain, most-derived first (starting with `self`).
    pub fn ancestors(&'static self) -> Ancestors {
        Ancestors { next: Some(self) }
    }

    /// Address identity of this descriptor.
    pub fn key(&'static self) -> TypeKey {
        TypeKey(self as *const EventType as usize)
    }
}

/// Iterator over an [`EventType`] ancestor chain, most-derived first.
#[derive(Debug, Clone)]
pub struct Ancestors {
    next: Option<&'static EventType>,
}

impl Iterator for Ancestors {
    type Item = &'static EventType;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent();
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static ROOT: EventType = EventType::new("root");
    static MID: EventType = EventType::with_parent("mid", &ROOT);
    static LEAF: EventType = EventType::with_parent("leaf", &MID);
    static OTHER_ROOT: EventType = EventType::new("root");

    #[test]
    fn test_ancestors_most_derived_first() {
        let names: Vec<&str> = LEAF.ancestors().map(|t| t.name()).collect();
        assert_eq!(names, ["leaf", "mid", "root"]);
    }

    #[test]
    fn test_root_chain_is_only_itself() {
        let names: Vec<&str> = ROOT.ancestors().map(|t| t.name()).collect();
        assert_eq!(names, ["root"]);
    }

    #[test]
    fn test_key_is_address_identity() {
        assert_eq!(ROOT.key(), ROOT.key());
        // Same name, different static: distinct types.
        assert_ne!(ROOT.key(), OTHER_ROOT.key());
        assert_ne!(MID.key(), LEAF.key());
    }
}
