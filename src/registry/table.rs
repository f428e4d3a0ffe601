//! # Listener registry: storage, ordering, and plan caching.
//!
//! [`Registry`] owns the per-type listener lists and turns them into
//! [`ExecutionPlan`]s on demand:
//!
//! ```text
//! add / remove ──► store + reverse index, revision += 1
//!
//! resolve_order(T)
//!   ├─► cache hit (revision match) ──► Arc<ExecutionPlan> (O(1))
//!   └─► rebuild:
//!         1. walk T's ancestor chain, most-derived first,
//!            collecting entries in registration order (no deduplication)
//!         2. group by priority, descending
//!         3. topo-sort each group over in-group `after` edges
//!            (edges leaving the group are satisfied by layer order)
//!         4. cache (revision, plan), return
//! ```
//!
//! ## Rules
//! - Mutations are all-or-nothing: every check runs before the first write.
//! - The revision counter increases exactly once per successful mutation;
//!   a cached plan is valid iff its stored revision equals the current one.
//! - Registering one callback twice (same or different type) is explicit
//!   intent: it appears twice in the plan and runs twice.
//! - Dependencies are global to the callback, not per-type: the cycle check
//!   walks the dependency graph across all registered entries.
//!
//! The registry is crate-internal; the dispatchers are the only entry points.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet};
use std::sync::Arc;

use crate::error::RegistryError;
use crate::events::{EventType, TypeKey};
use crate::registry::entry::{Callback, ListenerEntry, ListenerKey};
use crate::registry::plan::{ExecutionPlan, Layer};

/// A cached plan, valid while its revision matches the registry's.
struct CachedPlan<C> {
    revision: u64,
    plan: Arc<ExecutionPlan<C>>,
}

/// Listener registry with revision-keyed plan caching.
///
/// Owned by exactly one dispatcher; never shared across dispatchers.
pub(crate) struct Registry<C> {
    /// Event type → listener entries, insertion order preserved.
    store: HashMap<TypeKey, Vec<ListenerEntry<C>>>,
    /// Callback identity → event types it is registered under.
    by_callback: HashMap<ListenerKey, HashSet<TypeKey>>,
    /// Bumped on every successful add or remove.
    revision: u64,
    /// Pure cache; droppable at any time without correctness impact.
    ///
    /// Keyed by `EventType` static addresses, so the key population is
    /// bounded by the program's declared types and cannot leak.
    plan_cache: HashMap<TypeKey, CachedPlan<C>>,
}

impl<C: Callback> Registry<C> {
    pub(crate) fn new() -> Self {
        Self {
            store: HashMap::new(),
            by_callback: HashMap::new(),
            revision: 0,
            plan_cache: HashMap::new(),
        }
    }

    /// Current revision (strictly increases with every successful mutation).
    #[cfg_attr(not(test), allow(dead_code))]
    pub(crate) fn revision(&self) -> u64 {
        self.revision
    }

    /// Registers `entry` under every type in `event_types`.
    ///
    /// Every `after` dependency must already be registered under *some* type,
    /// and the new edges must not close a cycle. Checks run before any write,
    /// so a rejected add leaves the registry untouched.
    pub(crate) fn add(
        &mut self,
        event_types: &[&'static EventType],
        entry: ListenerEntry<C>,
    ) -> Result<(), RegistryError> {
        if event_types.is_empty() {
            return Err(RegistryError::InvalidArgument {
                reason: "no event types given".into(),
            });
        }

        for dep in entry.after() {
            if !self.by_callback.contains_key(&dep.key()) {
                return Err(RegistryError::UnknownDependency {
                    listener: entry.name().to_string(),
                    dependency: dep.label().to_string(),
                });
            }
        }

        if self.would_cycle(&entry) {
            return Err(RegistryError::CyclicDependency {
                listener: entry.name().to_string(),
            });
        }

        for ty in event_types {
            self.store
                .entry(ty.key())
                .or_default()
                .push(entry.clone());
            self.by_callback
                .entry(entry.key())
                .or_default()
                .insert(ty.key());
        }

        self.revision += 1;
        Ok(())
    }

    /// Removes listeners in one of four modes, selected by which arguments
    /// are present:
    ///
    /// | event_types | callback | effect |
    /// |---|---|---|
    /// | present | present | this callback, from exactly these types |
    /// | present | absent  | all listeners of these types |
    /// | absent  | present | this callback, everywhere |
    /// | absent  | absent  | `InvalidArgument` |
    ///
    /// Fails with `DanglingDependency` (and removes nothing) if a surviving
    /// entry's `after` list references a callback in the removal set.
    pub(crate) fn remove(
        &mut self,
        event_types: Option<&[&'static EventType]>,
        callback: Option<ListenerKey>,
    ) -> Result<(), RegistryError> {
        let targets: Vec<(TypeKey, ListenerKey)> = match (event_types, callback) {
            (None, None) => {
                return Err(RegistryError::InvalidArgument {
                    reason: "event_types and callback cannot both be absent".into(),
                });
            }
            (Some(types), Some(cb)) => {
                let registered_under =
                    self.by_callback
                        .get(&cb)
                        .ok_or_else(|| RegistryError::InvalidArgument {
                            reason: "callback is not registered".into(),
                        })?;
                for ty in types {
                    if !registered_under.contains(&ty.key()) {
                        return Err(RegistryError::InvalidArgument {
                            reason: format!(
                                "callback is not registered under type {:?}",
                                ty.name()
                            ),
                        });
                    }
                }
                types.iter().map(|ty| (ty.key(), cb)).collect()
            }
            (Some(types), None) => types
                .iter()
                .flat_map(|ty| {
                    self.store
                        .get(&ty.key())
                        .into_iter()
                        .flatten()
                        .map(|e| (ty.key(), e.key()))
                })
                .collect(),
            (None, Some(cb)) => {
                let registered_under =
                    self.by_callback
                        .get(&cb)
                        .ok_or_else(|| RegistryError::InvalidArgument {
                            reason: "callback is not registered".into(),
                        })?;
                registered_under.iter().map(|tk| (*tk, cb)).collect()
            }
        };

        self.check_dangling(&targets)?;

        for (tk, key) in &targets {
            if let Some(list) = self.store.get_mut(tk) {
                list.retain(|e| e.key() != *key);
                if list.is_empty() {
                    self.store.remove(tk);
                }
            }
            if let Some(types_of_cb) = self.by_callback.get_mut(key) {
                types_of_cb.remove(tk);
                if types_of_cb.is_empty() {
                    self.by_callback.remove(key);
                }
            }
        }

        self.revision += 1;
        Ok(())
    }

    /// Resolves the execution plan for `event_type`, rebuilding only when the
    /// registry changed since the cached build.
    ///
    /// The in-group cycle error here is defensive: `add` rejects cycles, so a
    /// rebuilt plan should never hit it.
    pub(crate) fn resolve_order(
        &mut self,
        event_type: &'static EventType,
    ) -> Result<Arc<ExecutionPlan<C>>, RegistryError> {
        if let Some(cached) = self.plan_cache.get(&event_type.key()) {
            if cached.revision == self.revision {
                return Ok(Arc::clone(&cached.plan));
            }
        }

        let mut collected: Vec<ListenerEntry<C>> = Vec::new();
        for ancestor in event_type.ancestors() {
            if let Some(list) = self.store.get(&ancestor.key()) {
                collected.extend(list.iter().cloned());
            }
        }

        // BTreeMap keeps priorities sorted; push order keeps registration
        // order within each group.
        let mut groups: BTreeMap<i32, Vec<ListenerEntry<C>>> = BTreeMap::new();
        for entry in collected {
            groups.entry(entry.priority()).or_default().push(entry);
        }

        let mut layers = Vec::with_capacity(groups.len());
        for (priority, group) in groups.into_iter().rev() {
            layers.push(Layer::new(priority, Self::topo_sort(group)?));
        }

        let plan = Arc::new(ExecutionPlan::new(layers));
        self.plan_cache.insert(
            event_type.key(),
            CachedPlan {
                revision: self.revision,
                plan: Arc::clone(&plan),
            },
        );
        Ok(plan)
    }

    /// True if the new entry's `after` edges would close a cycle reaching
    /// back to its own callback.
    ///
    /// Walks the dependency graph induced by all registered entries (edges
    /// are global to the callback, not scoped to one event type).
    fn would_cycle(&self, entry: &ListenerEntry<C>) -> bool {
        let target = entry.key();
        let mut visited: HashSet<ListenerKey> = HashSet::new();
        let mut stack: Vec<ListenerKey> = entry.after().iter().map(|a| a.key()).collect();

        while let Some(key) = stack.pop() {
            if key == target {
                return true;
            }
            if !visited.insert(key) {
                continue;
            }
            for list in self.store.values() {
                for registered in list.iter().filter(|e| e.key() == key) {
                    stack.extend(registered.after().iter().map(|a| a.key()));
                }
            }
        }
        false
    }

    /// Fails if any entry surviving the removal depends on a callback being
    /// removed.
    fn check_dangling(&self, targets: &[(TypeKey, ListenerKey)]) -> Result<(), RegistryError> {
        let removal_keys: HashSet<ListenerKey> = targets.iter().map(|(_, k)| *k).collect();

        let mut removed: Vec<String> = Vec::new();
        let mut dependents: Vec<String> = Vec::new();
        for entry in self.store.values().flatten() {
            if removal_keys.contains(&entry.key()) {
                continue;
            }
            for dep in entry.after() {
                if removal_keys.contains(&dep.key()) {
                    removed.push(dep.label().to_string());
                    dependents.push(entry.name().to_string());
                }
            }
        }

        if removed.is_empty() {
            return Ok(());
        }
        removed.sort();
        removed.dedup();
        dependents.sort();
        dependents.dedup();
        Err(RegistryError::DanglingDependency {
            removed,
            dependents,
        })
    }

    /// Deterministic Kahn topological sort of one priority group.
    ///
    /// Ties break toward the smallest collection index, so the output is the
    /// ancestor-then-registration order, minimally disturbed by `after`
    /// edges. Edges pointing outside the group are ignored (higher layers
    /// already ran).
    fn topo_sort(entries: Vec<ListenerEntry<C>>) -> Result<Vec<ListenerEntry<C>>, RegistryError> {
        let n = entries.len();
        let mut key_to_indices: HashMap<ListenerKey, Vec<usize>> = HashMap::new();
        for (i, e) in entries.iter().enumerate() {
            key_to_indices.entry(e.key()).or_default().push(i);
        }

        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut indegree: Vec<usize> = vec![0; n];
        for (i, e) in entries.iter().enumerate() {
            for dep in e.after() {
                if let Some(dep_indices) = key_to_indices.get(&dep.key()) {
                    for &d in dep_indices {
                        dependents[d].push(i);
                        indegree[i] += 1;
                    }
                }
            }
        }

        let mut ready: BinaryHeap<Reverse<usize>> = indegree
            .iter()
            .enumerate()
            .filter(|&(_, deg)| *deg == 0)
            .map(|(i, _)| Reverse(i))
            .collect();

        let mut order: Vec<usize> = Vec::with_capacity(n);
        while let Some(Reverse(i)) = ready.pop() {
            order.push(i);
            for &j in &dependents[i] {
                indegree[j] -= 1;
                if indegree[j] == 0 {
                    ready.push(Reverse(j));
                }
            }
        }

        if order.len() != n {
            let stuck = entries
                .iter()
                .enumerate()
                .find(|&(i, _)| indegree[i] > 0)
                .map(|(_, e)| e.name().to_string())
                .unwrap_or_default();
            return Err(RegistryError::CyclicDependency { listener: stuck });
        }

        Ok(order.into_iter().map(|i| entries[i].clone()).collect())
    }
}
