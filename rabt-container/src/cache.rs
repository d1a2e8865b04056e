//! Scope caches: the singleton tier, the request tier, and deferred handles.
//!
//! The singleton tier guarantees at-most-once construction per cache key:
//! concurrent first-time resolvers of the same key block on one cell, and a
//! failed construction leaves the cell empty so the next caller retries
//! instead of inheriting the failure.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use tracing::trace;

use crate::binding::{Binding, Instance};
use crate::key::ServiceKey;
use crate::qualifier::{self, Qualifier};

/// Cache key: identifier, canonical qualifier fingerprint, and the selected
/// binding's identity.
///
/// The binding identity keeps two bindings of one identifier from sharing a
/// cache slot: condition-constrained bindings selected in different
/// contexts, or enumeration over all of an identifier's bindings.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub(crate) struct CacheKey {
    key: ServiceKey,
    qualifiers: Vec<Qualifier>,
    provider: usize,
}

impl CacheKey {
    pub fn new(key: ServiceKey, qualifiers: &[Qualifier], binding: &Arc<Binding>) -> Self {
        Self {
            key,
            qualifiers: qualifier::fingerprint(qualifiers),
            provider: Arc::as_ptr(binding) as usize,
        }
    }

    pub fn service(&self) -> &ServiceKey {
        &self.key
    }
}

/// Registry-lifetime cache of singleton instances.
///
/// Each key owns a `OnceCell`; the cell is fetched (or inserted) under the
/// map's shard lock, but construction itself runs after that lock is
/// released, so recursive resolution of other singletons never deadlocks on
/// a shard.
#[derive(Default)]
pub(crate) struct SingletonStore {
    cells: DashMap<CacheKey, Arc<OnceCell<Instance>>>,
}

impl SingletonStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached instance, constructing it at most once.
    pub fn get_or_create<E>(
        &self,
        key: &CacheKey,
        build: impl FnOnce() -> Result<Instance, E>,
    ) -> Result<Instance, E> {
        let cell = {
            let entry = self
                .cells
                .entry(key.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()));
            Arc::clone(entry.value())
        };
        if cell.get().is_some() {
            trace!(key = %key.service(), "singleton cache hit");
        }
        cell.get_or_try_init(build).map(Arc::clone)
    }

    /// Non-blocking read of an already-constructed instance.
    pub fn peek(&self, key: &CacheKey) -> Option<Instance> {
        self.cells
            .get(key)
            .and_then(|cell| cell.get().cloned())
    }

    /// Drops every entry for an identifier. Returns how many were dropped.
    pub fn invalidate(&self, service: &ServiceKey) -> usize {
        let before = self.cells.len();
        self.cells.retain(|key, _| key.service() != service);
        before - self.cells.len()
    }

    pub fn clear(&self) {
        self.cells.clear();
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }
}

/// Resolution-context-lifetime cache for request-scoped instances.
///
/// Owned exclusively by one context; no locking.
#[derive(Default)]
pub(crate) struct RequestCache {
    entries: HashMap<CacheKey, Instance>,
}

impl RequestCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<Instance> {
        self.entries.get(key).cloned()
    }

    pub fn insert(&mut self, key: CacheKey, instance: Instance) {
        self.entries.insert(key, instance);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Lazy read-through handle to a singleton that is still being constructed.
///
/// Substituted for a dependency slot when a singleton cycle is permitted:
/// the handle resolves through the singleton cache once both ends of the
/// cycle exist. Holding it does not keep the container alive.
#[derive(Clone)]
pub struct Deferred {
    store: Weak<SingletonStore>,
    key: CacheKey,
}

impl Deferred {
    pub(crate) fn new(store: Weak<SingletonStore>, key: CacheKey) -> Self {
        Self { store, key }
    }

    /// Has the target singleton been fully constructed yet?
    pub fn resolved(&self) -> bool {
        self.get().is_some()
    }

    /// The target instance, once it exists.
    pub fn get(&self) -> Option<Instance> {
        self.store.upgrade().and_then(|store| store.peek(&self.key))
    }

    /// Typed read of the target instance.
    pub fn get_as<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.get().and_then(|instance| instance.downcast::<T>().ok())
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("key", &self.key)
            .field("resolved", &self.resolved())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::instance;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn probe_binding(name: &'static str) -> Arc<Binding> {
        Arc::new(Binding::constant(ServiceKey::symbol(name), instance(0u8)))
    }

    fn key_for(name: &'static str, binding: &Arc<Binding>) -> CacheKey {
        CacheKey::new(ServiceKey::symbol(name), &[], binding)
    }

    #[test]
    fn cache_key_normalizes_qualifiers() {
        let binding = probe_binding("Weapon");
        let a = CacheKey::new(
            ServiceKey::symbol("Weapon"),
            &[Qualifier::named("x"), Qualifier::tagged("t", "v")],
            &binding,
        );
        let b = CacheKey::new(
            ServiceKey::symbol("Weapon"),
            &[Qualifier::tagged("t", "v"), Qualifier::named("x")],
            &binding,
        );
        assert_eq!(a, b);
    }

    #[test]
    fn cache_key_distinguishes_bindings() {
        let first = probe_binding("Weapon");
        let second = probe_binding("Weapon");
        assert_ne!(key_for("Weapon", &first), key_for("Weapon", &second));
    }

    #[test]
    fn singleton_builds_once() {
        let store = SingletonStore::new();
        let calls = AtomicU32::new(0);
        let binding = probe_binding("Db");
        let k = key_for("Db", &binding);

        for _ in 0..3 {
            let got: Result<Instance, ()> = store.get_or_create(&k, || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(instance(7u32))
            });
            assert!(got.is_ok());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn singleton_failure_leaves_cell_empty() {
        let store = SingletonStore::new();
        let binding = probe_binding("Db");
        let k = key_for("Db", &binding);

        let first: Result<Instance, &str> = store.get_or_create(&k, || Err("boom"));
        assert!(first.is_err());
        assert!(store.peek(&k).is_none());

        let second: Result<Instance, &str> = store.get_or_create(&k, || Ok(instance(1u32)));
        assert!(second.is_ok());
        assert!(store.peek(&k).is_some());
    }

    #[test]
    fn invalidate_drops_all_entries_for_identifier() {
        let store = SingletonStore::new();
        let weapon = probe_binding("Weapon");
        let armor = probe_binding("Armor");
        let plain = CacheKey::new(ServiceKey::symbol("Weapon"), &[], &weapon);
        let tagged = CacheKey::new(
            ServiceKey::symbol("Weapon"),
            &[Qualifier::tagged("type", "melee")],
            &weapon,
        );
        let other = key_for("Armor", &armor);

        for k in [&plain, &tagged, &other] {
            let _: Result<Instance, ()> = store.get_or_create(k, || Ok(instance(0u8)));
        }
        assert_eq!(store.len(), 3);

        assert_eq!(store.invalidate(&ServiceKey::symbol("Weapon")), 2);
        assert!(store.peek(&plain).is_none());
        assert!(store.peek(&other).is_some());
    }

    #[test]
    fn request_cache_round_trip() {
        let mut cache = RequestCache::new();
        let binding = probe_binding("Repo");
        let k = key_for("Repo", &binding);
        assert!(cache.get(&k).is_none());

        cache.insert(k.clone(), instance(5i64));
        let hit = cache.get(&k).unwrap();
        assert_eq!(*hit.downcast::<i64>().unwrap(), 5);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn deferred_reads_through_after_construction() {
        let store = Arc::new(SingletonStore::new());
        let binding = probe_binding("Engine");
        let k = key_for("Engine", &binding);
        let handle = Deferred::new(Arc::downgrade(&store), k.clone());

        assert!(!handle.resolved());
        assert!(handle.get_as::<u32>().is_none());

        let _: Result<Instance, ()> = store.get_or_create(&k, || Ok(instance(99u32)));
        assert!(handle.resolved());
        assert_eq!(*handle.get_as::<u32>().unwrap(), 99);
    }

    #[test]
    fn deferred_survives_store_drop() {
        let store = Arc::new(SingletonStore::new());
        let binding = probe_binding("Engine");
        let handle = Deferred::new(Arc::downgrade(&store), key_for("Engine", &binding));
        drop(store);
        assert!(handle.get().is_none());
    }
}
