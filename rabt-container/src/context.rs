//! Per-resolution state: request cache, cycle guard and ambient data.
//!
//! A [`ResolutionContext`] lives for exactly one top-level resolution (or
//! for the lifetime of a request scope that spans several). It is owned by
//! one caller at a time and needs no locking of its own; dropping it on any
//! exit path releases the request cache and the in-progress path.

use std::collections::HashSet;
use std::fmt;

use tracing::warn;

use crate::cache::RequestCache;
use crate::error::{CircularDependencyError, RabtError};
use crate::key::ServiceKey;

type AmbientMap = anymap2::Map<dyn anymap2::any::Any + Send + Sync>;

/// Caller-supplied typed values visible to condition predicates.
///
/// One value per type; inserting again replaces the previous value.
pub struct ContextData {
    values: AmbientMap,
}

impl ContextData {
    pub fn new() -> Self {
        Self {
            values: AmbientMap::new(),
        }
    }

    /// Attaches a value, returning the one it replaced, if any.
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.values.insert(value)
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.values.get::<T>()
    }

    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.values.contains::<T>()
    }
}

impl Default for ContextData {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ContextData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextData")
            .field("values", &self.values.len())
            .finish()
    }
}

/// Tracks identifiers currently being constructed on the active call path.
///
/// `enter` fails with [`RabtError::CircularDependency`] when an identifier
/// re-appears while still in progress; the error carries the cycle slice of
/// the path, from the first occurrence through the repeated identifier.
pub(crate) struct CycleGuard {
    path: Vec<ServiceKey>,
    active: HashSet<ServiceKey>,
}

impl CycleGuard {
    fn new() -> Self {
        Self {
            path: Vec::new(),
            active: HashSet::new(),
        }
    }

    /// Is the identifier already being constructed on this path?
    pub fn contains(&self, key: &ServiceKey) -> bool {
        self.active.contains(key)
    }

    /// Pushes an identifier onto the in-progress path.
    pub fn enter(&mut self, key: &ServiceKey) -> Result<(), RabtError> {
        if self.active.contains(key) {
            let chain = self.chain_to(key);
            warn!(key = %key, depth = self.path.len(), "circular dependency detected");
            return Err(RabtError::CircularDependency(CircularDependencyError {
                chain,
            }));
        }
        self.active.insert(key.clone());
        self.path.push(key.clone());
        Ok(())
    }

    /// Pops an identifier; must mirror a successful `enter`.
    pub fn exit(&mut self, key: &ServiceKey) {
        self.active.remove(key);
        if self.path.last() == Some(key) {
            self.path.pop();
        }
    }

    /// The in-progress path, outermost first.
    pub fn path(&self) -> &[ServiceKey] {
        &self.path
    }

    /// The identifier whose construction is requesting the current one.
    pub fn parent(&self) -> Option<&ServiceKey> {
        self.path.last()
    }

    /// The slice of the path that forms a cycle ending at `key`.
    pub fn chain_to(&self, key: &ServiceKey) -> Vec<ServiceKey> {
        let start = self.path.iter().position(|k| k == key).unwrap_or(0);
        let mut chain = self.path[start..].to_vec();
        chain.push(key.clone());
        chain
    }

    /// Clears the path. Called at the start of every top-level dispatch so
    /// an error swallowed mid-chain cannot leave stale in-progress entries.
    pub fn reset(&mut self) {
        self.path.clear();
        self.active.clear();
    }
}

/// Ephemeral state for one resolution request tree.
pub(crate) struct ResolutionContext {
    pub(crate) cache: RequestCache,
    pub(crate) guard: CycleGuard,
    pub(crate) data: ContextData,
}

impl ResolutionContext {
    pub fn new() -> Self {
        Self {
            cache: RequestCache::new(),
            guard: CycleGuard::new(),
            data: ContextData::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_tracks_path_order() {
        let mut guard = CycleGuard::new();
        let a = ServiceKey::symbol("A");
        let b = ServiceKey::symbol("B");

        guard.enter(&a).unwrap();
        guard.enter(&b).unwrap();
        assert_eq!(guard.path().len(), 2);
        assert_eq!(guard.parent(), Some(&b));

        guard.exit(&b);
        assert_eq!(guard.parent(), Some(&a));
        guard.exit(&a);
        assert!(guard.path().is_empty());
    }

    #[test]
    fn guard_detects_cycle_with_full_chain() {
        let mut guard = CycleGuard::new();
        let a = ServiceKey::symbol("A");
        let b = ServiceKey::symbol("B");
        let c = ServiceKey::symbol("C");

        guard.enter(&a).unwrap();
        guard.enter(&b).unwrap();
        guard.enter(&c).unwrap();

        let err = guard.enter(&b).unwrap_err();
        match err {
            RabtError::CircularDependency(e) => {
                let names: Vec<&str> = e.chain.iter().map(ServiceKey::display_name).collect();
                assert_eq!(names, vec!["B", "C", "B"]);
            }
            other => panic!("expected CircularDependency, got: {other:?}"),
        }
    }

    #[test]
    fn guard_detects_self_cycle() {
        let mut guard = CycleGuard::new();
        let a = ServiceKey::symbol("A");
        guard.enter(&a).unwrap();
        assert!(guard.enter(&a).is_err());
    }

    #[test]
    fn guard_reset_clears_everything() {
        let mut guard = CycleGuard::new();
        let a = ServiceKey::symbol("A");
        guard.enter(&a).unwrap();
        guard.reset();
        assert!(!guard.contains(&a));
        assert!(guard.enter(&a).is_ok());
    }

    #[test]
    fn context_data_is_typed() {
        struct Tenant(&'static str);
        struct Locale(&'static str);

        let mut data = ContextData::new();
        assert!(data.insert(Tenant("acme")).is_none());
        data.insert(Locale("ar"));

        assert_eq!(data.get::<Tenant>().map(|t| t.0), Some("acme"));
        assert_eq!(data.get::<Locale>().map(|l| l.0), Some("ar"));
        assert!(data.contains::<Tenant>());

        let previous = data.insert(Tenant("globex")).unwrap();
        assert_eq!(previous.0, "acme");
        assert_eq!(data.get::<Tenant>().map(|t| t.0), Some("globex"));
    }
}
