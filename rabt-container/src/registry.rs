//! Binding registry: ordered candidate lists per identifier.
//!
//! Many bindings may share one identifier; registration order is preserved
//! because it decides enumeration order for `get_all` and the order in
//! which conflicting bindings are named in ambiguity errors.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::binding::Binding;
use crate::key::ServiceKey;

/// Stores all binding registrations.
///
/// Mutation is serialized by the container (the registry sits behind a
/// lock); the registry itself is plain data.
#[derive(Default)]
pub(crate) struct Registry {
    bindings: HashMap<ServiceKey, Vec<Arc<Binding>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a binding to its identifier's candidate list.
    pub fn register(&mut self, binding: Binding) {
        debug!(
            key = %binding.key(),
            scope = %binding.scope(),
            provider = binding.provider().kind(),
            "registered binding"
        );
        self.bindings
            .entry(binding.key().clone())
            .or_default()
            .push(Arc::new(binding));
    }

    /// Replaces the identifier's whole candidate list with this binding.
    /// Returns how many bindings were displaced.
    pub fn rebind(&mut self, binding: Binding) -> usize {
        let key = binding.key().clone();
        let displaced = self
            .bindings
            .insert(key.clone(), vec![Arc::new(binding)])
            .map(|old| old.len())
            .unwrap_or(0);
        debug!(key = %key, displaced, "rebound identifier");
        displaced
    }

    /// Removes every binding for the identifier. Returns how many.
    pub fn unbind(&mut self, key: &ServiceKey) -> usize {
        let removed = self.bindings.remove(key).map(|old| old.len()).unwrap_or(0);
        debug!(key = %key, removed, "unbound identifier");
        removed
    }

    /// Candidate list in registration order, cloned out so resolution never
    /// runs under the registry lock.
    pub fn candidates(&self, key: &ServiceKey) -> Option<Vec<Arc<Binding>>> {
        self.bindings.get(key).cloned()
    }

    /// All registered identifiers.
    pub fn keys(&self) -> Vec<ServiceKey> {
        self.bindings.keys().cloned().collect()
    }

    /// Number of distinct identifiers.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Total number of bindings across all identifiers.
    pub fn binding_count(&self) -> usize {
        self.bindings.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::instance;

    fn weapon(tag: &'static str) -> Binding {
        Binding::dynamic(ServiceKey::symbol("Weapon"), move || Ok(instance(tag)))
            .tagged("type", tag)
    }

    #[test]
    fn register_preserves_order() {
        let mut registry = Registry::new();
        registry.register(weapon("melee"));
        registry.register(weapon("ranged"));

        let candidates = registry.candidates(&ServiceKey::symbol("Weapon")).unwrap();
        assert_eq!(candidates.len(), 2);
        assert!(candidates[0].describe().contains("melee"));
        assert!(candidates[1].describe().contains("ranged"));
    }

    #[test]
    fn rebind_replaces_whole_list() {
        let mut registry = Registry::new();
        registry.register(weapon("melee"));
        registry.register(weapon("ranged"));

        let displaced = registry.rebind(weapon("siege"));
        assert_eq!(displaced, 2);

        let candidates = registry.candidates(&ServiceKey::symbol("Weapon")).unwrap();
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].describe().contains("siege"));
    }

    #[test]
    fn unbind_removes_identifier() {
        let mut registry = Registry::new();
        registry.register(weapon("melee"));
        assert_eq!(registry.unbind(&ServiceKey::symbol("Weapon")), 1);
        assert!(registry.candidates(&ServiceKey::symbol("Weapon")).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn counts_identifiers_and_bindings() {
        let mut registry = Registry::new();
        registry.register(weapon("melee"));
        registry.register(weapon("ranged"));
        registry.register(Binding::constant(ServiceKey::symbol("Armor"), instance(1u8)));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.binding_count(), 3);
        assert_eq!(registry.keys().len(), 2);
    }
}
