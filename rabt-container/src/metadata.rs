//! The metadata provider boundary.
//!
//! The engine never inspects service types itself: an external
//! [`MetadataProvider`] supplies, per service type, the ordered list of
//! dependency slots its constructor needs. Front ends can back this with
//! static tables, generated code, or reflection where available.

use std::collections::HashMap;

use crate::key::ServiceKey;
use crate::qualifier::Qualifier;

/// One constructor parameter of a service: which identifier to resolve,
/// with which qualifier, and whether the slot accepts a deferred handle.
#[derive(Clone, Debug)]
pub struct DependencySlot {
    /// Identifier to resolve for this slot.
    pub key: ServiceKey,
    /// Qualifier bound to the recursive resolution of this slot.
    pub qualifier: Option<Qualifier>,
    /// The construction callback accepts a [`Deferred`](crate::cache::Deferred)
    /// handle in this slot, allowing singleton cycles through it.
    pub lazy: bool,
}

impl DependencySlot {
    pub fn new(key: ServiceKey) -> Self {
        Self {
            key,
            qualifier: None,
            lazy: false,
        }
    }

    /// Attaches a qualifier to the slot's resolution request.
    pub fn qualified(mut self, qualifier: Qualifier) -> Self {
        self.qualifier = Some(qualifier);
        self
    }

    /// Marks the slot as accepting a deferred handle.
    pub fn deferred(mut self) -> Self {
        self.lazy = true;
        self
    }

    pub(crate) fn request_qualifiers(&self) -> Vec<Qualifier> {
        self.qualifier.iter().cloned().collect()
    }
}

/// Supplies constructor dependency metadata for service types.
pub trait MetadataProvider: Send + Sync {
    /// Ordered dependency slots of `service`. An empty list means the
    /// service constructs directly, without resolved dependencies.
    fn dependencies_of(&self, service: &ServiceKey) -> Vec<DependencySlot>;

    /// Human-readable name for diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Provider that knows no dependencies; every service constructs directly.
pub struct EmptyMetadata;

impl MetadataProvider for EmptyMetadata {
    fn dependencies_of(&self, _service: &ServiceKey) -> Vec<DependencySlot> {
        Vec::new()
    }
}

/// Static registration table mapping service types to their slots.
///
/// # Examples
/// ```
/// use rabt_container::key::ServiceKey;
/// use rabt_container::metadata::{DependencySlot, MetadataProvider, StaticMetadata};
///
/// struct Repo;
/// struct Db;
///
/// let metadata = StaticMetadata::new()
///     .service(
///         ServiceKey::of::<Repo>(),
///         vec![DependencySlot::new(ServiceKey::of::<Db>())],
///     );
///
/// assert_eq!(metadata.dependencies_of(&ServiceKey::of::<Repo>()).len(), 1);
/// assert!(metadata.dependencies_of(&ServiceKey::of::<Db>()).is_empty());
/// ```
#[derive(Default)]
pub struct StaticMetadata {
    table: HashMap<ServiceKey, Vec<DependencySlot>>,
}

impl StaticMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares the ordered slots of one service type.
    pub fn service(mut self, service: ServiceKey, slots: Vec<DependencySlot>) -> Self {
        self.table.insert(service, slots);
        self
    }
}

impl MetadataProvider for StaticMetadata {
    fn dependencies_of(&self, service: &ServiceKey) -> Vec<DependencySlot> {
        self.table.get(service).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_metadata_knows_nothing() {
        let provider = EmptyMetadata;
        assert!(provider
            .dependencies_of(&ServiceKey::symbol("anything"))
            .is_empty());
    }

    #[test]
    fn static_table_preserves_slot_order() {
        let service = ServiceKey::symbol("UserService");
        let metadata = StaticMetadata::new().service(
            service.clone(),
            vec![
                DependencySlot::new(ServiceKey::symbol("Repo")),
                DependencySlot::new(ServiceKey::symbol("Logger"))
                    .qualified(Qualifier::named("audit")),
            ],
        );

        let slots = metadata.dependencies_of(&service);
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].key, ServiceKey::symbol("Repo"));
        assert_eq!(slots[1].qualifier, Some(Qualifier::named("audit")));
    }

    #[test]
    fn slot_qualifier_becomes_request_qualifiers() {
        let bare = DependencySlot::new(ServiceKey::symbol("Db"));
        assert!(bare.request_qualifiers().is_empty());

        let qualified = DependencySlot::new(ServiceKey::symbol("Db"))
            .qualified(Qualifier::tagged("pool", "primary"));
        assert_eq!(
            qualified.request_qualifiers(),
            vec![Qualifier::tagged("pool", "primary")]
        );
    }

    #[test]
    fn deferred_marks_slot_lazy() {
        let slot = DependencySlot::new(ServiceKey::symbol("Peer")).deferred();
        assert!(slot.lazy);
    }

    #[test]
    fn provider_has_name() {
        assert!(EmptyMetadata.name().contains("EmptyMetadata"));
    }
}
