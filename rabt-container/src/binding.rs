//! Bindings: how an identifier maps to a provider, scope and constraints.
//!
//! Four provider kinds exist. *Class* providers consult the metadata
//! provider for dependency slots and hand the resolved instances to a
//! construction callback. *Constant* providers hold a finished value.
//! *Dynamic* providers invoke a zero-argument callback per resolution.
//! *Factory* providers produce a callable which the consumer, not the
//! engine, invokes later.

use std::any::{Any, type_name};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::cache::Deferred;
use crate::container::Container;
use crate::error::BoxError;
use crate::key::ServiceKey;
use crate::qualifier::{Constraint, MatchContext, Qualifier};
use crate::scope::Scope;

/// A resolved instance: a shared, type-erased handle.
///
/// Shared handles make singleton identity observable (`Arc::ptr_eq`) and
/// keep caching cheap.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Wraps a value into an [`Instance`].
pub fn instance<T: Send + Sync + 'static>(value: T) -> Instance {
    Arc::new(value)
}

/// Construction callback of a class provider.
pub type ConstructFn =
    Arc<dyn Fn(&ServiceKey, ResolvedDeps) -> Result<Instance, BoxError> + Send + Sync>;

/// Zero-argument callback of a dynamic provider.
pub type DynamicFn = Arc<dyn Fn() -> Result<Instance, BoxError> + Send + Sync>;

/// Callback of a factory provider; receives a container handle and returns
/// the callable-as-instance.
pub type FactoryFn = Arc<dyn Fn(&Container) -> Result<Instance, BoxError> + Send + Sync>;

/// The ordered dependency instances handed to a construction callback.
pub struct ResolvedDeps {
    slots: Vec<Instance>,
}

impl ResolvedDeps {
    pub(crate) fn new(slots: Vec<Instance>) -> Self {
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Raw access to a slot.
    pub fn raw(&self, index: usize) -> Option<&Instance> {
        self.slots.get(index)
    }

    /// Typed access to a slot.
    pub fn arc<T: Send + Sync + 'static>(&self, index: usize) -> Result<Arc<T>, BoxError> {
        let slot = self
            .slots
            .get(index)
            .ok_or_else(|| format!("missing dependency slot {index}"))?;
        slot.clone()
            .downcast::<T>()
            .map_err(|_| format!("dependency slot {index} is not a {}", type_name::<T>()).into())
    }

    /// Access to a slot filled with a deferred handle (lazy singleton edge).
    pub fn deferred(&self, index: usize) -> Result<Deferred, BoxError> {
        self.arc::<Deferred>(index).map(|handle| (*handle).clone())
    }
}

/// What a binding does when it is selected.
#[derive(Clone)]
pub enum Provider {
    /// Metadata-driven construction: resolve the service's dependency
    /// slots, then invoke the construction callback.
    Class {
        service: ServiceKey,
        construct: ConstructFn,
    },
    /// A fixed, already-built value.
    Constant(Instance),
    /// A zero-argument callback invoked per resolution.
    Dynamic(DynamicFn),
    /// A callback producing a callable the consumer invokes later; the
    /// engine never recurses into the produced value.
    Factory(FactoryFn),
}

impl Provider {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Provider::Class { .. } => "class",
            Provider::Constant(_) => "constant",
            Provider::Dynamic(_) => "dynamic",
            Provider::Factory(_) => "factory",
        }
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Class { service, .. } => write!(f, "Class({})", service.display_name()),
            other => f.write_str(match other.kind() {
                "constant" => "Constant",
                "dynamic" => "Dynamic",
                _ => "Factory",
            }),
        }
    }
}

/// One registered association of an identifier with a provider.
///
/// # Examples
/// ```
/// use rabt_container::binding::{instance, Binding};
/// use rabt_container::key::ServiceKey;
/// use rabt_container::scope::Scope;
///
/// let melee = Binding::dynamic(ServiceKey::symbol("Weapon"), || Ok(instance("sword")))
///     .tagged("type", "melee")
///     .in_scope(Scope::Singleton);
/// assert_eq!(melee.scope(), Scope::Singleton);
/// ```
pub struct Binding {
    pub(crate) key: ServiceKey,
    pub(crate) provider: Provider,
    pub(crate) scope: Scope,
    pub(crate) constraints: Vec<Constraint>,
}

impl Binding {
    fn new(key: ServiceKey, provider: Provider, scope: Scope) -> Self {
        Self {
            key,
            provider,
            scope,
            constraints: Vec::new(),
        }
    }

    /// Class binding: `service` is the concrete type token handed to the
    /// metadata provider and the construction callback. Defaults to
    /// [`Scope::Transient`].
    pub fn class(
        key: ServiceKey,
        service: ServiceKey,
        construct: impl Fn(&ServiceKey, ResolvedDeps) -> Result<Instance, BoxError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self::new(
            key,
            Provider::Class {
                service,
                construct: Arc::new(construct),
            },
            Scope::Transient,
        )
    }

    /// Constant binding. Defaults to [`Scope::Singleton`]; the stored value
    /// is returned as-is on every resolution.
    pub fn constant(key: ServiceKey, value: Instance) -> Self {
        Self::new(key, Provider::Constant(value), Scope::Singleton)
    }

    /// Dynamic binding: the callback runs on every (uncached) resolution.
    /// Defaults to [`Scope::Transient`].
    pub fn dynamic(
        key: ServiceKey,
        produce: impl Fn() -> Result<Instance, BoxError> + Send + Sync + 'static,
    ) -> Self {
        Self::new(key, Provider::Dynamic(Arc::new(produce)), Scope::Transient)
    }

    /// Factory binding: the callback receives a container handle and
    /// returns the callable-as-instance. Defaults to [`Scope::Transient`].
    pub fn factory(
        key: ServiceKey,
        make: impl Fn(&Container) -> Result<Instance, BoxError> + Send + Sync + 'static,
    ) -> Self {
        Self::new(key, Provider::Factory(Arc::new(make)), Scope::Transient)
    }

    /// Sets the lifetime scope.
    pub fn in_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Constrains the binding to requests carrying this name.
    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.constraints.push(Constraint::named(name));
        self
    }

    /// Constrains the binding to requests carrying this tag.
    pub fn tagged(
        mut self,
        key: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
    ) -> Self {
        self.constraints.push(Constraint::tagged(key, value));
        self
    }

    /// Constrains the binding with a condition on the resolution context.
    pub fn when(
        mut self,
        condition: impl Fn(&MatchContext<'_>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.constraints.push(Constraint::when(condition));
        self
    }

    pub fn key(&self) -> &ServiceKey {
        &self.key
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub(crate) fn provider(&self) -> &Provider {
        &self.provider
    }

    /// The name/tag qualifiers a strict request carries when it selects
    /// this binding. Conditions contribute nothing. Used to key cache
    /// entries consistently between qualified resolution and enumeration.
    pub(crate) fn canonical_qualifiers(&self) -> Vec<Qualifier> {
        self.constraints
            .iter()
            .filter_map(|constraint| match constraint {
                Constraint::Named(name) => Some(Qualifier::Named(name.clone())),
                Constraint::Tagged { key, value } => Some(Qualifier::Tagged {
                    key: key.clone(),
                    value: value.clone(),
                }),
                Constraint::When(_) => None,
            })
            .collect()
    }

    /// One-line description for ambiguity errors and logs.
    pub(crate) fn describe(&self) -> String {
        let mut out = match &self.provider {
            Provider::Class { service, .. } => format!("class {}", service.display_name()),
            other => other.kind().to_string(),
        };
        for constraint in &self.constraints {
            out.push_str(&format!(" [{constraint:?}]"));
        }
        out.push_str(&format!(" ({})", self.scope));
        out
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("key", &self.key)
            .field("provider", &self.provider)
            .field("scope", &self.scope)
            .field("constraints", &self.constraints)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_per_provider_kind() {
        let class = Binding::class(
            ServiceKey::symbol("Svc"),
            ServiceKey::symbol("Svc"),
            |_, _| Ok(instance(())),
        );
        assert_eq!(class.scope(), Scope::Transient);

        let constant = Binding::constant(ServiceKey::symbol("Cfg"), instance(1u8));
        assert_eq!(constant.scope(), Scope::Singleton);
    }

    #[test]
    fn fluent_constraints_accumulate() {
        let binding = Binding::dynamic(ServiceKey::symbol("Weapon"), || Ok(instance("sword")))
            .tagged("type", "melee")
            .named("main")
            .in_scope(Scope::Request);

        assert_eq!(binding.constraints().len(), 2);
        assert_eq!(binding.scope(), Scope::Request);
    }

    #[test]
    fn describe_names_provider_and_constraints() {
        let binding = Binding::class(
            ServiceKey::symbol("Weapon"),
            ServiceKey::symbol("Sword"),
            |_, _| Ok(instance(())),
        )
        .tagged("type", "melee");

        let text = binding.describe();
        assert!(text.contains("class Sword"));
        assert!(text.contains("tag type=melee"));
        assert!(text.contains("Transient"));
    }

    #[test]
    fn resolved_deps_typed_access() {
        let deps = ResolvedDeps::new(vec![instance(42u32), instance(String::from("db"))]);
        assert_eq!(deps.len(), 2);
        assert_eq!(*deps.arc::<u32>(0).unwrap(), 42);
        assert_eq!(*deps.arc::<String>(1).unwrap(), "db");
    }

    #[test]
    fn resolved_deps_reports_bad_slots() {
        let deps = ResolvedDeps::new(vec![instance(42u32)]);

        let missing = deps.arc::<u32>(5).unwrap_err();
        assert!(missing.to_string().contains("missing dependency slot 5"));

        let mismatch = deps.arc::<String>(0).unwrap_err();
        assert!(mismatch.to_string().contains("is not a"));
    }
}
