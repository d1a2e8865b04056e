//! Container modules — grouped binding registration.
//!
//! A module bundles related bindings so configuration splits by domain
//! instead of accumulating in one registration block:
//!
//! ```rust,ignore
//! let container = Container::builder()
//!     .module(&StorageModule)
//!     .module(&AuthModule)
//!     .build();
//! ```

use crate::container::ContainerBuilder;

/// A group of related binding registrations.
pub trait ContainerModule: Send + Sync {
    /// Registers this module's bindings. Called once while the container is
    /// being configured.
    fn register(&self, builder: &mut ContainerBuilder);

    /// Human-readable name for diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{Binding, instance};
    use crate::container::Container;
    use crate::key::ServiceKey;

    struct ArmoryModule;

    impl ContainerModule for ArmoryModule {
        fn register(&self, builder: &mut ContainerBuilder) {
            builder.register(
                Binding::dynamic(ServiceKey::symbol("Weapon"), || Ok(instance("sword")))
                    .tagged("type", "melee"),
            );
            builder.register(Binding::constant(
                ServiceKey::symbol("Banner"),
                instance("crimson"),
            ));
        }
    }

    #[test]
    fn module_bindings_resolve() {
        let container = Container::builder().module(&ArmoryModule).build();

        let banner = container.get_by(&ServiceKey::symbol("Banner"), &[]).unwrap();
        assert_eq!(*banner.downcast::<&str>().unwrap(), "crimson");
    }

    #[test]
    fn module_has_name() {
        assert!(ArmoryModule.name().contains("ArmoryModule"));
    }
}
