//! Core container engine for rabt DI.

pub mod binding;
pub mod cache;
pub mod container;
pub mod context;
pub mod error;
pub mod key;
pub mod matcher;
pub mod metadata;
pub mod middleware;
pub mod module;
pub mod qualifier;
pub mod registry;
pub mod scope;

pub use binding::{Binding, Instance, instance};
pub use container::prelude;
pub use container::{Container, ContainerBuilder, RequestScope};
pub use error::{BoxError, RabtError, Result};
pub use key::ServiceKey;
pub use qualifier::{Constraint, Qualifier};
pub use scope::Scope;
