//! # rabt — contextual dependency injection for Rust
//!
//! A runtime container engine: bindings map service identifiers to
//! providers, a qualifier-aware matcher picks among candidates, scopes
//! control instance lifetimes, cycles are guarded (with lazy singleton
//! support), and a middleware chain wraps resolution.
//!
//! # Examples
//! ```
//! use rabt::prelude::*;
//!
//! let container = Container::builder()
//!     .bind(
//!         Binding::dynamic(ServiceKey::symbol("Weapon"), || Ok(instance("sword")))
//!             .tagged("type", "melee"),
//!     )
//!     .bind(
//!         Binding::dynamic(ServiceKey::symbol("Weapon"), || Ok(instance("bow")))
//!             .tagged("type", "ranged"),
//!     )
//!     .build();
//!
//! let melee = container
//!     .get_as::<&str>(
//!         &ServiceKey::symbol("Weapon"),
//!         &[Qualifier::tagged("type", "melee")],
//!     )
//!     .unwrap();
//! assert_eq!(*melee, "sword");
//! ```

pub use rabt_container::*;
pub use rabt_support::*;
