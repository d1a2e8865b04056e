//! Binding lifetime scopes.
//!
//! A scope decides how long a constructed instance lives:
//! - [`Scope::Singleton`] — one instance for the container's lifetime
//! - [`Scope::Request`] — one instance per resolution request tree
//! - [`Scope::Transient`] — new instance on every resolution

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifetime policy attached to a binding.
///
/// # Examples
/// ```
/// use rabt_container::scope::Scope;
///
/// assert!(Scope::Singleton.is_cached());
/// assert!(!Scope::Transient.is_cached());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    /// One instance shared for the container's lifetime.
    ///
    /// Constructed on first resolution, released on container teardown.
    Singleton,

    /// One instance per resolution request tree.
    ///
    /// Shared across all resolutions triggered by one top-level `get`
    /// call (or across the calls made through one request scope), then
    /// discarded.
    Request,

    /// New instance on every resolution. Never cached.
    Transient,
}

impl Scope {
    /// Returns `true` if instances of this scope are cached.
    #[inline]
    pub fn is_cached(&self) -> bool {
        matches!(self, Scope::Singleton | Scope::Request)
    }

    /// Returns `true` for the container-lifetime scope.
    #[inline]
    pub fn is_singleton(&self) -> bool {
        matches!(self, Scope::Singleton)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Singleton => write!(f, "Singleton"),
            Scope::Request => write!(f, "Request"),
            Scope::Transient => write!(f, "Transient"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cached_scopes() {
        assert!(Scope::Singleton.is_cached());
        assert!(Scope::Request.is_cached());
        assert!(!Scope::Transient.is_cached());
    }

    #[test]
    fn singleton_check() {
        assert!(Scope::Singleton.is_singleton());
        assert!(!Scope::Request.is_singleton());
    }

    #[test]
    fn display_names() {
        assert_eq!(Scope::Singleton.to_string(), "Singleton");
        assert_eq!(Scope::Request.to_string(), "Request");
        assert_eq!(Scope::Transient.to_string(), "Transient");
    }
}
