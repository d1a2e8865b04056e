//! Service identification keys.
//!
//! A [`ServiceKey`] names one service contract inside the container. It is
//! either a Rust type token or a plain string symbol, so both
//! `ServiceKey::of::<dyn Logger>()` and `ServiceKey::symbol("Weapon")` are
//! valid identifiers. Many bindings may share one key.

use std::any::{TypeId, type_name};
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identifies a service contract in the container.
///
/// Equality and hashing are defined on the underlying token only: two type
/// keys are equal when their [`TypeId`]s match, two symbol keys when their
/// strings match, and a type key never equals a symbol key.
///
/// # Examples
/// ```
/// use rabt_container::key::ServiceKey;
///
/// let typed = ServiceKey::of::<String>();
/// assert_eq!(typed.display_name(), "alloc::string::String");
///
/// let symbol = ServiceKey::symbol("Weapon");
/// assert_eq!(symbol.display_name(), "Weapon");
/// assert_ne!(typed, symbol);
/// ```
#[derive(Clone)]
pub struct ServiceKey {
    token: Token,
}

#[derive(Clone)]
enum Token {
    Type { id: TypeId, name: &'static str },
    Symbol(Cow<'static, str>),
}

impl ServiceKey {
    /// Creates a key for type `T`.
    ///
    /// `T` may be unsized, so trait objects work: `ServiceKey::of::<dyn Logger>()`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            token: Token::Type {
                id: TypeId::of::<T>(),
                name: type_name::<T>(),
            },
        }
    }

    /// Creates a key from a string symbol.
    ///
    /// Symbol keys let front ends name contracts without a Rust type,
    /// e.g. identifiers read from configuration.
    #[inline]
    pub fn symbol(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            token: Token::Symbol(name.into()),
        }
    }

    /// Returns the [`TypeId`] for type keys, `None` for symbols.
    #[inline]
    pub fn type_id(&self) -> Option<TypeId> {
        match self.token {
            Token::Type { id, .. } => Some(id),
            Token::Symbol(_) => None,
        }
    }

    /// Returns `true` for symbol keys.
    #[inline]
    pub fn is_symbol(&self) -> bool {
        matches!(self.token, Token::Symbol(_))
    }

    /// Human-readable name, used throughout error output.
    #[inline]
    pub fn display_name(&self) -> &str {
        match &self.token {
            Token::Type { name, .. } => name,
            Token::Symbol(name) => name,
        }
    }
}

impl PartialEq for ServiceKey {
    fn eq(&self, other: &Self) -> bool {
        match (&self.token, &other.token) {
            (Token::Type { id: a, .. }, Token::Type { id: b, .. }) => a == b,
            (Token::Symbol(a), Token::Symbol(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ServiceKey {}

impl Hash for ServiceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.token {
            Token::Type { id, .. } => {
                0u8.hash(state);
                id.hash(state);
            }
            Token::Symbol(name) => {
                1u8.hash(state);
                name.hash(state);
            }
        }
    }
}

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.token {
            Token::Type { name, .. } => write!(f, "ServiceKey({name})"),
            Token::Symbol(name) => write!(f, "ServiceKey(symbol {name:?})"),
        }
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MyService;

    trait MyContract {}

    #[test]
    fn type_key_name() {
        let key = ServiceKey::of::<MyService>();
        assert!(key.display_name().contains("MyService"));
        assert!(!key.is_symbol());
    }

    #[test]
    fn type_keys_equal_for_same_type() {
        assert_eq!(ServiceKey::of::<String>(), ServiceKey::of::<String>());
    }

    #[test]
    fn type_keys_differ_for_different_types() {
        assert_ne!(ServiceKey::of::<String>(), ServiceKey::of::<i32>());
    }

    #[test]
    fn symbol_keys_compare_by_string() {
        assert_eq!(ServiceKey::symbol("Weapon"), ServiceKey::symbol("Weapon"));
        assert_ne!(ServiceKey::symbol("Weapon"), ServiceKey::symbol("Armor"));
    }

    #[test]
    fn symbol_never_equals_type() {
        assert_ne!(ServiceKey::symbol("String"), ServiceKey::of::<String>());
    }

    #[test]
    fn keys_work_in_hashmap() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ServiceKey::of::<String>(), "typed");
        map.insert(ServiceKey::symbol("Weapon"), "symbol");
        assert_eq!(map.get(&ServiceKey::of::<String>()), Some(&"typed"));
        assert_eq!(map.get(&ServiceKey::symbol("Weapon")), Some(&"symbol"));
        assert_eq!(map.get(&ServiceKey::symbol("Armor")), None);
    }

    #[test]
    fn trait_object_key() {
        let key = ServiceKey::of::<dyn MyContract>();
        assert!(key.display_name().contains("MyContract"));
    }

    #[test]
    fn owned_symbol_key() {
        let name = String::from("Weapon");
        assert_eq!(ServiceKey::symbol(name), ServiceKey::symbol("Weapon"));
    }
}
