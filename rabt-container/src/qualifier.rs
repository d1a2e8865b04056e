//! Qualifiers and binding constraints.
//!
//! A request carries zero or more [`Qualifier`]s (a name or tags) to
//! disambiguate among bindings of one identifier. A binding declares zero
//! or more [`Constraint`]s it matches: a name, a tag, or an arbitrary
//! condition evaluated against the [`MatchContext`] of the resolution.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::ContextData;
use crate::key::ServiceKey;

/// Request-side disambiguation attached to a dependency request.
///
/// Qualifiers are plain data: hashable and orderable so a sorted qualifier
/// list can fingerprint a cache entry.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Qualifier {
    /// A single name; exclusive with tags in practice, not enforced.
    Named(Cow<'static, str>),
    /// A key/value tag; a request may carry several.
    Tagged {
        key: Cow<'static, str>,
        value: Cow<'static, str>,
    },
}

impl Qualifier {
    /// Name qualifier.
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Qualifier::Named(name.into())
    }

    /// Tag qualifier.
    pub fn tagged(key: impl Into<Cow<'static, str>>, value: impl Into<Cow<'static, str>>) -> Self {
        Qualifier::Tagged {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Debug for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Qualifier::Named(name) => write!(f, "name={name:?}"),
            Qualifier::Tagged { key, value } => write!(f, "tag {key}={value}"),
        }
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Everything a condition predicate can see about the current resolution.
pub struct MatchContext<'a> {
    /// The identifier being resolved.
    pub key: &'a ServiceKey,
    /// The identifier whose construction requested this one, if any.
    pub parent: Option<&'a ServiceKey>,
    /// The full in-progress resolution path, outermost first.
    pub path: &'a [ServiceKey],
    /// Qualifiers supplied by the request.
    pub qualifiers: &'a [Qualifier],
    /// Ambient typed data attached to the resolution context.
    pub data: &'a ContextData,
}

impl MatchContext<'_> {
    /// Returns `true` when `ancestor` appears anywhere on the resolution path.
    pub fn has_ancestor(&self, ancestor: &ServiceKey) -> bool {
        self.path.contains(ancestor)
    }
}

/// Predicate evaluated against the resolution context.
pub type ConditionFn = Arc<dyn Fn(&MatchContext<'_>) -> bool + Send + Sync>;

/// Binding-side predicate: what requests this binding is willing to serve.
#[derive(Clone)]
pub enum Constraint {
    /// Matches requests carrying this name qualifier.
    Named(Cow<'static, str>),
    /// Matches requests carrying this tag qualifier.
    Tagged {
        key: Cow<'static, str>,
        value: Cow<'static, str>,
    },
    /// Matches when the condition holds for the current resolution.
    When(ConditionFn),
}

impl Constraint {
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Constraint::Named(name.into())
    }

    pub fn tagged(key: impl Into<Cow<'static, str>>, value: impl Into<Cow<'static, str>>) -> Self {
        Constraint::Tagged {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn when(condition: impl Fn(&MatchContext<'_>) -> bool + Send + Sync + 'static) -> Self {
        Constraint::When(Arc::new(condition))
    }

    /// Is this constraint satisfied by the request?
    pub(crate) fn satisfied_by(&self, ctx: &MatchContext<'_>) -> bool {
        match self {
            Constraint::Named(name) => ctx
                .qualifiers
                .iter()
                .any(|q| matches!(q, Qualifier::Named(n) if n == name)),
            Constraint::Tagged { key, value } => ctx.qualifiers.iter().any(
                |q| matches!(q, Qualifier::Tagged { key: k, value: v } if k == key && v == value),
            ),
            Constraint::When(condition) => condition(ctx),
        }
    }

    /// Does this constraint account for the given request qualifier?
    ///
    /// Conditions never accept a qualifier: a qualified request can only be
    /// served by a binding that names or tags itself accordingly.
    pub(crate) fn accepts(&self, qualifier: &Qualifier) -> bool {
        match (self, qualifier) {
            (Constraint::Named(a), Qualifier::Named(b)) => a == b,
            (
                Constraint::Tagged { key: ck, value: cv },
                Qualifier::Tagged { key: qk, value: qv },
            ) => ck == qk && cv == qv,
            _ => false,
        }
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Named(name) => write!(f, "name={name:?}"),
            Constraint::Tagged { key, value } => write!(f, "tag {key}={value}"),
            Constraint::When(_) => write!(f, "when(<condition>)"),
        }
    }
}

/// Canonical form of a qualifier list for cache keying: sorted and deduped.
pub(crate) fn fingerprint(qualifiers: &[Qualifier]) -> Vec<Qualifier> {
    let mut canonical = qualifiers.to_vec();
    canonical.sort();
    canonical.dedup();
    canonical
}
