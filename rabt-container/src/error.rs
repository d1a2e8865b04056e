//! Error types for container operations.
//!
//! Every failure carries enough context (identifier, resolution path,
//! candidate descriptions) to diagnose without re-running resolution.

use std::fmt;

use rabt_support::rendering::{render_candidates, render_chain};

use crate::key::ServiceKey;
use crate::qualifier::Qualifier;

/// Failure type for external callbacks (construction, dynamic and factory
/// providers). The engine wraps it with identifier and path context.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for all container operations.
#[derive(Debug, thiserror::Error)]
pub enum RabtError {
    /// No binding registered for the requested identifier.
    #[error("{}", .0)]
    UnknownIdentifier(UnknownIdentifierError),

    /// Candidates exist, but none match the request's qualifiers/conditions.
    #[error("{}", .0)]
    NoMatchingBinding(NoMatchingBindingError),

    /// More than one binding matches the request; the engine never guesses.
    #[error("{}", .0)]
    AmbiguousBinding(AmbiguousBindingError),

    /// A binding's dependency chain loops back into itself.
    #[error("{}", .0)]
    CircularDependency(CircularDependencyError),

    /// A provider callback failed while producing an instance.
    #[error("failed to construct {key}{}: {source}", path_suffix(.path))]
    ConstructionFailed {
        key: ServiceKey,
        path: Vec<ServiceKey>,
        #[source]
        source: BoxError,
    },
}

fn path_suffix(path: &[ServiceKey]) -> String {
    if path.is_empty() {
        return String::new();
    }
    let names: Vec<&str> = path.iter().map(ServiceKey::display_name).collect();
    format!(" (resolution path: {})", render_chain(&names))
}

/// No binding was ever registered for the identifier.
#[derive(Debug)]
pub struct UnknownIdentifierError {
    /// The identifier that was requested.
    pub requested: ServiceKey,
    /// The identifier whose construction needed it, if resolution was nested.
    pub required_by: Option<ServiceKey>,
    /// Registered identifiers with similar names.
    pub suggestions: Vec<String>,
}

impl fmt::Display for UnknownIdentifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no binding registered for {}", self.requested)?;
        if let Some(parent) = &self.required_by {
            write!(f, "\n  required by: {parent}")?;
        }
        if !self.suggestions.is_empty() {
            write!(f, "\n  did you mean:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }
        write!(
            f,
            "\n  hint: register a binding for {} before resolving it",
            self.requested.display_name()
        )
    }
}

/// Candidates exist for the identifier, but none survives qualifier filtering.
#[derive(Debug)]
pub struct NoMatchingBindingError {
    pub requested: ServiceKey,
    /// Qualifiers the request carried.
    pub qualifiers: Vec<Qualifier>,
    /// How many candidate bindings were registered for the identifier.
    pub candidates: usize,
}

impl fmt::Display for NoMatchingBindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} candidate binding(s) for {}, but none match the request",
            self.candidates, self.requested
        )?;
        if self.qualifiers.is_empty() {
            write!(f, "\n  qualifiers: (none)")?;
        } else {
            let listed: Vec<String> = self.qualifiers.iter().map(|q| q.to_string()).collect();
            write!(f, "\n  qualifiers: {}", listed.join(", "))?;
        }
        write!(
            f,
            "\n  hint: add a matching name/tag to one binding, or adjust the request qualifiers"
        )
    }
}

/// More than one binding matches the request.
#[derive(Debug)]
pub struct AmbiguousBindingError {
    pub requested: ServiceKey,
    /// Descriptions of the conflicting bindings, in registration order.
    pub matched: Vec<String>,
}

impl fmt::Display for AmbiguousBindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ambiguous request for {}: {} bindings match",
            self.requested,
            self.matched.len()
        )?;
        write!(f, "\n{}", render_candidates(&self.matched))?;
        write!(
            f,
            "\n  hint: qualify the request with a name or tag, or constrain the bindings"
        )
    }
}

/// A dependency chain loops back into an identifier still being constructed.
#[derive(Debug)]
pub struct CircularDependencyError {
    /// The cycle, from the first occurrence back to the repeated identifier.
    pub chain: Vec<ServiceKey>,
}

impl fmt::Display for CircularDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.chain.iter().map(ServiceKey::display_name).collect();
        write!(f, "circular dependency detected:\n  {}", render_chain(&names))?;
        write!(
            f,
            "\n  hint: mark a singleton edge as deferred, or restructure the graph"
        )
    }
}

/// Convenient Result type for container operations.
pub type Result<T> = std::result::Result<T, RabtError>;
