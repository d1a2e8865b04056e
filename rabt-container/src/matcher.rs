//! Contextual matcher: picks the binding that serves a request.
//!
//! A binding is eligible when every constraint it declares is satisfied by
//! the request AND every qualifier the request supplies is accounted for by
//! one of the binding's name/tag constraints. The second rule keeps a
//! qualified request from silently landing on an unconstrained default.
//!
//! Selection never guesses: zero eligible bindings is
//! [`NoMatchingBinding`](crate::error::RabtError::NoMatchingBinding), more
//! than one is [`AmbiguousBinding`](crate::error::RabtError::AmbiguousBinding).

use std::sync::Arc;

use tracing::trace;

use crate::binding::Binding;
use crate::error::{AmbiguousBindingError, NoMatchingBindingError, RabtError};
use crate::qualifier::{Constraint, MatchContext};

pub(crate) fn eligible(binding: &Binding, ctx: &MatchContext<'_>) -> bool {
    binding
        .constraints()
        .iter()
        .all(|constraint| constraint.satisfied_by(ctx))
        && ctx.qualifiers.iter().all(|qualifier| {
            binding
                .constraints()
                .iter()
                .any(|constraint| constraint.accepts(qualifier))
        })
}

/// Selects exactly one binding for a single resolution.
pub(crate) fn select(
    candidates: &[Arc<Binding>],
    ctx: &MatchContext<'_>,
) -> Result<Arc<Binding>, RabtError> {
    let mut matched: Vec<&Arc<Binding>> = candidates
        .iter()
        .filter(|binding| eligible(binding, ctx))
        .collect();

    trace!(
        key = %ctx.key,
        candidates = candidates.len(),
        matched = matched.len(),
        "matched candidate bindings"
    );

    match matched.len() {
        1 => Ok(Arc::clone(matched.remove(0))),
        0 => Err(RabtError::NoMatchingBinding(NoMatchingBindingError {
            requested: ctx.key.clone(),
            qualifiers: ctx.qualifiers.to_vec(),
            candidates: candidates.len(),
        })),
        _ => Err(RabtError::AmbiguousBinding(AmbiguousBindingError {
            requested: ctx.key.clone(),
            matched: matched.iter().map(|binding| binding.describe()).collect(),
        })),
    }
}

/// Selects every binding that matches, for enumeration (`get_all`).
///
/// With no request qualifiers, name/tag constraints do not exclude a
/// binding (they disambiguate single resolution, they don't gate
/// enumeration), but `When` conditions are always honored. With
/// qualifiers, strict eligibility applies.
pub(crate) fn select_all(
    candidates: &[Arc<Binding>],
    ctx: &MatchContext<'_>,
) -> Vec<Arc<Binding>> {
    if ctx.qualifiers.is_empty() {
        candidates
            .iter()
            .filter(|binding| {
                binding.constraints().iter().all(|constraint| match constraint {
                    Constraint::When(_) => constraint.satisfied_by(ctx),
                    _ => true,
                })
            })
            .cloned()
            .collect()
    } else {
        candidates
            .iter()
            .filter(|binding| eligible(binding, ctx))
            .cloned()
            .collect()
    }
}
