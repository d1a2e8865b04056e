//! Text rendering utilities for human-friendly error messages.
//!
//! Formats resolution paths, candidate listings, type names and
//! "did you mean?" suggestions for container error output.

/// Renders a resolution path as a single readable line.
///
/// # Examples
/// ```
/// use rabt_support::rendering::render_chain;
///
/// let chain = vec!["UserService", "UserRepo", "Database", "UserService"];
/// assert_eq!(render_chain(&chain), "UserService → UserRepo → Database → UserService");
/// ```
pub fn render_chain(links: &[impl AsRef<str>]) -> String {
    links
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(" → ")
}

/// Renders a candidate list as an indented bullet block.
///
/// Used when several bindings match one request and the error has to
/// name each of them.
pub fn render_candidates(candidates: &[impl AsRef<str>]) -> String {
    candidates
        .iter()
        .map(|c| format!("    - {}", c.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Shortens a fully qualified type name for display.
///
/// Module paths are stripped from every path segment while the generic
/// structure is preserved.
///
/// ```
/// use rabt_support::rendering::shorten_type_name;
///
/// assert_eq!(shorten_type_name("my_app::services::user::UserService"), "UserService");
/// assert_eq!(
///     shorten_type_name("alloc::sync::Arc<dyn my_app::traits::Logger>"),
///     "Arc<dyn Logger>"
/// );
/// ```
pub fn shorten_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut ident = String::new();

    for ch in full.chars() {
        if ch.is_alphanumeric() || ch == '_' || ch == ':' {
            ident.push(ch);
        } else {
            flush_segment(&mut out, &mut ident);
            out.push(ch);
        }
    }
    flush_segment(&mut out, &mut ident);
    out
}

fn flush_segment(out: &mut String, ident: &mut String) {
    if ident.is_empty() {
        return;
    }
    let last = ident.rsplit("::").next().unwrap_or(ident.as_str());
    out.push_str(last);
    ident.clear();
}

/// Scores registered names against a requested one and returns the
/// closest matches, best first.
///
/// Heuristic only: exact short-name match, containment, common prefix,
/// then positional character overlap. Good enough for a "did you mean?"
/// line, not a spell checker.
pub fn suggest_similar(requested: &str, available: &[&str], limit: usize) -> Vec<String> {
    let wanted = shorten_type_name(requested).to_lowercase();

    let mut scored: Vec<(usize, &str)> = available
        .iter()
        .filter_map(|&name| {
            let candidate = shorten_type_name(name).to_lowercase();
            if candidate == wanted {
                return Some((200, name));
            }
            if candidate.contains(&wanted) || wanted.contains(&candidate) {
                return Some((120, name));
            }

            let prefix = candidate
                .chars()
                .zip(wanted.chars())
                .take_while(|(a, b)| a == b)
                .count();
            if prefix >= 3 {
                return Some((prefix * 10, name));
            }

            let overlap = candidate
                .chars()
                .zip(wanted.chars())
                .filter(|(a, b)| a == b)
                .count();
            let longest = candidate.chars().count().max(wanted.chars().count());
            if longest > 0 && overlap * 10 >= longest * 6 {
                return Some((overlap, name));
            }
            None
        })
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored
        .into_iter()
        .take(limit)
        .map(|(_, name)| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_simple_chain() {
        assert_eq!(render_chain(&["A", "B", "A"]), "A → B → A");
    }

    #[test]
    fn render_single_link() {
        assert_eq!(render_chain(&["A"]), "A");
    }

    #[test]
    fn render_empty_chain() {
        let links: Vec<&str> = vec![];
        assert_eq!(render_chain(&links), "");
    }

    #[test]
    fn render_candidate_block() {
        let block = render_candidates(&["class Sword (Transient)", "class Bow (Transient)"]);
        assert_eq!(block, "    - class Sword (Transient)\n    - class Bow (Transient)");
    }

    #[test]
    fn shorten_plain_path() {
        assert_eq!(shorten_type_name("my_app::services::UserService"), "UserService");
    }

    #[test]
    fn shorten_generic_path() {
        assert_eq!(
            shorten_type_name("alloc::sync::Arc<dyn my_app::traits::Logger>"),
            "Arc<dyn Logger>"
        );
    }

    #[test]
    fn shorten_bare_name() {
        assert_eq!(shorten_type_name("String"), "String");
    }

    #[test]
    fn shorten_tuple_of_paths() {
        assert_eq!(
            shorten_type_name("(core::num::NonZeroU32, alloc::string::String)"),
            "(NonZeroU32, String)"
        );
    }

    #[test]
    fn suggest_close_typo() {
        let available = vec![
            "my_app::UserService",
            "my_app::UserRepository",
            "my_app::Logger",
        ];
        let suggestions = suggest_similar("UserServise", &available, 3);
        assert!(!suggestions.is_empty());
        assert!(suggestions[0].contains("UserService"));
    }

    #[test]
    fn suggest_nothing_for_unrelated() {
        let available = vec!["my_app::Database"];
        assert!(suggest_similar("XyzAbcQ", &available, 3).is_empty());
    }

    #[test]
    fn suggest_respects_limit() {
        let available = vec!["a::Widget", "b::Widget2", "c::Widget3", "d::Widget4"];
        assert_eq!(suggest_similar("Widget", &available, 2).len(), 2);
    }
}
