//! Shared text helpers for the rabt workspace.
//!
//! Currently only error-output rendering lives here.

pub mod rendering;

pub use rendering::{render_candidates, render_chain, shorten_type_name, suggest_similar};
