//! Common helpers shared across Gleaner crates.
//!
//! Kept deliberately small so that every crate in the workspace can depend on
//! it without pulling in the HTTP or extraction stacks.
//!
//! # Overview
//!
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`preview`]: Character-safe truncation used for log snippets and CLI output
//!
//! # Examples
//!
//! ```rust
//! use gleaner_common::preview;
//!
//! assert_eq!(preview("héllo world", 5), "héllo...");
//! assert_eq!(preview("short", 10), "short");
//! ```

pub mod observability;

/// Suffix appended by [`preview`] when text was cut.
pub const ELLIPSIS: &str = "...";

/// Return at most `max_chars` characters of `text`, followed by [`ELLIPSIS`]
/// when anything was dropped.
///
/// Counts `char`s rather than bytes so multi-byte text is never split inside
/// a code point.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            let mut out = String::with_capacity(cut + ELLIPSIS.len());
            out.push_str(&text[..cut]);
            out.push_str(ELLIPSIS);
            out
        }
        None => text.to_string(),
    }
}
