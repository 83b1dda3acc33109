//! Alignment: job-aligned rewrites of summary, experience and skills.
//!
//! `AlignmentEngine` fans the three sub-operations out concurrently against
//! an optional `CompletionProvider`; `fallback` supplies deterministic
//! content when the provider is absent or fails non-terminally.

pub mod engine;
pub mod fallback;
pub mod prompts;

pub use engine::AlignmentEngine;

/// Upper bound on summary length, generated or fallback.
pub const SUMMARY_MAX_CHARS: usize = 900;
/// Upper bound on the number of skills in the skills line.
pub const MAX_SKILLS: usize = 14;

/// Cuts `text` to at most `max_chars` characters on a char boundary.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
