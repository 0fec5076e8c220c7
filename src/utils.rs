//! Text helpers shared by the extractor, the LLM client and logging.
//!
//! - Whitespace normalization for titles, bodies and metadata
//! - Character-safe prefix truncation for payload bounding and log previews
//! - JSON error classification for truncated model responses

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Collapse every run of whitespace (spaces, tabs, newlines, NBSP) into a
/// single space and trim both ends.
///
/// Normalizing an already normalized string returns it unchanged.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(normalize_whitespace("  Road   Plan\nAnnounced "), "Road Plan Announced");
/// ```
pub fn normalize_whitespace(s: &str) -> String {
    WHITESPACE_RUN.replace_all(s, " ").trim().to_string()
}

/// Keep at most `max` characters of `s`.
///
/// The cut is a plain prefix on a `char` boundary, so the result is always
/// an exact prefix of the input and valid UTF-8 (Bengali text included).
///
/// # Arguments
///
/// * `s` - The text to cut
/// * `max` - Maximum number of characters (not bytes) to keep
///
/// # Returns
///
/// A borrowed prefix of `s`; `s` itself when it is already short enough.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and a count
/// of the dropped bytes appended.
///
/// # Arguments
///
/// * `s` - The string to potentially truncate
/// * `max` - Maximum number of characters to keep
///
/// # Returns
///
/// The original string if it fits, otherwise the prefix with
/// `"…(+N bytes)"` appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let kept = truncate_chars(s, max);
    if kept.len() == s.len() {
        s.to_string()
    } else {
        format!("{}…(+{} bytes)", kept, s.len() - kept.len())
    }
}

/// Detect if a serde_json error indicates truncated/incomplete JSON.
///
/// A model reply cut off by its token limit fails with an EOF error; the
/// analysis client logs those separately from schema mismatches.
pub fn looks_truncated(e: &serde_json::Error) -> bool {
    use serde_json::error::Category;
    matches!(e.classify(), Category::Eof)
}
