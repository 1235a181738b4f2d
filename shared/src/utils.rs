//! # Shared Utility Functions
//!
//! Display helpers used by the chat client when rendering chat lists.
//!
//! - [`preview`] - Shorten message content to a character budget with an ellipsis
//! - [`short_id`] - Show the first N characters of an opaque id
//!
//! ## Usage
//!
//! ```rust
//! use shared::utils::preview;
//!
//! assert_eq!(preview("Fresh tomatoes, 20 crates available", 14), "Fresh tomatoes...");
//! assert_eq!(preview("Ok", 14), "Ok");
//! ```

/// Shorten `content` to at most `max_chars` characters, appending `...` when cut.
///
/// Counts characters, not bytes, so multi-byte text never splits mid-character.
/// Newlines are flattened to spaces so a preview always fits on one line.
///
/// # Examples
///
/// ```rust
/// use shared::utils::preview;
///
/// assert_eq!(preview("ñandú ñandú", 5), "ñandú...");
/// assert_eq!(preview("line one\nline two", 40), "line one line two");
/// ```
pub fn preview(content: &str, max_chars: usize) -> String {
    let flat = content.trim().replace(['\n', '\r'], " ");

    if flat.chars().count() <= max_chars {
        return flat;
    }

    let cut: String = flat.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}

/// First `len` characters of an id, for compact log and list output.
pub fn short_id(id: &str, len: usize) -> &str {
    match id.char_indices().nth(len) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}
