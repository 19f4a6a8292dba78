//! Character-safe text helpers shared by every extractor.

/// Collapses every whitespace run (newlines included) to a single space.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First `limit` characters of `text`, never splitting a code point.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Like [`truncate_chars`] but marks the cut with `...`.
pub fn truncate_with_ellipsis(text: &str, limit: usize) -> String {
    let cut = truncate_chars(text, limit);
    if cut.len() < text.len() {
        format!("{cut}...")
    } else {
        text.to_string()
    }
}
