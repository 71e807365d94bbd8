//! Char-based text helpers shared by the stages.

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// First `max_chars` chars of `text`.
pub fn take_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Truncate to `max_chars` with a trailing `...`, keeping the result within the limit.
pub fn truncate_with_marker(text: &str, max_chars: usize) -> String {
    if char_len(text) <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    format!("{}...", take_chars(text, keep))
}

/// Newlines become spaces, then split on `.`. Pieces are returned untrimmed.
pub fn split_sentences(text: &str) -> Vec<String> {
    text.replace('\n', " ")
        .split('.')
        .map(str::to_string)
        .collect()
}

pub fn split_paragraphs(text: &str) -> Vec<&str> {
    text.split("\n\n").collect()
}
