/// Expand common typographic ligatures found in PDFs.
pub fn expand_ligatures(text: &str) -> String {
    text.replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
        .replace(['\u{FB05}', '\u{FB06}'], "st")
}

/// Normalize extracted page text before field matching.
///
/// - ligatures expanded
/// - `\r\n` and lone `\r` become `\n`
/// - non-breaking and other fixed-width spaces become plain spaces
/// - form feeds become newlines
pub fn normalize_page_text(text: &str) -> String {
    expand_ligatures(text)
        .replace("\r\n", "\n")
        .replace(['\r', '\u{000C}'], "\n")
        .replace(['\u{00A0}', '\u{2007}', '\u{202F}'], " ")
}

/// Collapse a word list into a single line separated by single spaces.
pub fn join_words(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The first `max_chars` characters of `text`, for log previews.
pub fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
