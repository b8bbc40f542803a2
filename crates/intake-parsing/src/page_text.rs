use intake_core::{PageContent, TextMode};

use crate::text_processing::{join_words, normalize_page_text};

/// Pull plain text out of one page.
///
/// Modes are attempted in [`TextMode::ALL`] order (default, layout-preserving,
/// word list) and the first non-blank result wins. Word-list output is joined
/// with single spaces. A mode that errors counts as blank. Returns `None` when
/// the page carries no text in any supported mode.
pub fn extract_page_text(page: &dyn PageContent) -> Option<String> {
    for mode in TextMode::ALL {
        if !page.supports(mode) {
            continue;
        }
        let text = match page.text(mode) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!(?mode, error = %e, "text extraction mode failed");
                continue;
            }
        };
        let text = match mode {
            TextMode::Words => join_words(&text),
            TextMode::Plain | TextMode::Layout => text,
        };
        if !text.trim().is_empty() {
            return Some(normalize_page_text(&text));
        }
    }
    None
}
