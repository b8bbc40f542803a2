use lopdf::Document;

use intake_core::{BackendError, PageContent, PageDocument, PageSource, TextMode};

/// lopdf-based implementation of [`PageSource`].
///
/// Used as the alternate library when the primary one cannot open or iterate
/// a document. Only the default [`TextMode::Plain`] extraction is offered.
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfPageSource;

impl LopdfPageSource {
    pub fn new() -> Self {
        Self
    }
}

impl PageSource for LopdfPageSource {
    fn name(&self) -> &str {
        "lopdf"
    }

    fn open(&self, bytes: &[u8]) -> Result<Box<dyn PageDocument>, BackendError> {
        let document = Document::load_mem(bytes).map_err(|e| BackendError::OpenError(e.to_string()))?;
        if document.is_encrypted() {
            return Err(BackendError::OpenError("document is encrypted".into()));
        }
        // get_pages() is keyed by 1-based page number, in page order
        let page_numbers = document.get_pages().into_keys().collect();
        Ok(Box::new(LopdfDocument {
            document,
            page_numbers,
        }))
    }
}

struct LopdfDocument {
    document: Document,
    page_numbers: Vec<u32>,
}

impl PageDocument for LopdfDocument {
    fn page_count(&self) -> usize {
        self.page_numbers.len()
    }

    fn load_page(&self, index: usize) -> Result<Box<dyn PageContent + '_>, BackendError> {
        let page_number = *self
            .page_numbers
            .get(index)
            .ok_or_else(|| BackendError::ExtractionError(format!("no page {}", index + 1)))?;
        Ok(Box::new(LopdfPage {
            document: &self.document,
            page_number,
        }))
    }
}

struct LopdfPage<'a> {
    document: &'a Document,
    page_number: u32,
}

impl PageContent for LopdfPage<'_> {
    fn text(&self, mode: TextMode) -> Result<String, BackendError> {
        if mode != TextMode::Plain {
            return Err(BackendError::ExtractionError(format!(
                "{:?} extraction is not supported by lopdf",
                mode
            )));
        }
        self.document
            .extract_text(&[self.page_number])
            .map_err(|e| {
                tracing::debug!(page = self.page_number, error = %e, "lopdf text extraction failed");
                BackendError::ExtractionError(e.to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_rejects_garbage() {
        assert!(matches!(
            LopdfPageSource::new().open(b"definitely not a PDF"),
            Err(BackendError::OpenError(_))
        ));
    }

    #[test]
    fn test_only_plain_mode_supported() {
        let document = Document::with_version("1.5");
        let page = LopdfPage {
            document: &document,
            page_number: 1,
        };
        assert!(page.supports(TextMode::Plain));
        assert!(!page.supports(TextMode::Layout));
        assert!(!page.supports(TextMode::Words));
        assert!(page.text(TextMode::Words).is_err());
    }
}
