//! Page-by-page search strategies.
//!
//! Both strategies stop at the first page that yields a name AND a date of
//! birth. Fields found on different pages are never combined.

use intake_core::{
    BackendError, ExtractionResult, OcrEngine, OcrError, PageSource, Rasterizer,
};

use crate::config::ParsingConfig;
use crate::page_text::extract_page_text;
use crate::text_processing::{normalize_page_text, preview};
use crate::{date, name};

/// Default rasterization resolution for OCR.
pub const DEFAULT_OCR_DPI: u32 = 300;

/// Default OCR language model.
pub const DEFAULT_OCR_LANGUAGE: &str = "eng";

/// Result of running the text-layer strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextLayerOutcome {
    /// One page carried both fields.
    Complete(ExtractionResult),
    /// The document was readable but no single page carried both fields.
    Incomplete,
    /// No page source could open and iterate the document.
    Unreadable(String),
}

/// Run both parsers on one page's text. Returns a result only when the page
/// carries both fields.
pub(crate) fn match_page(
    text: &str,
    page: usize,
    current_year: i32,
    config: &ParsingConfig,
) -> Option<ExtractionResult> {
    let name = name::extract_patient_name_with_config(text, config);
    let dob = date::extract_date_of_birth_with_config(text, current_year, config);

    tracing::debug!(
        page = page + 1,
        name = name.is_some(),
        dob = dob.is_some(),
        "page extraction results"
    );

    match (name, dob) {
        (Some(name), Some(dob)) => Some(ExtractionResult::new(name, dob)),
        _ => None,
    }
}

/// Searches the document's text layer through an ordered list of page sources.
///
/// The first source is the primary library; later sources are consulted only
/// when an earlier one fails to open or iterate the document.
pub struct TextLayerStrategy {
    sources: Vec<Box<dyn PageSource>>,
}

impl TextLayerStrategy {
    pub fn new(sources: Vec<Box<dyn PageSource>>) -> Self {
        Self { sources }
    }

    /// Names of the configured sources, in order.
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub fn run(&self, bytes: &[u8], current_year: i32, config: &ParsingConfig) -> TextLayerOutcome {
        let mut last_error = String::from("no page sources configured");

        for source in &self.sources {
            match scan_source(source.as_ref(), bytes, current_year, config) {
                Ok(Some(result)) => return TextLayerOutcome::Complete(result),
                Ok(None) => {
                    tracing::warn!(
                        source = source.name(),
                        "could not find all required information on any single page"
                    );
                    return TextLayerOutcome::Incomplete;
                }
                Err(e) => {
                    tracing::warn!(source = source.name(), error = %e, "page source failed, trying next");
                    last_error = format!("{}: {}", source.name(), e);
                }
            }
        }

        TextLayerOutcome::Unreadable(last_error)
    }

    /// Text of every page, from the first source that can iterate the whole
    /// document. `None` entries are pages without text.
    pub fn page_texts(&self, bytes: &[u8]) -> Result<Vec<Option<String>>, BackendError> {
        let mut last_error = BackendError::OpenError("no page sources configured".into());

        for source in &self.sources {
            match collect_source_texts(source.as_ref(), bytes) {
                Ok(texts) => return Ok(texts),
                Err(e) => {
                    tracing::warn!(source = source.name(), error = %e, "page source failed, trying next");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}

/// Scan one source page by page. `Ok(None)` means every page was read
/// without a full match; `Err` means the source could not open or iterate.
fn scan_source(
    source: &dyn PageSource,
    bytes: &[u8],
    current_year: i32,
    config: &ParsingConfig,
) -> Result<Option<ExtractionResult>, BackendError> {
    let document = source.open(bytes)?;
    let page_count = document.page_count();
    tracing::info!(source = source.name(), pages = page_count, "processing text layer page by page");

    for index in 0..page_count {
        let page = document.load_page(index)?;
        let Some(text) = extract_page_text(page.as_ref()) else {
            tracing::warn!(source = source.name(), page = index + 1, "no text extracted from page");
            continue;
        };
        tracing::debug!(
            source = source.name(),
            page = index + 1,
            chars = text.len(),
            preview = preview(&text, 500),
            "page text"
        );

        if let Some(result) = match_page(&text, index, current_year, config) {
            tracing::info!(
                source = source.name(),
                page = index + 1,
                "found all required information, stopping early"
            );
            return Ok(Some(result));
        }
    }

    Ok(None)
}

fn collect_source_texts(
    source: &dyn PageSource,
    bytes: &[u8],
) -> Result<Vec<Option<String>>, BackendError> {
    let document = source.open(bytes)?;
    (0..document.page_count())
        .map(|index| -> Result<Option<String>, BackendError> {
            let page = document.load_page(index)?;
            Ok(extract_page_text(page.as_ref()))
        })
        .collect()
}

/// Searches rasterized pages with an OCR engine.
pub struct OcrStrategy {
    rasterizer: Box<dyn Rasterizer>,
    engine: Box<dyn OcrEngine>,
    dpi: u32,
    language: String,
}

impl OcrStrategy {
    pub fn new(rasterizer: Box<dyn Rasterizer>, engine: Box<dyn OcrEngine>) -> Self {
        Self {
            rasterizer,
            engine,
            dpi: DEFAULT_OCR_DPI,
            language: DEFAULT_OCR_LANGUAGE.to_string(),
        }
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Rasterize and recognize pages in order until one carries both fields.
    ///
    /// `Ok(None)` means every page was recognized without a full match.
    pub fn run(
        &self,
        bytes: &[u8],
        current_year: i32,
        config: &ParsingConfig,
    ) -> Result<Option<ExtractionResult>, OcrError> {
        tracing::info!(dpi = self.dpi, "converting PDF pages to images for OCR");
        let images = self.rasterizer.rasterize(bytes, self.dpi)?;
        tracing::info!(pages = images.len(), "converted pages to images");
        let mut session = self.engine.session(&self.language)?;

        for image in &images {
            let page = image.page_index;
            tracing::debug!(page = page + 1, "running OCR on page");
            let text = normalize_page_text(&session.recognize(image)?);
            if text.trim().is_empty() {
                tracing::warn!(page = page + 1, "no text extracted from page via OCR");
                continue;
            }
            tracing::debug!(
                page = page + 1,
                chars = text.len(),
                preview = preview(&text, 500),
                "OCR page text"
            );

            if let Some(result) = match_page(&text, page, current_year, config) {
                tracing::info!(page = page + 1, "found all required information, stopping OCR early");
                return Ok(Some(result));
            }
        }

        tracing::warn!("could not find all required information on any single OCR page");
        Ok(None)
    }

    /// Recognized text of every page.
    pub fn page_texts(&self, bytes: &[u8]) -> Result<Vec<String>, OcrError> {
        let images = self.rasterizer.rasterize(bytes, self.dpi)?;
        let mut session = self.engine.session(&self.language)?;
        images
            .iter()
            .map(|image| session.recognize(image).map(|text| normalize_page_text(&text)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use intake_core::mock::{MockOcrEngine, MockPage, MockPageSource, MockRasterizer, MockRecognition};

    const YEAR: i32 = 2024;

    fn complete(first: &str, last: &str, y: i32, m: u32, d: u32) -> String {
        format!(
            "Patient Name and Address   Patient Date of Birth\n{} {} {:02}/{:02}/{}",
            first, last, m, d, y
        )
    }

    #[test]
    fn test_match_page_requires_both_fields() {
        let config = ParsingConfig::default();
        assert!(match_page("Patient Name: Ada Lovelace", 0, YEAR, &config).is_none());
        assert!(match_page("DOB: 12/10/1815", 0, YEAR, &config).is_none());
        assert!(match_page("Patient Name: Ada Lovelace\nDOB: 12/10/1915", 0, YEAR, &config).is_some());
    }

    #[test]
    fn test_text_layer_no_cross_page_combination() {
        let source = MockPageSource::new(
            "primary",
            vec![
                MockPage::text("Patient Name: Ada Lovelace"),
                MockPage::text("DOB: 12/10/1915"),
            ],
        );
        let strategy = TextLayerStrategy::new(vec![Box::new(source)]);
        assert_eq!(
            strategy.run(b"", YEAR, &ParsingConfig::default()),
            TextLayerOutcome::Incomplete
        );
    }

    #[test]
    fn test_text_layer_unloadable_page_falls_back() {
        let primary = MockPageSource::new(
            "primary",
            vec![MockPage::empty(), MockPage::unloadable()],
        );
        let alternate = MockPageSource::new(
            "alternate",
            vec![MockPage::text(&complete("Alan", "Turing", 1912, 6, 23))],
        );
        let strategy = TextLayerStrategy::new(vec![Box::new(primary), Box::new(alternate)]);
        let outcome = strategy.run(b"", YEAR, &ParsingConfig::default());
        assert_eq!(
            outcome,
            TextLayerOutcome::Complete(ExtractionResult {
                first_name: "Alan".into(),
                last_name: "Turing".into(),
                date_of_birth: NaiveDate::from_ymd_opt(1912, 6, 23).unwrap(),
            })
        );
    }

    #[test]
    fn test_text_layer_incomplete_does_not_consult_alternate() {
        let primary = MockPageSource::new("primary", vec![MockPage::text("nothing useful")]);
        let alternate = MockPageSource::new(
            "alternate",
            vec![MockPage::text(&complete("Alan", "Turing", 1912, 6, 23))],
        );
        let alternate_opens = alternate.opens();
        let strategy = TextLayerStrategy::new(vec![Box::new(primary), Box::new(alternate)]);
        assert_eq!(
            strategy.run(b"", YEAR, &ParsingConfig::default()),
            TextLayerOutcome::Incomplete
        );
        assert_eq!(alternate_opens.get(), 0);
    }

    #[test]
    fn test_text_layer_all_sources_fail() {
        let strategy = TextLayerStrategy::new(vec![
            Box::new(MockPageSource::failing_open("primary", "no header")),
            Box::new(MockPageSource::failing_open("alternate", "bad xref")),
        ]);
        match strategy.run(b"", YEAR, &ParsingConfig::default()) {
            TextLayerOutcome::Unreadable(reason) => assert!(reason.contains("bad xref")),
            other => panic!("expected Unreadable, got {:?}", other),
        }
    }

    #[test]
    fn test_page_texts_uses_first_working_source() {
        let strategy = TextLayerStrategy::new(vec![
            Box::new(MockPageSource::failing_open("primary", "no header")),
            Box::new(MockPageSource::new(
                "alternate",
                vec![MockPage::text("one"), MockPage::empty()],
            )),
        ]);
        assert_eq!(
            strategy.page_texts(b"").unwrap(),
            vec![Some("one".to_string()), None]
        );
        assert_eq!(strategy.source_names(), vec!["primary", "alternate"]);
    }

    #[test]
    fn test_ocr_early_stop() {
        let engine = MockOcrEngine::with_texts(&[
            "blurry scan",
            complete("Grace", "Hopper", 1906, 12, 9).as_str(),
            complete("Someone", "Else", 1950, 1, 1).as_str(),
        ]);
        let calls = engine.calls();
        let sessions = engine.sessions();
        let languages = engine.languages();
        let strategy = OcrStrategy::new(Box::new(MockRasterizer::new(3)), Box::new(engine))
            .with_language("eng");
        let result = strategy
            .run(b"", YEAR, &ParsingConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(result.first_name, "Grace");
        assert_eq!(result.date_of_birth, NaiveDate::from_ymd_opt(1906, 12, 9).unwrap());
        assert_eq!(calls.get(), 2);
        assert_eq!(sessions.get(), 1);
        assert_eq!(languages.lock().unwrap().as_slice(), ["eng"]);
    }

    #[test]
    fn test_ocr_model_loaded_once_per_document() {
        let engine = MockOcrEngine::with_texts(&["a", "b", "c", "d"]);
        let sessions = engine.sessions();
        let strategy = OcrStrategy::new(Box::new(MockRasterizer::new(4)), Box::new(engine));
        assert_eq!(strategy.page_texts(b"").unwrap().len(), 4);
        assert_eq!(strategy.run(b"", YEAR, &ParsingConfig::default()).unwrap(), None);
        assert_eq!(sessions.get(), 2);
    }

    #[test]
    fn test_ocr_session_failure_propagates() {
        let strategy = OcrStrategy::new(
            Box::new(MockRasterizer::new(1)),
            Box::new(MockOcrEngine::unavailable("missing eng.traineddata")),
        );
        assert!(matches!(
            strategy.run(b"", YEAR, &ParsingConfig::default()),
            Err(OcrError::Unavailable(_))
        ));
    }

    #[test]
    fn test_ocr_engine_error_propagates() {
        let engine = MockOcrEngine::new(vec![MockRecognition::Error("corrupt raster".into())]);
        let strategy = OcrStrategy::new(Box::new(MockRasterizer::new(1)), Box::new(engine));
        assert!(matches!(
            strategy.run(b"", YEAR, &ParsingConfig::default()),
            Err(OcrError::Recognize(_))
        ));
    }

    #[test]
    fn test_ocr_defaults() {
        let strategy = OcrStrategy::new(
            Box::new(MockRasterizer::new(0)),
            Box::new(MockOcrEngine::new(Vec::new())),
        );
        assert_eq!(strategy.dpi(), 300);
        assert_eq!(strategy.language(), "eng");
        assert_eq!(strategy.run(b"", YEAR, &ParsingConfig::default()).unwrap(), None);
    }

    #[test]
    fn test_ocr_page_texts() {
        let strategy = OcrStrategy::new(
            Box::new(MockRasterizer::new(2)),
            Box::new(MockOcrEngine::with_texts(&["first\r\npage", "second"])),
        )
        .with_dpi(150);
        assert_eq!(strategy.dpi(), 150);
        assert_eq!(
            strategy.page_texts(b"").unwrap(),
            vec!["first\npage".to_string(), "second".to_string()]
        );
    }
}
