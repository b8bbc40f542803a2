use intake_core::{ExtractionResult, OcrError, PageSource};

use crate::config::ParsingConfig;
use crate::strategy::{match_page, OcrStrategy, TextLayerOutcome, TextLayerStrategy};
use crate::{date, ExtractError};

/// The extraction orchestrator.
///
/// Runs the text-layer strategy first and, when it comes up short, the OCR
/// strategy if one was supplied. A missing OCR strategy is not an error: the
/// extractor simply has one chance fewer.
pub struct FieldExtractor {
    config: ParsingConfig,
    text_layer: TextLayerStrategy,
    ocr: Option<OcrStrategy>,
}

impl FieldExtractor {
    /// Create an extractor over the given page sources (primary first), with
    /// default configuration and no OCR.
    pub fn new(sources: Vec<Box<dyn PageSource>>) -> Self {
        Self {
            config: ParsingConfig::default(),
            text_layer: TextLayerStrategy::new(sources),
            ocr: None,
        }
    }

    pub fn with_config(mut self, config: ParsingConfig) -> Self {
        self.config = config;
        self
    }

    /// Enable the OCR fallback.
    pub fn with_ocr(mut self, ocr: OcrStrategy) -> Self {
        self.ocr = Some(ocr);
        self
    }

    pub fn ocr_available(&self) -> bool {
        self.ocr.is_some()
    }

    /// Extract the patient name and date of birth from raw PDF bytes.
    pub fn extract(&self, bytes: &[u8]) -> Result<ExtractionResult, ExtractError> {
        self.extract_in_year(bytes, date::current_year())
    }

    /// [`extract`](Self::extract) with an explicit current year for the
    /// birth-date plausibility check.
    pub fn extract_in_year(
        &self,
        bytes: &[u8],
        current_year: i32,
    ) -> Result<ExtractionResult, ExtractError> {
        tracing::info!("attempting text-based PDF extraction page by page");
        let unreadable = match self.text_layer.run(bytes, current_year, &self.config) {
            TextLayerOutcome::Complete(result) => {
                tracing::info!(
                    first_name = %result.first_name,
                    last_name = %result.last_name,
                    date_of_birth = %result.date_of_birth,
                    "extracted fields from text layer"
                );
                return Ok(result);
            }
            TextLayerOutcome::Incomplete => None,
            TextLayerOutcome::Unreadable(reason) => Some(reason),
        };

        let Some(ocr) = &self.ocr else {
            tracing::warn!("OCR not available, cannot process image-based PDFs");
            return Err(match unreadable {
                Some(reason) => ExtractError::UnreadableDocument(reason),
                None => ExtractError::incomplete(),
            });
        };

        tracing::info!("text extraction did not find all fields, attempting OCR page by page");
        match ocr.run(bytes, current_year, &self.config) {
            Ok(Some(result)) => {
                tracing::info!(
                    first_name = %result.first_name,
                    last_name = %result.last_name,
                    date_of_birth = %result.date_of_birth,
                    "extracted fields via OCR"
                );
                Ok(result)
            }
            Ok(None) => Err(ExtractError::incomplete()),
            Err(OcrError::Rasterize(e)) if unreadable.is_some() => {
                tracing::error!(error = %e, "document could not be opened for text or rasterization");
                Err(ExtractError::UnreadableDocument(format!(
                    "{}; rasterizer: {}",
                    unreadable.unwrap_or_default(),
                    e
                )))
            }
            Err(e) => {
                tracing::error!(error = %e, "OCR extraction failed");
                Err(ExtractError::OcrEngineFailure(e.to_string()))
            }
        }
    }

    /// Run the parsers on text that has already been extracted.
    pub fn extract_from_text(&self, text: &str) -> Option<ExtractionResult> {
        match_page(text, 0, date::current_year(), &self.config)
    }

    /// Text of every page through the text-layer sources.
    pub fn page_texts(&self, bytes: &[u8]) -> Result<Vec<Option<String>>, ExtractError> {
        self.text_layer
            .page_texts(bytes)
            .map_err(|e| ExtractError::UnreadableDocument(e.to_string()))
    }

    /// Recognized text of every page, when OCR is available.
    pub fn ocr_page_texts(&self, bytes: &[u8]) -> Option<Result<Vec<String>, ExtractError>> {
        self.ocr.as_ref().map(|ocr| {
            ocr.page_texts(bytes)
                .map_err(|e| ExtractError::OcrEngineFailure(e.to_string()))
        })
    }
}
