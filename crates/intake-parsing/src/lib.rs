use thiserror::Error;

pub mod config;
pub mod date;
pub mod extractor;
pub mod name;
pub mod page_text;
pub mod strategy;
pub mod text_processing;

pub use config::{ListOverride, ParsingConfig, ParsingConfigBuilder};
pub use date::{extract_date_of_birth, parse_date_candidate};
pub use extractor::FieldExtractor;
pub use name::extract_patient_name;
pub use page_text::extract_page_text;
pub use strategy::{OcrStrategy, TextLayerOutcome, TextLayerStrategy};
// Re-export domain types from core (canonical definitions live there)
pub use intake_core::{
    BackendError, ErrorClass, ExtractionResult, OcrEngine, OcrError, PageSource, PatientName,
    Rasterizer,
};

/// Why a document produced no result. Every variant stems from the input
/// document, so all of them are [`ErrorClass::BadRequest`].
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Error reading PDF file. Please ensure the file is not corrupted. ({0})")]
    UnreadableDocument(String),
    #[error("{0}")]
    IncompleteExtraction(String),
    #[error("Failed to extract information using OCR. The PDF may be corrupted or unreadable. ({0})")]
    OcrEngineFailure(String),
}

impl ExtractError {
    /// The standard "required fields not recognizable" failure.
    pub fn incomplete() -> Self {
        Self::IncompleteExtraction(
            "Could not extract patient name and date of birth from PDF. \
             Please ensure the PDF contains readable text with 'Patient Name' and 'Date of Birth' fields."
                .to_string(),
        )
    }

    pub fn error_class(&self) -> ErrorClass {
        match self {
            Self::UnreadableDocument(_)
            | Self::IncompleteExtraction(_)
            | Self::OcrEngineFailure(_) => ErrorClass::BadRequest,
        }
    }
}

/// Outcome of one extraction call.
pub type ExtractionOutcome = Result<ExtractionResult, ExtractError>;

/// Extract the patient name and date of birth from PDF bytes using the given
/// page sources (primary first), without OCR.
pub fn extract_fields(bytes: &[u8], sources: Vec<Box<dyn PageSource>>) -> ExtractionOutcome {
    FieldExtractor::new(sources).extract(bytes)
}
