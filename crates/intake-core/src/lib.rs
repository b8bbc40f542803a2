use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub mod backend;
pub mod config_file;
#[cfg(feature = "test-support")]
pub mod fixtures;
#[cfg(any(test, feature = "test-support"))]
pub mod mock;
pub mod ocr;

// Re-export for convenience
pub use backend::{BackendError, PageContent, PageDocument, PageSource, TextMode};
pub use ocr::{OcrEngine, OcrError, OcrSession, PageImage, Rasterizer};

/// A patient name split into first name and the remaining name tokens.
///
/// Every token is a capitalized alphabetic word. `last` may hold several
/// space-joined tokens ("Van Buren").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientName {
    pub first: String,
    pub last: String,
}

impl PatientName {
    pub fn new(first: impl Into<String>, last: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            last: last.into(),
        }
    }
}

/// The fields extracted from one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
}

impl ExtractionResult {
    pub fn new(name: PatientName, date_of_birth: NaiveDate) -> Self {
        Self {
            first_name: name.first,
            last_name: name.last,
            date_of_birth,
        }
    }
}

/// Which class of caller-visible error a failure belongs to.
///
/// Every failure that stems from the submitted document is [`ErrorClass::BadRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    BadRequest,
    Internal,
}

impl ErrorClass {
    /// HTTP status code a web boundary should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::Internal => 500,
        }
    }
}
