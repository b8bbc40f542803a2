use std::path::Path;

use thiserror::Error;

use intake_core::config_file::ConfigFile;
use intake_core::PageSource;
use intake_parsing::strategy::{DEFAULT_OCR_DPI, DEFAULT_OCR_LANGUAGE};
use intake_parsing::{OcrStrategy, ParsingConfig, ParsingConfigBuilder};

// Re-export domain types for convenience
pub use intake_core::{ErrorClass, ExtractionResult};
pub use intake_parsing::{ExtractError, FieldExtractor};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Invalid file type. Please upload a PDF file. (got {0})")]
    NotPdf(String),
    #[error("Error reading PDF file: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl IngestError {
    /// Input-caused failures are bad requests; a broken configuration is ours.
    pub fn error_class(&self) -> ErrorClass {
        match self {
            Self::NotPdf(_) | Self::Io(_) => ErrorClass::BadRequest,
            Self::Extract(e) => e.error_class(),
            Self::InvalidConfig(_) => ErrorClass::Internal,
        }
    }
}

/// Everything needed to assemble a [`FieldExtractor`].
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Use the OCR fallback when it is compiled in and Tesseract initializes.
    pub ocr_enabled: bool,
    pub ocr_dpi: u32,
    pub ocr_language: String,
    /// Tesseract data directory; `None` uses Tesseract's own lookup.
    pub tessdata_path: Option<String>,
    pub parsing: ParsingConfig,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            ocr_enabled: true,
            ocr_dpi: DEFAULT_OCR_DPI,
            ocr_language: DEFAULT_OCR_LANGUAGE.to_string(),
            tessdata_path: None,
            parsing: ParsingConfig::default(),
        }
    }
}

impl IngestOptions {
    /// Options from a loaded config file, falling back to defaults for
    /// anything it leaves unset. `date_formats` replaces the built-in list;
    /// `name_labels` extends it.
    pub fn from_config_file(config: &ConfigFile) -> Result<Self, IngestError> {
        let defaults = Self::default();
        let ocr = config.ocr.clone().unwrap_or_default();
        let parsing = config.parsing.clone().unwrap_or_default();

        let mut builder = ParsingConfigBuilder::new();
        if let Some(year) = parsing.earliest_birth_year {
            builder = builder.earliest_birth_year(year);
        }
        if let Some(formats) = parsing.date_formats {
            builder = builder.set_date_formats(formats);
        }
        for label in parsing.name_labels.unwrap_or_default() {
            builder = builder.add_name_label(label);
        }
        let parsing = builder
            .build()
            .map_err(|e| IngestError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            ocr_enabled: ocr.enabled.unwrap_or(defaults.ocr_enabled),
            ocr_dpi: ocr.dpi.unwrap_or(defaults.ocr_dpi),
            ocr_language: ocr.language.unwrap_or(defaults.ocr_language),
            tessdata_path: ocr.tessdata_path,
            parsing,
        })
    }
}

/// Whether the OCR fallback was compiled in.
pub fn ocr_compiled() -> bool {
    cfg!(feature = "ocr")
}

/// The page sources in priority order: MuPDF (with the `pdf` feature), then lopdf.
pub fn default_sources() -> Vec<Box<dyn PageSource>> {
    let mut sources: Vec<Box<dyn PageSource>> = Vec::new();
    #[cfg(feature = "pdf")]
    sources.push(Box::new(intake_pdf_mupdf::MupdfPageSource::new()));
    sources.push(Box::new(intake_pdf_lopdf::LopdfPageSource::new()));
    sources
}

/// Assemble an extractor from `options`.
///
/// OCR is attached only when compiled in, enabled, and Tesseract initializes
/// with the requested language. Otherwise a warning is logged and the
/// extractor runs text-layer only.
pub fn build_extractor(options: &IngestOptions) -> FieldExtractor {
    let extractor = FieldExtractor::new(default_sources()).with_config(options.parsing.clone());
    match ocr_strategy(options) {
        Some(ocr) => extractor.with_ocr(ocr),
        None => extractor,
    }
}

#[cfg(feature = "ocr")]
fn ocr_strategy(options: &IngestOptions) -> Option<OcrStrategy> {
    if !options.ocr_enabled {
        tracing::info!("OCR disabled by configuration");
        return None;
    }
    match intake_ocr::TesseractEngine::probe(options.tessdata_path.clone(), &options.ocr_language) {
        Ok(engine) => Some(
            OcrStrategy::new(
                Box::new(intake_pdf_mupdf::MupdfRasterizer::new()),
                Box::new(engine),
            )
            .with_dpi(options.ocr_dpi)
            .with_language(options.ocr_language.clone()),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "OCR not available, image-based PDFs cannot be processed");
            None
        }
    }
}

#[cfg(not(feature = "ocr"))]
fn ocr_strategy(options: &IngestOptions) -> Option<OcrStrategy> {
    if options.ocr_enabled {
        tracing::warn!(
            "OCR support not compiled in (enable the `ocr` feature of intake-ingest), \
             image-based PDFs cannot be processed"
        );
    }
    None
}

/// Read a PDF from disk, rejecting files without a `.pdf` extension.
pub fn read_pdf(path: &Path) -> Result<Vec<u8>, IngestError> {
    let is_pdf = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    if !is_pdf {
        return Err(IngestError::NotPdf(path.display().to_string()));
    }
    Ok(std::fs::read(path)?)
}

/// Extract the patient name and date of birth from PDF bytes with the
/// default assembly.
pub fn extract_fields(bytes: &[u8]) -> Result<ExtractionResult, IngestError> {
    Ok(build_extractor(&IngestOptions::default()).extract(bytes)?)
}

/// Validate, read and extract a PDF file with the default assembly.
pub fn extract_fields_from_path(path: &Path) -> Result<ExtractionResult, IngestError> {
    extract_path_with(&build_extractor(&IngestOptions::default()), path)
}

/// Validate, read and extract a PDF file with an already assembled extractor.
pub fn extract_path_with(
    extractor: &FieldExtractor,
    path: &Path,
) -> Result<ExtractionResult, IngestError> {
    let bytes = read_pdf(path)?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "processing PDF");
    Ok(extractor.extract(&bytes)?)
}
