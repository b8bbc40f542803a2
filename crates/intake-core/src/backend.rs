use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open PDF: {0}")]
    OpenError(String),
    #[error("failed to extract text: {0}")]
    ExtractionError(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// How a page's text should be pulled out of its text layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextMode {
    /// The library's default text extraction.
    Plain,
    /// Extraction that keeps the page's whitespace and reading order.
    Layout,
    /// The page's words, joined with single spaces.
    Words,
}

impl TextMode {
    /// All modes, in the order they should be attempted.
    pub const ALL: [TextMode; 3] = [TextMode::Plain, TextMode::Layout, TextMode::Words];
}

/// A page-iteration library that can open raw PDF bytes.
///
/// Implementors provide the low-level page access; the field search
/// (page text fallback, name/date parsing, early stop) lives in
/// `intake_parsing::FieldExtractor`.
pub trait PageSource: Send + Sync {
    /// Short name used in logs (e.g. "mupdf", "lopdf").
    fn name(&self) -> &str;

    /// Open a document from its raw bytes.
    fn open(&self, bytes: &[u8]) -> Result<Box<dyn PageDocument>, BackendError>;
}

/// An opened document. Dropping it releases the underlying handle.
pub trait PageDocument {
    fn page_count(&self) -> usize;

    /// Load the page at `index` (0-based). An error here means the document
    /// cannot be iterated by this library.
    fn load_page(&self, index: usize) -> Result<Box<dyn PageContent + '_>, BackendError>;
}

/// One loaded page.
pub trait PageContent {
    /// Whether this page can produce text in `mode`.
    fn supports(&self, mode: TextMode) -> bool {
        mode == TextMode::Plain
    }

    fn text(&self, mode: TextMode) -> Result<String, BackendError>;
}
