//! Scripted page sources and OCR collaborators for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::backend::{BackendError, PageContent, PageDocument, PageSource, TextMode};
use crate::ocr::{OcrEngine, OcrError, OcrSession, PageImage, Rasterizer};

/// A shared call counter that stays readable after its owner has been moved
/// into an extractor.
#[derive(Debug, Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// One scripted page: text per mode, or a load failure.
#[derive(Debug, Clone, Default)]
pub struct MockPage {
    texts: HashMap<TextMode, String>,
    failing_modes: Vec<TextMode>,
    fail_load: bool,
}

impl MockPage {
    /// A page whose default extraction returns `text`.
    pub fn text(text: &str) -> Self {
        Self::default().with_mode(TextMode::Plain, text)
    }

    /// A page with no text in any mode.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A page that cannot be loaded at all.
    pub fn unloadable() -> Self {
        Self {
            fail_load: true,
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: TextMode, text: &str) -> Self {
        self.texts.insert(mode, text.to_string());
        self
    }

    /// Make extraction in `mode` return an error.
    pub fn failing_in(mut self, mode: TextMode) -> Self {
        self.failing_modes.push(mode);
        self
    }
}

/// A hand-rolled [`PageSource`] that serves scripted pages.
///
/// Supports a failing `open`, per-page load failures, and call counting via
/// [`opens()`](MockPageSource::opens), [`page_loads()`](MockPageSource::page_loads)
/// and [`text_calls()`](MockPageSource::text_calls).
pub struct MockPageSource {
    name: &'static str,
    pages: Arc<Vec<MockPage>>,
    open_error: Option<String>,
    opens: CallCounter,
    page_loads: CallCounter,
    text_calls: CallCounter,
}

impl MockPageSource {
    pub fn new(name: &'static str, pages: Vec<MockPage>) -> Self {
        Self {
            name,
            pages: Arc::new(pages),
            open_error: None,
            opens: CallCounter::default(),
            page_loads: CallCounter::default(),
            text_calls: CallCounter::default(),
        }
    }

    /// A source whose `open` always fails with `message`.
    pub fn failing_open(name: &'static str, message: &str) -> Self {
        Self {
            open_error: Some(message.to_string()),
            ..Self::new(name, Vec::new())
        }
    }

    pub fn opens(&self) -> CallCounter {
        self.opens.clone()
    }

    pub fn page_loads(&self) -> CallCounter {
        self.page_loads.clone()
    }

    pub fn text_calls(&self) -> CallCounter {
        self.text_calls.clone()
    }
}

impl PageSource for MockPageSource {
    fn name(&self) -> &str {
        self.name
    }

    fn open(&self, _bytes: &[u8]) -> Result<Box<dyn PageDocument>, BackendError> {
        self.opens.bump();
        if let Some(message) = &self.open_error {
            return Err(BackendError::OpenError(message.clone()));
        }
        Ok(Box::new(MockDocument {
            pages: Arc::clone(&self.pages),
            page_loads: self.page_loads.clone(),
            text_calls: self.text_calls.clone(),
        }))
    }
}

struct MockDocument {
    pages: Arc<Vec<MockPage>>,
    page_loads: CallCounter,
    text_calls: CallCounter,
}

impl PageDocument for MockDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn load_page(&self, index: usize) -> Result<Box<dyn PageContent + '_>, BackendError> {
        self.page_loads.bump();
        let page = self
            .pages
            .get(index)
            .ok_or_else(|| BackendError::ExtractionError(format!("no page {}", index)))?;
        if page.fail_load {
            return Err(BackendError::ExtractionError(format!(
                "page {} is corrupt",
                index
            )));
        }
        Ok(Box::new(MockLoadedPage {
            page,
            text_calls: &self.text_calls,
        }))
    }
}

struct MockLoadedPage<'a> {
    page: &'a MockPage,
    text_calls: &'a CallCounter,
}

impl PageContent for MockLoadedPage<'_> {
    fn supports(&self, _mode: TextMode) -> bool {
        true
    }

    fn text(&self, mode: TextMode) -> Result<String, BackendError> {
        self.text_calls.bump();
        if self.page.failing_modes.contains(&mode) {
            return Err(BackendError::ExtractionError(format!("{:?} failed", mode)));
        }
        Ok(self.page.texts.get(&mode).cloned().unwrap_or_default())
    }
}

/// A [`Rasterizer`] that produces one blank image per scripted page.
pub struct MockRasterizer {
    page_count: usize,
    error: Option<String>,
    calls: CallCounter,
}

impl MockRasterizer {
    pub fn new(page_count: usize) -> Self {
        Self {
            page_count,
            error: None,
            calls: CallCounter::default(),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            error: Some(message.to_string()),
            ..Self::new(0)
        }
    }

    pub fn calls(&self) -> CallCounter {
        self.calls.clone()
    }
}

impl Rasterizer for MockRasterizer {
    fn rasterize(&self, _bytes: &[u8], _dpi: u32) -> Result<Vec<PageImage>, OcrError> {
        self.calls.bump();
        if let Some(message) = &self.error {
            return Err(OcrError::Rasterize(message.clone()));
        }
        Ok((0..self.page_count)
            .map(|i| PageImage::new(i, 1, 1, vec![255, 255, 255]))
            .collect())
    }
}

/// Scripted result of recognizing one page.
#[derive(Debug, Clone)]
pub enum MockRecognition {
    Text(String),
    Error(String),
}

/// An [`OcrEngine`] that answers from a per-page script.
///
/// Pages beyond the script recognize as empty text.
pub struct MockOcrEngine {
    script: Vec<MockRecognition>,
    session_error: Option<String>,
    calls: CallCounter,
    sessions: CallCounter,
    languages: Arc<Mutex<Vec<String>>>,
}

impl MockOcrEngine {
    pub fn new(script: Vec<MockRecognition>) -> Self {
        Self {
            script,
            session_error: None,
            calls: CallCounter::default(),
            sessions: CallCounter::default(),
            languages: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Convenience: every page recognizes as the given text.
    pub fn with_texts(texts: &[&str]) -> Self {
        Self::new(
            texts
                .iter()
                .map(|t| MockRecognition::Text(t.to_string()))
                .collect(),
        )
    }

    /// An engine whose language model never loads.
    pub fn unavailable(message: &str) -> Self {
        Self {
            session_error: Some(message.to_string()),
            ..Self::new(Vec::new())
        }
    }

    /// Pages recognized so far.
    pub fn calls(&self) -> CallCounter {
        self.calls.clone()
    }

    /// Sessions opened so far.
    pub fn sessions(&self) -> CallCounter {
        self.sessions.clone()
    }

    /// Languages loaded so far, one entry per session.
    pub fn languages(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.languages)
    }
}

impl OcrEngine for MockOcrEngine {
    fn session(&self, language: &str) -> Result<Box<dyn OcrSession + '_>, OcrError> {
        self.sessions.bump();
        if let Some(message) = &self.session_error {
            return Err(OcrError::Unavailable(message.clone()));
        }
        if let Ok(mut seen) = self.languages.lock() {
            seen.push(language.to_string());
        }
        Ok(Box::new(MockOcrSession { engine: self }))
    }
}

struct MockOcrSession<'a> {
    engine: &'a MockOcrEngine,
}

impl OcrSession for MockOcrSession<'_> {
    fn recognize(&mut self, image: &PageImage) -> Result<String, OcrError> {
        self.engine.calls.bump();
        match self.engine.script.get(image.page_index) {
            Some(MockRecognition::Text(text)) => Ok(text.clone()),
            Some(MockRecognition::Error(message)) => Err(OcrError::Recognize(message.clone())),
            None => Ok(String::new()),
        }
    }
}
