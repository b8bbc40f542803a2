//! Rasterization and optical character recognition capabilities.
//!
//! Both are optional at build and run time; the orchestrator holds them as
//! an optional strategy and never assumes they succeed.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("OCR engine unavailable: {0}")]
    Unavailable(String),
    #[error("failed to rasterize document: {0}")]
    Rasterize(String),
    #[error("failed to recognize text: {0}")]
    Recognize(String),
}

/// An RGB raster of one page (3 bytes per pixel, row-major, no padding).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    pub page_index: usize,
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl PageImage {
    pub fn new(page_index: usize, width: u32, height: u32, rgb: Vec<u8>) -> Self {
        Self {
            page_index,
            width,
            height,
            rgb,
        }
    }

    /// True when the pixel buffer matches the declared dimensions.
    pub fn is_well_formed(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.rgb.len() == self.width as usize * self.height as usize * 3
    }
}

/// Renders every page of a document to an image.
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, bytes: &[u8], dpi: u32) -> Result<Vec<PageImage>, OcrError>;
}

/// Turns page images into text.
///
/// Loading a language model is expensive, so recognition happens through a
/// session that is opened once per document and reused for each page.
pub trait OcrEngine: Send + Sync {
    /// Load the given language model (e.g. "eng") for a run over one document.
    fn session(&self, language: &str) -> Result<Box<dyn OcrSession + '_>, OcrError>;
}

/// An initialized engine bound to one language model.
pub trait OcrSession {
    fn recognize(&mut self, image: &PageImage) -> Result<String, OcrError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_image() {
        assert!(PageImage::new(0, 2, 1, vec![0; 6]).is_well_formed());
        assert!(!PageImage::new(0, 2, 1, vec![0; 5]).is_well_formed());
        assert!(!PageImage::new(0, 0, 0, Vec::new()).is_well_formed());
    }
}
