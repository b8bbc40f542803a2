//! Tesseract-backed [`OcrEngine`].
//!
//! Tesseract is a system library. Construct the engine with
//! [`TesseractEngine::probe`] so that a missing installation or language
//! model is detected once, up front, instead of on the first scanned page.

use std::io::Cursor;

use image::{ImageFormat, RgbImage};
use leptess::LepTess;

use intake_core::{OcrEngine, OcrError, OcrSession, PageImage};

/// OCR engine that runs Tesseract through leptess.
#[derive(Debug, Clone, Default)]
pub struct TesseractEngine {
    /// Directory holding `*.traineddata`; `None` uses Tesseract's default
    /// lookup (including `TESSDATA_PREFIX`).
    datapath: Option<String>,
}

impl TesseractEngine {
    /// Verify Tesseract can initialize with `language` and return an engine.
    pub fn probe(datapath: Option<String>, language: &str) -> Result<Self, OcrError> {
        let engine = Self { datapath };
        engine.init(language)?;
        tracing::debug!(language, datapath = ?engine.datapath, "Tesseract initialized");
        Ok(engine)
    }

    fn init(&self, language: &str) -> Result<LepTess, OcrError> {
        LepTess::new(self.datapath.as_deref(), language).map_err(|e| {
            OcrError::Unavailable(format!(
                "failed to initialize Tesseract with language '{}': {}. \
                 Make sure Tesseract and its language data are installed",
                language, e
            ))
        })
    }
}

impl OcrEngine for TesseractEngine {
    fn session(&self, language: &str) -> Result<Box<dyn OcrSession + '_>, OcrError> {
        Ok(Box::new(TesseractSession {
            lt: self.init(language)?,
        }))
    }
}

/// One loaded Tesseract instance, reused for every page of a document.
struct TesseractSession {
    lt: LepTess,
}

impl OcrSession for TesseractSession {
    fn recognize(&mut self, image: &PageImage) -> Result<String, OcrError> {
        let png = encode_png(image)?;

        self.lt.set_image_from_mem(&png).map_err(|e| {
            OcrError::Recognize(format!(
                "page {}: failed to set image from memory: {}",
                image.page_index + 1,
                e
            ))
        })?;
        let text = self
            .lt
            .get_utf8_text()
            .map_err(|e| OcrError::Recognize(format!("page {}: {}", image.page_index + 1, e)))?;

        tracing::debug!(page = image.page_index + 1, chars = text.len(), "recognized page");
        Ok(text)
    }
}

/// Encode a page raster as PNG (leptess expects encoded image data).
fn encode_png(image: &PageImage) -> Result<Vec<u8>, OcrError> {
    if !image.is_well_formed() {
        return Err(OcrError::Recognize(format!(
            "page {}: raster of {} bytes does not match {}x{} RGB",
            image.page_index + 1,
            image.rgb.len(),
            image.width,
            image.height
        )));
    }
    let buffer = RgbImage::from_raw(image.width, image.height, image.rgb.clone()).ok_or_else(|| {
        OcrError::Recognize(format!("page {}: invalid raster", image.page_index + 1))
    })?;

    let mut png = Cursor::new(Vec::new());
    buffer
        .write_to(&mut png, ImageFormat::Png)
        .map_err(|e| OcrError::Recognize(format!("failed to encode image to PNG: {}", e)))?;
    Ok(png.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_png_signature() {
        let image = PageImage::new(0, 2, 1, vec![255, 255, 255, 0, 0, 0]);
        let png = encode_png(&image).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_malformed_raster_is_recognize_error() {
        let image = PageImage::new(2, 4, 4, vec![0; 5]);
        match encode_png(&image) {
            Err(OcrError::Recognize(msg)) => assert!(msg.starts_with("page 3")),
            other => panic!("expected Recognize error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_language_is_unavailable() {
        let err = TesseractEngine::probe(None, "no-such-language-model").unwrap_err();
        assert!(matches!(err, OcrError::Unavailable(_)));
    }

    #[test]
    fn test_session_with_missing_language_is_unavailable() {
        let engine = TesseractEngine::default();
        assert!(matches!(
            engine.session("no-such-language-model"),
            Err(OcrError::Unavailable(_))
        ));
    }
}
