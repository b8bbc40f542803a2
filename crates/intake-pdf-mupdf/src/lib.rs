use mupdf::{Colorspace, Document, Matrix, Page, TextPage, TextPageFlags};

use intake_core::{
    BackendError, OcrError, PageContent, PageDocument, PageImage, PageSource, Rasterizer,
    TextMode,
};

const PDF_MAGIC: &str = "application/pdf";

/// MuPDF-based implementation of [`PageSource`], the primary text-layer library.
///
/// This crate is the sole AGPL island. It isolates the mupdf dependency
/// (which is AGPL-3.0) so that builds without the `pdf` feature do not
/// transitively depend on it.
#[derive(Debug, Default, Clone, Copy)]
pub struct MupdfPageSource;

impl MupdfPageSource {
    pub fn new() -> Self {
        Self
    }
}

impl PageSource for MupdfPageSource {
    fn name(&self) -> &str {
        "mupdf"
    }

    fn open(&self, bytes: &[u8]) -> Result<Box<dyn PageDocument>, BackendError> {
        let document = open_document(bytes).map_err(BackendError::OpenError)?;
        let page_count = document
            .page_count()
            .map_err(|e| BackendError::OpenError(e.to_string()))?;
        Ok(Box::new(MupdfDocument {
            document,
            page_count: usize::try_from(page_count).unwrap_or(0),
        }))
    }
}

fn open_document(bytes: &[u8]) -> Result<Document, String> {
    Document::from_bytes(bytes, PDF_MAGIC).map_err(|e| e.to_string())
}

struct MupdfDocument {
    document: Document,
    page_count: usize,
}

impl PageDocument for MupdfDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn load_page(&self, index: usize) -> Result<Box<dyn PageContent + '_>, BackendError> {
        let page_no = i32::try_from(index)
            .map_err(|_| BackendError::ExtractionError(format!("page index {} out of range", index)))?;
        let page = self
            .document
            .load_page(page_no)
            .map_err(|e| BackendError::ExtractionError(e.to_string()))?;
        Ok(Box::new(MupdfPage { page }))
    }
}

struct MupdfPage {
    page: Page,
}

impl MupdfPage {
    fn text_page(&self, flags: TextPageFlags) -> Result<TextPage, BackendError> {
        self.page
            .to_text_page(flags)
            .map_err(|e| BackendError::ExtractionError(e.to_string()))
    }
}

impl PageContent for MupdfPage {
    fn supports(&self, _mode: TextMode) -> bool {
        true
    }

    fn text(&self, mode: TextMode) -> Result<String, BackendError> {
        match mode {
            TextMode::Plain => {
                let rows = rows(fragments(&self.text_page(TextPageFlags::empty())?));
                Ok(plain_text(&rows))
            }
            TextMode::Layout => {
                let rows = rows(fragments(
                    &self.text_page(TextPageFlags::PRESERVE_WHITESPACE)?,
                ));
                Ok(layout_text(&rows))
            }
            TextMode::Words => {
                let rows = rows(fragments(&self.text_page(TextPageFlags::empty())?));
                Ok(words(&rows).join("\n"))
            }
        }
    }
}

/// Lines whose bottoms differ by at most this many points share a row.
const ROW_TOLERANCE: f32 = 3.0;

/// Horizontal points per character cell in layout mode.
const LAYOUT_CHAR_WIDTH: f32 = 7.25;

/// One MuPDF text line with its position on the page.
#[derive(Debug, Clone, PartialEq)]
struct Fragment {
    x0: f32,
    y1: f32,
    text: String,
}

fn fragments(text_page: &TextPage) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    for block in text_page.blocks() {
        for line in block.lines() {
            let text: String = line
                .chars()
                .map(|c| c.char().unwrap_or('\u{FFFD}'))
                .collect();
            if text.trim().is_empty() {
                continue;
            }
            let bounds = line.bounds();
            fragments.push(Fragment {
                x0: bounds.x0,
                y1: bounds.y1,
                text,
            });
        }
    }
    fragments
}

/// Group fragments sitting on the same baseline into rows, top to bottom,
/// each row ordered left to right.
///
/// MuPDF emits a separate line (often a separate block) for every text
/// object, so side-by-side form cells arrive as unrelated lines.
fn rows(mut fragments: Vec<Fragment>) -> Vec<Vec<Fragment>> {
    fragments.sort_by(|a, b| a.y1.total_cmp(&b.y1).then(a.x0.total_cmp(&b.x0)));

    let mut rows: Vec<(f32, Vec<Fragment>)> = Vec::new();
    for fragment in fragments {
        match rows.last_mut() {
            Some((anchor, row)) if (fragment.y1 - *anchor).abs() <= ROW_TOLERANCE => {
                row.push(fragment)
            }
            _ => rows.push((fragment.y1, vec![fragment])),
        }
    }

    rows.into_iter()
        .map(|(_, mut row)| {
            row.sort_by(|a, b| a.x0.total_cmp(&b.x0));
            row
        })
        .collect()
}

fn plain_text(rows: &[Vec<Fragment>]) -> String {
    let mut page_text = String::new();
    for row in rows {
        let cells: Vec<&str> = row.iter().map(|f| f.text.trim()).collect();
        page_text.push_str(&cells.join(" "));
        page_text.push('\n');
    }
    page_text
}

/// Like [`plain_text`], but each fragment starts at the character column
/// matching its horizontal position.
fn layout_text(rows: &[Vec<Fragment>]) -> String {
    let mut page_text = String::new();
    for row in rows {
        let mut line = String::new();
        for fragment in row {
            let column = (fragment.x0.max(0.0) / LAYOUT_CHAR_WIDTH).round() as usize;
            let width = line.chars().count();
            if column > width {
                line.extend(std::iter::repeat_n(' ', column - width));
            } else if width > 0 {
                line.push(' ');
            }
            line.push_str(fragment.text.trim_end());
        }
        page_text.push_str(&line);
        page_text.push('\n');
    }
    page_text
}

fn words(rows: &[Vec<Fragment>]) -> Vec<String> {
    rows.iter()
        .flatten()
        .flat_map(|f| f.text.split_whitespace().map(str::to_string))
        .collect()
}

/// Renders every page of a document to an RGB raster with MuPDF.
#[derive(Debug, Default, Clone, Copy)]
pub struct MupdfRasterizer;

impl MupdfRasterizer {
    pub fn new() -> Self {
        Self
    }
}

impl Rasterizer for MupdfRasterizer {
    fn rasterize(&self, bytes: &[u8], dpi: u32) -> Result<Vec<PageImage>, OcrError> {
        let document = open_document(bytes).map_err(OcrError::Rasterize)?;
        let scale = dpi as f32 / 72.0;
        let matrix = Matrix::new_scale(scale, scale);
        let colorspace = Colorspace::device_rgb();

        let mut images = Vec::new();
        for (index, page) in document
            .pages()
            .map_err(|e| OcrError::Rasterize(e.to_string()))?
            .enumerate()
        {
            let page = page.map_err(|e| OcrError::Rasterize(e.to_string()))?;
            let pixmap = page
                .to_pixmap(&matrix, &colorspace, false, true)
                .map_err(|e| OcrError::Rasterize(format!("page {}: {}", index + 1, e)))?;

            let (width, height) = (pixmap.width(), pixmap.height());
            let rgb = pack_rgb(pixmap.samples(), width, height, usize::from(pixmap.n()))
                .ok_or_else(|| {
                    OcrError::Rasterize(format!("page {}: unexpected pixmap layout", index + 1))
                })?;
            tracing::debug!(page = index + 1, width, height, dpi, "rasterized page");
            images.push(PageImage::new(index, width, height, rgb));
        }
        Ok(images)
    }
}

/// Copy the first three components of every pixel into a tightly packed
/// RGB buffer, dropping row padding and any alpha channel.
fn pack_rgb(samples: &[u8], width: u32, height: u32, components: usize) -> Option<Vec<u8>> {
    let (width, height) = (width as usize, height as usize);
    if components < 3 || height == 0 {
        return None;
    }
    let stride = samples.len() / height;
    if stride < width * components {
        return None;
    }

    let mut rgb = Vec::with_capacity(width * height * 3);
    for row in samples.chunks_exact(stride).take(height) {
        for pixel in row[..width * components].chunks_exact(components) {
            rgb.extend_from_slice(&pixel[..3]);
        }
    }
    Some(rgb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_rgb_drops_alpha_and_padding() {
        // 2x2, RGBA, one byte of row padding
        let samples = [
            1, 2, 3, 255, 4, 5, 6, 255, 0, //
            7, 8, 9, 255, 10, 11, 12, 255, 0,
        ];
        assert_eq!(
            pack_rgb(&samples, 2, 2, 4),
            Some(vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12])
        );
    }

    fn fragment(x0: f32, y1: f32, text: &str) -> Fragment {
        Fragment {
            x0,
            y1,
            text: text.to_string(),
        }
    }

    fn two_column_form() -> Vec<Fragment> {
        // Right-hand cells arrive first, as separate MuPDF blocks do.
        vec![
            fragment(330.0, 84.0, "Patient Date of Birth"),
            fragment(330.0, 104.0, "03/07/1982"),
            fragment(72.0, 84.0, "Patient Name and Address"),
            fragment(72.0, 103.2, "Martin Van Buren"),
            fragment(72.0, 124.0, "1600 Kinderhook Rd"),
        ]
    }

    #[test]
    fn test_plain_text_joins_cells_on_one_baseline() {
        assert_eq!(
            plain_text(&rows(two_column_form())),
            "Patient Name and Address Patient Date of Birth\n\
             Martin Van Buren 03/07/1982\n\
             1600 Kinderhook Rd\n"
        );
    }

    #[test]
    fn test_rows_split_beyond_tolerance() {
        let rows = rows(vec![fragment(72.0, 100.0, "upper"), fragment(72.0, 104.0, "lower")]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0].text, "upper");
    }

    #[test]
    fn test_layout_text_keeps_columns() {
        let text = layout_text(&rows(two_column_form()));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].trim_start().starts_with("Patient Name and Address"));
        assert_eq!(lines[0].find("Patient Date"), lines[1].find("03/07/1982"));
        assert!(lines[0].contains("Address ") && lines[0].ends_with("Date of Birth"));
    }

    #[test]
    fn test_words_follow_row_order() {
        assert_eq!(
            words(&rows(two_column_form()))[..6],
            ["Patient", "Name", "and", "Address", "Patient", "Date"]
        );
    }

    #[test]
    fn test_pack_rgb_rejects_gray() {
        assert_eq!(pack_rgb(&[0, 0, 0, 0], 2, 2, 1), None);
    }

    #[test]
    fn test_open_rejects_garbage() {
        assert!(matches!(
            MupdfPageSource::new().open(b"this is not a pdf"),
            Err(BackendError::OpenError(_))
        ));
    }

    #[test]
    fn test_rasterize_rejects_garbage() {
        assert!(matches!(
            MupdfRasterizer::new().rasterize(b"this is not a pdf", 72),
            Err(OcrError::Rasterize(_))
        ));
    }
}
