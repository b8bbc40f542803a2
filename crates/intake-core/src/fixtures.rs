//! In-test PDF documents built with lopdf.
//!
//! Every string is drawn in its own text object with the Courier base font,
//! so page sources see separate fragments exactly as they would in a form
//! generated by a reporting tool.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

/// Left margin of the first column, in points.
pub const LEFT: i64 = 72;
/// Baseline of the first row, in points from the bottom of the page.
pub const TOP: i64 = 720;
/// Distance between rows, in points.
pub const ROW_HEIGHT: i64 = 20;

/// A string drawn at `(x, y)` on a US Letter page.
#[derive(Debug, Clone, Copy)]
pub struct Placed<'a> {
    pub x: i64,
    pub y: i64,
    pub text: &'a str,
}

/// A PDF with one page per entry; each line is its own row at the left margin.
pub fn pdf_with_pages(pages: &[&[&str]]) -> Vec<u8> {
    let placed: Vec<Vec<Placed>> = pages
        .iter()
        .map(|lines| {
            lines
                .iter()
                .enumerate()
                .map(|(row, text)| Placed {
                    x: LEFT,
                    y: TOP - ROW_HEIGHT * row as i64,
                    text: *text,
                })
                .collect()
        })
        .collect();
    pdf_with_placed_text(&placed)
}

/// A one-page PDF laid out in rows of side-by-side cells.
///
/// Cell `i` of every row starts at `column_x[i]`.
pub fn pdf_with_columns(column_x: &[i64], rows: &[&[&str]]) -> Vec<u8> {
    let page: Vec<Placed> = rows
        .iter()
        .enumerate()
        .flat_map(|(row, cells)| {
            cells.iter().zip(column_x).map(move |(text, &x)| Placed {
                x,
                y: TOP - ROW_HEIGHT * row as i64,
                text: *text,
            })
        })
        .collect();
    pdf_with_placed_text(&[page])
}

/// A PDF with one page per entry and no text at all, like a scan without a
/// text layer.
pub fn blank_pdf(pages: usize) -> Vec<u8> {
    let empty: Vec<Vec<Placed>> = vec![Vec::new(); pages];
    pdf_with_placed_text(&empty)
}

/// A PDF with one page per entry, drawing every string where it is placed.
///
/// # Panics
///
/// Panics if lopdf cannot serialize the document.
pub fn pdf_with_placed_text(pages: &[Vec<Placed>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });

    let mut kids: Vec<Object> = Vec::new();
    for runs in pages {
        let mut operations = Vec::new();
        for run in runs {
            operations.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![run.x.into(), run.y.into()]),
                Operation::new("Tj", vec![Object::string_literal(run.text)]),
                Operation::new("ET", vec![]),
            ]);
        }
        let content = Content { operations };
        let encoded = content.encode().expect("content stream encodes");
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("document serializes to memory");
    bytes
}
