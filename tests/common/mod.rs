//! In-memory PDF builder for integration tests.
//!
//! Text is drawn with a Helvetica resource that has no `/Widths`, so every
//! glyph advances 500/1000 em: at the default 10pt size each character is
//! 5 units wide and its box spans from 2 units below the baseline to 8 above.

#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Object, Stream};

pub const FONT_SIZE: f32 = 10.0;
pub const CHAR_WIDTH: f32 = 5.0;
pub const PAGE_HEIGHT: f32 = 792.0;

/// One line of text drawn at a user-space baseline.
#[derive(Debug, Clone)]
pub struct Line {
    pub x: f32,
    pub y: f32,
    pub text: String,
}

/// An annotation with a user-space `/Rect`.
#[derive(Debug, Clone)]
pub struct Mark {
    pub subtype: String,
    pub rect: [f32; 4],
    pub author: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TestPage {
    pub lines: Vec<Line>,
    pub marks: Vec<Mark>,
}

impl TestPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, x: f32, y: f32, text: &str) -> Self {
        self.lines.push(Line {
            x,
            y,
            text: text.to_string(),
        });
        self
    }

    pub fn mark(mut self, subtype: &str, rect: [f32; 4]) -> Self {
        self.marks.push(Mark {
            subtype: subtype.to_string(),
            rect,
            author: None,
        });
        self
    }

    /// A markup annotation hugging the first `len` characters drawn at (x, y).
    pub fn mark_over(self, subtype: &str, x: f32, y: f32, len: usize) -> Self {
        self.mark(subtype, rect_over(x, y, len))
    }

    pub fn highlight_over(self, x: f32, y: f32, len: usize) -> Self {
        self.mark_over("Highlight", x, y, len)
    }

    pub fn underline_over(self, x: f32, y: f32, len: usize) -> Self {
        self.mark_over("Underline", x, y, len)
    }

    /// Set the author of the last annotation.
    pub fn by(mut self, author: &str) -> Self {
        if let Some(mark) = self.marks.last_mut() {
            mark.author = Some(author.to_string());
        }
        self
    }
}

/// User-space rect covering `len` characters drawn at baseline (x, y).
pub fn rect_over(x: f32, y: f32, len: usize) -> [f32; 4] {
    [x, y - 2.0, x + CHAR_WIDTH * len as f32, y + 8.0]
}

/// Top edge of [`rect_over`] in top-left page space.
pub fn page_top(y: f32) -> f32 {
    PAGE_HEIGHT - (y + 8.0)
}

fn real(v: f32) -> Object {
    Object::Real(v)
}

fn content_stream(lines: &[Line]) -> Vec<u8> {
    let mut operations = Vec::new();
    for line in lines {
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![Object::Name(b"F1".to_vec()), real(FONT_SIZE)],
        ));
        operations.push(Operation::new("Td", vec![real(line.x), real(line.y)]));
        operations.push(Operation::new(
            "Tj",
            vec![Object::string_literal(line.text.as_str())],
        ));
        operations.push(Operation::new("ET", vec![]));
    }
    Content { operations }.encode().unwrap()
}

/// Build a PDF with one page per entry.
pub fn build_pdf(pages: &[TestPage]) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids = Vec::new();
    for page in pages {
        let content_id = doc.add_object(Stream::new(dictionary! {}, content_stream(&page.lines)));

        let annots: Vec<Object> = page
            .marks
            .iter()
            .map(|mark| {
                let mut annot = dictionary! {
                    "Type" => "Annot",
                    "Subtype" => Object::Name(mark.subtype.as_bytes().to_vec()),
                    "Rect" => mark.rect.iter().map(|v| real(*v)).collect::<Vec<_>>(),
                };
                if let Some(author) = &mark.author {
                    annot.set("T", Object::string_literal(author.as_str()));
                }
                Object::Reference(doc.add_object(annot))
            })
            .collect();

        let mut page_dict = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        };
        if !annots.is_empty() {
            page_dict.set("Annots", annots);
        }
        kids.push(Object::Reference(doc.add_object(page_dict)));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}
