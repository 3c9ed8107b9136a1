//! Content stream interpretation.
//!
//! Walks the text operators of a page and produces one [`Glyph`] per shown
//! character code, positioned in top-left page space. Only the state that
//! affects where text lands is tracked: the CTM (`q`/`Q`/`cm`) and the text
//! state (`Tf`, `Tc`, `Tw`, `Tz`, `TL`, `Ts`, the text and line matrices).
//! Form XObjects drawn with `Do` are interpreted in place when a backend is
//! attached with [`ContentInterpreter::with_forms`].

use crate::model::{PageBox, Rect};

use super::backend::{
    get_number_from_value, ContentOp, FormXObject, PdfBackend, PdfValue, ResourceScope,
};
use super::font::{FontMetrics, PageFont, PageFonts};

/// Glyph extent below the baseline, as a fraction of the font size.
const DESCENT: f32 = 0.2;
/// Glyph extent above the baseline, as a fraction of the font size.
const ASCENT: f32 = 0.8;
/// Nesting limit for Form XObjects drawing other forms (or themselves).
pub const MAX_FORM_DEPTH: usize = 10;

/// One shown character with its position on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    /// Decoded text (usually one char, more for ligatures)
    pub text: String,
    /// Bounding box in top-left page space
    pub bbox: Rect,
    /// Pen position before the glyph (page space)
    pub origin: (f32, f32),
    /// Pen position after the glyph's advance (page space)
    pub end: (f32, f32),
    /// Effective font size in page units
    pub size: f32,
}

impl Glyph {
    pub fn is_whitespace(&self) -> bool {
        self.text.chars().all(char::is_whitespace)
    }
}

/// 2D affine matrix `[a b c d e f]` as used by PDF.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32, // X translation
    pub f: f32, // Y translation
}

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl Matrix {
    pub fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    pub fn translation(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// `self × other` (apply `self` first, then `other`).
    pub fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }

    fn from_operands(operands: &[PdfValue]) -> Option<Matrix> {
        if operands.len() < 6 {
            return None;
        }
        let n: Vec<f32> = operands[..6]
            .iter()
            .map(get_number_from_value)
            .collect::<Option<_>>()?;
        Some(Matrix::new(n[0], n[1], n[2], n[3], n[4], n[5]))
    }
}

/// Text state parameters; saved and restored with the graphics state.
#[derive(Debug, Clone)]
struct TextState {
    font: Vec<u8>,
    size: f32,
    char_spacing: f32,
    word_spacing: f32,
    h_scale: f32,
    leading: f32,
    rise: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: Vec::new(),
            size: 12.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            h_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct GraphicsState {
    ctm: Matrix,
    text: TextState,
}

/// A Form XObject being interpreted.
struct FormFrame<'a> {
    scope: ResourceScope,
    fonts: Option<PageFonts<'a>>,
}

/// Interprets decoded content operations into positioned glyphs.
pub struct ContentInterpreter<'f, 'a> {
    fonts: &'f PageFonts<'a>,
    page_box: PageBox,
    forms: Option<(&'a dyn PdfBackend, ResourceScope)>,
    frames: Vec<FormFrame<'a>>,
    fallback_font: PageFont<'static>,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    in_text_block: bool,
    glyphs: Vec<Glyph>,
}

impl<'f, 'a> ContentInterpreter<'f, 'a> {
    pub fn new(fonts: &'f PageFonts<'a>, page_box: PageBox) -> Self {
        Self {
            fonts,
            page_box,
            forms: None,
            frames: Vec::new(),
            fallback_font: PageFont::plain(FontMetrics::default()),
            state: GraphicsState::default(),
            stack: Vec::new(),
            text_matrix: Matrix::identity(),
            line_matrix: Matrix::identity(),
            in_text_block: false,
            glyphs: Vec::new(),
        }
    }

    /// Resolve `Do` operands through `source`, starting from `scope`.
    pub fn with_forms(mut self, source: &'a dyn PdfBackend, scope: ResourceScope) -> Self {
        self.forms = Some((source, scope));
        self
    }

    /// Run all operations and return the glyphs in content order.
    pub fn run(mut self, operations: &[ContentOp]) -> Vec<Glyph> {
        for op in operations {
            self.apply(op);
        }
        self.glyphs
    }

    fn apply(&mut self, op: &ContentOp) {
        let operands = &op.operands;
        let num = |i: usize| operands.get(i).and_then(get_number_from_value);

        match op.operator.as_str() {
            "q" => self.stack.push(self.state.clone()),
            "Q" => {
                // Unbalanced Q is common in the wild; keep the current state.
                if let Some(saved) = self.stack.pop() {
                    self.state = saved;
                }
            }
            "cm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    self.state.ctm = m.then(&self.state.ctm);
                }
            }
            "BT" => {
                self.in_text_block = true;
                self.text_matrix = Matrix::identity();
                self.line_matrix = Matrix::identity();
            }
            "ET" => {
                self.in_text_block = false;
            }
            "Tf" => {
                if let Some(PdfValue::Name(name)) = operands.first() {
                    self.state.text.font = name.clone();
                }
                if let Some(size) = num(1) {
                    self.state.text.size = size;
                }
            }
            "Tc" => self.state.text.char_spacing = num(0).unwrap_or(0.0),
            "Tw" => self.state.text.word_spacing = num(0).unwrap_or(0.0),
            "Tz" => self.state.text.h_scale = num(0).unwrap_or(100.0) / 100.0,
            "TL" => self.state.text.leading = num(0).unwrap_or(0.0),
            "Ts" => self.state.text.rise = num(0).unwrap_or(0.0),
            "Td" => {
                if let (Some(tx), Some(ty)) = (num(0), num(1)) {
                    self.move_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (num(0), num(1)) {
                    self.state.text.leading = -ty;
                    self.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    self.text_matrix = m;
                    self.line_matrix = m;
                }
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(PdfValue::Str(bytes)) = operands.first() {
                    self.show(bytes);
                }
            }
            "TJ" => {
                if let Some(PdfValue::Array(items)) = operands.first() {
                    for item in items {
                        match item {
                            PdfValue::Str(bytes) => self.show(bytes),
                            other => {
                                // Positioning adjustment in 1/1000 text space units
                                if let Some(n) = get_number_from_value(other) {
                                    let text = &self.state.text;
                                    let tx = -n / 1000.0 * text.size * text.h_scale;
                                    self.advance(tx);
                                }
                            }
                        }
                    }
                }
            }
            "'" => {
                self.next_line();
                if let Some(PdfValue::Str(bytes)) = operands.first() {
                    self.show(bytes);
                }
            }
            "\"" => {
                if let (Some(aw), Some(ac)) = (num(0), num(1)) {
                    self.state.text.word_spacing = aw;
                    self.state.text.char_spacing = ac;
                }
                self.next_line();
                if let Some(PdfValue::Str(bytes)) = operands.get(2) {
                    self.show(bytes);
                }
            }
            "Do" => {
                if let Some(PdfValue::Name(name)) = operands.first() {
                    self.draw_form(name);
                }
            }
            _ => {}
        }
    }

    fn draw_form(&mut self, name: &[u8]) {
        let Some((source, page_scope)) = self.forms else {
            return;
        };
        if self.frames.len() >= MAX_FORM_DEPTH {
            log::warn!(
                "XObject /{} nested deeper than {} forms, not drawn",
                String::from_utf8_lossy(name),
                MAX_FORM_DEPTH
            );
            return;
        }

        let scope = self.frames.last().map_or(page_scope, |f| f.scope);
        let form = match source.form_xobject(scope, name) {
            Ok(Some(form)) => form,
            Ok(None) => return,
            Err(e) => {
                log::warn!("XObject /{} not drawn: {}", String::from_utf8_lossy(name), e);
                return;
            }
        };
        self.run_form(form);
    }

    /// Interpret a form inside a saved graphics state.
    fn run_form(&mut self, form: FormXObject<'a>) {
        let saved_state = self.state.clone();
        let saved_depth = self.stack.len();
        let saved_text = (self.text_matrix, self.line_matrix, self.in_text_block);

        if let Some([a, b, c, d, e, f]) = form.matrix {
            self.state.ctm = Matrix::new(a, b, c, d, e, f).then(&self.state.ctm);
        }
        self.frames.push(FormFrame {
            scope: form.scope,
            fonts: form.fonts,
        });
        for op in &form.operations {
            self.apply(op);
        }
        self.frames.pop();

        self.stack.truncate(saved_depth);
        self.state = saved_state;
        (self.text_matrix, self.line_matrix, self.in_text_block) = saved_text;
    }

    /// Font by resource name: innermost form first, then the page.
    fn font(&self, name: &[u8]) -> &PageFont<'a> {
        self.frames
            .iter()
            .rev()
            .filter_map(|frame| frame.fonts.as_ref())
            .find_map(|fonts| fonts.get(name))
            .or_else(|| self.fonts.get(name))
            .unwrap_or(&self.fallback_font)
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translation(tx, ty).then(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = self.state.text.leading;
        self.move_line(0.0, -leading);
    }

    fn advance(&mut self, tx: f32) {
        self.text_matrix = Matrix::translation(tx, 0.0).then(&self.text_matrix);
    }

    fn show(&mut self, bytes: &[u8]) {
        if !self.in_text_block {
            return;
        }

        let font = self.font(&self.state.text.font);
        let (glyphs, text_matrix) =
            layout_string(font, bytes, &self.state, self.text_matrix, &self.page_box);

        self.text_matrix = text_matrix;
        self.glyphs.extend(glyphs);
    }
}

/// Position every code of a shown string, returning the glyphs and the text
/// matrix after the last advance.
fn layout_string(
    font: &PageFont<'_>,
    bytes: &[u8],
    state: &GraphicsState,
    mut text_matrix: Matrix,
    page_box: &PageBox,
) -> (Vec<Glyph>, Matrix) {
    let text = &state.text;
    let mut glyphs = Vec::new();

    for (code, code_bytes) in font.metrics.codes(bytes) {
        let w0 = font.metrics.width(code) / 1000.0;

        let render = Matrix::new(text.size * text.h_scale, 0.0, 0.0, text.size, 0.0, text.rise)
            .then(&text_matrix)
            .then(&state.ctm);
        let to_page = |x: f32, y: f32| {
            let (ux, uy) = render.apply(x, y);
            page_box.to_page_space(ux, uy)
        };

        let decoded = font.decode(code_bytes);
        if !decoded.is_empty() {
            let corners = [(0.0, -DESCENT), (w0, -DESCENT), (0.0, ASCENT), (w0, ASCENT)]
                .map(|(x, y)| to_page(x, y));
            if let Some(bbox) = Rect::from_points(&corners) {
                glyphs.push(Glyph {
                    text: decoded,
                    bbox,
                    origin: to_page(0.0, 0.0),
                    end: to_page(w0, 0.0),
                    size: (render.c * render.c + render.d * render.d).sqrt(),
                });
            }
        }

        let mut tx = w0 * text.size + text.char_spacing;
        if font.metrics.code_len == 1 && code == 32 {
            tx += text.word_spacing;
        }
        text_matrix = Matrix::translation(tx * text.h_scale, 0.0).then(&text_matrix);
    }

    (glyphs, text_matrix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(operator: &str, operands: Vec<PdfValue>) -> ContentOp {
        ContentOp {
            operator: operator.to_string(),
            operands,
        }
    }

    fn int(v: i64) -> PdfValue {
        PdfValue::Integer(v)
    }

    fn text_ops(x: i64, y: i64, text: &str) -> Vec<ContentOp> {
        vec![
            op("BT", vec![]),
            op("Tf", vec![PdfValue::Name(b"F1".to_vec()), int(10)]),
            op("Td", vec![int(x), int(y)]),
            op("Tj", vec![PdfValue::Str(text.as_bytes().to_vec())]),
            op("ET", vec![]),
        ]
    }

    fn fonts() -> PageFonts<'static> {
        let mut fonts = PageFonts::new();
        fonts.insert(b"F1".to_vec(), PageFont::plain(FontMetrics::default()));
        fonts
    }

    #[test]
    fn test_glyph_positions_flip_to_top_left() {
        let fonts = fonts();
        let glyphs =
            ContentInterpreter::new(&fonts, PageBox::letter()).run(&text_ops(100, 700, "Hi"));

        assert_eq!(glyphs.len(), 2);
        assert_eq!(glyphs[0].text, "H");
        assert_eq!(glyphs[1].text, "i");
        // baseline at user y=700 -> page y=92, 500/1000 em advance at 10pt
        assert!((glyphs[0].origin.0 - 100.0).abs() < 1e-3);
        assert!((glyphs[0].origin.1 - 92.0).abs() < 1e-3);
        assert!((glyphs[1].origin.0 - 105.0).abs() < 1e-3);
        // ascent 8pt above the baseline, descent 2pt below
        assert!((glyphs[0].bbox.y0 - 84.0).abs() < 1e-3);
        assert!((glyphs[0].bbox.y1 - 94.0).abs() < 1e-3);
        assert!((glyphs[0].size - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_cm_and_state_restore() {
        let fonts = fonts();
        let mut ops = vec![
            op("q", vec![]),
            op("cm", vec![int(1), int(0), int(0), int(1), int(50), int(0)]),
        ];
        ops.extend(text_ops(0, 700, "A"));
        ops.push(op("Q", vec![]));
        ops.extend(text_ops(0, 700, "B"));

        let glyphs = ContentInterpreter::new(&fonts, PageBox::letter()).run(&ops);
        assert_eq!(glyphs.len(), 2);
        assert!((glyphs[0].origin.0 - 50.0).abs() < 1e-3);
        assert!((glyphs[1].origin.0 - 0.0).abs() < 1e-3);
    }

    #[test]
    fn test_tj_adjustment_moves_pen() {
        let fonts = fonts();
        let ops = vec![
            op("BT", vec![]),
            op("Tf", vec![PdfValue::Name(b"F1".to_vec()), int(10)]),
            op("Td", vec![int(0), int(700)]),
            op(
                "TJ",
                vec![PdfValue::Array(vec![
                    PdfValue::Str(b"A".to_vec()),
                    int(-1000),
                    PdfValue::Str(b"B".to_vec()),
                ])],
            ),
            op("ET", vec![]),
        ];
        let glyphs = ContentInterpreter::new(&fonts, PageBox::letter()).run(&ops);
        // 5pt advance for A, then 10pt of adjustment
        assert!((glyphs[1].origin.0 - 15.0).abs() < 1e-3);
    }

    #[test]
    fn test_leading_and_next_line() {
        let fonts = fonts();
        let ops = vec![
            op("BT", vec![]),
            op("Tf", vec![PdfValue::Name(b"F1".to_vec()), int(10)]),
            op("TL", vec![int(14)]),
            op("Td", vec![int(0), int(700)]),
            op("Tj", vec![PdfValue::Str(b"a".to_vec())]),
            op("T*", vec![]),
            op("Tj", vec![PdfValue::Str(b"b".to_vec())]),
            op("ET", vec![]),
        ];
        let glyphs = ContentInterpreter::new(&fonts, PageBox::letter()).run(&ops);
        assert!((glyphs[1].origin.1 - glyphs[0].origin.1 - 14.0).abs() < 1e-3);
        assert!((glyphs[1].origin.0 - 0.0).abs() < 1e-3);
    }

    #[test]
    fn test_text_outside_bt_ignored() {
        let fonts = fonts();
        let ops = vec![op("Tj", vec![PdfValue::Str(b"x".to_vec())])];
        assert!(ContentInterpreter::new(&fonts, PageBox::letter())
            .run(&ops)
            .is_empty());
    }

    #[test]
    fn test_unknown_font_uses_fallback() {
        let fonts = PageFonts::new();
        let glyphs =
            ContentInterpreter::new(&fonts, PageBox::letter()).run(&text_ops(10, 10, "ok"));
        assert_eq!(glyphs.len(), 2);
    }

    #[test]
    fn test_matrix_then() {
        let scale = Matrix::new(2.0, 0.0, 0.0, 2.0, 0.0, 0.0);
        let shift = Matrix::translation(10.0, 5.0);
        assert_eq!(scale.then(&shift).apply(1.0, 1.0), (12.0, 7.0));
        assert_eq!(shift.then(&scale).apply(1.0, 1.0), (22.0, 12.0));
    }

    #[test]
    fn test_form_fonts_shadow_page_fonts() {
        let page_fonts = fonts();
        let mut form_fonts = PageFonts::new();
        form_fonts.insert(
            b"F1".to_vec(),
            PageFont::plain(FontMetrics::default().with_default_width(1000.0)),
        );
        let form = FormXObject {
            scope: ResourceScope::Form((9, 0)),
            matrix: Some([1.0, 0.0, 0.0, 1.0, 20.0, 0.0]),
            fonts: Some(form_fonts),
            operations: text_ops(0, 700, "AB"),
        };

        let mut interpreter = ContentInterpreter::new(&page_fonts, PageBox::letter());
        interpreter.run_form(form);
        let glyphs = interpreter.run(&text_ops(0, 700, "C"));

        assert_eq!(glyphs.len(), 3);
        // form matrix shifts by 20, form font advances a full em
        assert!((glyphs[0].origin.0 - 20.0).abs() < 1e-3);
        assert!((glyphs[1].origin.0 - 30.0).abs() < 1e-3);
        // back on the page: no shift, page font
        assert!((glyphs[2].origin.0 - 0.0).abs() < 1e-3);
        assert!((glyphs[2].bbox.x1 - 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_do_without_forms_is_ignored() {
        let fonts = fonts();
        let mut ops = vec![op("Do", vec![PdfValue::Name(b"Fm1".to_vec())])];
        ops.extend(text_ops(0, 700, "A"));

        let glyphs = ContentInterpreter::new(&fonts, PageBox::letter()).run(&ops);
        assert_eq!(glyphs.len(), 1);
    }
}
