//! PDF parsing module: backend access, content interpretation and the
//! annotation extractor built on top of them.

pub mod backend;
mod clip;
mod content;
mod extractor;
mod font;
mod options;

pub use backend::{
    ContentOp, FormXObject, LopdfBackend, PageId, PdfBackend, PdfValue, ResourceScope,
};
pub use clip::clip_text;
pub use content::{ContentInterpreter, Glyph, Matrix, MAX_FORM_DEPTH};
pub use extractor::AnnotationExtractor;
pub use font::{decode_text_simple, FontMetrics, PageFont, PageFonts};
pub use options::{ErrorMode, ExtractOptions, PageSelection, DEFAULT_MARGIN};
