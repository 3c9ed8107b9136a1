//! Model types shared by the extractor, renderers and summarizer.
//!
//! All geometry is expressed in top-left page space: origin at the top-left
//! corner of the page's MediaBox, y growing downward.

mod annotation;
mod fragment;
mod geometry;

pub use annotation::{parse_pdf_date, Annotation, AnnotationKind};
pub use fragment::{sort_reading_order, Fragment};
pub use geometry::{PageBox, Rect};
