//! Extracted fragments: the output unit of the extractor.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::{AnnotationKind, Rect};

/// Text captured under one highlight or underline annotation.
///
/// `x0`/`y0` are the annotation's own top-left corner, not the padded
/// capture region, so fragments sort by where the reader put the mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub text: String,
    /// Page number (1-indexed)
    pub page: u32,
    pub y0: f32,
    pub x0: f32,
    pub kind: AnnotationKind,
}

impl Fragment {
    /// Build a fragment from captured text and the annotation's unpadded region.
    pub fn new(text: impl Into<String>, page: u32, region: &Rect, kind: AnnotationKind) -> Self {
        Self {
            text: text.into(),
            page,
            y0: region.y0,
            x0: region.x0,
            kind,
        }
    }

    /// Reading-order comparison within a single page: top-to-bottom, then
    /// left-to-right.
    pub fn cmp_position(&self, other: &Fragment) -> Ordering {
        self.y0
            .total_cmp(&other.y0)
            .then_with(|| self.x0.total_cmp(&other.x0))
    }
}

/// Stable sort by `(y0, x0)`; equal keys keep their enumeration order.
pub fn sort_reading_order(fragments: &mut [Fragment]) {
    fragments.sort_by(Fragment::cmp_position);
}
