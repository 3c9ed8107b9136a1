//! Extraction options and configuration.

use std::ops::RangeInclusive;

use crate::error::{Error, Result};
use crate::model::AnnotationKind;
use crate::render::CleanupOptions;

/// Padding added around each annotation before clipping text.
///
/// Markup rectangles hug the painted ink, not the glyph ascenders and
/// descenders, so without a margin tall capitals and descending letters fall
/// outside the region.
pub const DEFAULT_MARGIN: f32 = 1.0;

/// Options for extracting annotated text.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Error handling mode
    pub error_mode: ErrorMode,

    /// Padding (in page units) added on every edge of the capture region
    pub margin: f32,

    /// Annotation kinds whose text is extracted
    pub kinds: Vec<AnnotationKind>,

    /// Page selection (which pages to scan)
    pub pages: PageSelection,

    /// Cleanup applied to each fragment's text before the emptiness check
    pub cleanup: Option<CleanupOptions>,
}

impl ExtractOptions {
    /// Create new extract options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Enable lenient mode (skip pages whose content cannot be decoded).
    pub fn lenient(mut self) -> Self {
        self.error_mode = ErrorMode::Lenient;
        self
    }

    /// Set the capture margin.
    pub fn with_margin(mut self, margin: f32) -> Self {
        self.margin = margin.max(0.0);
        self
    }

    /// Replace the set of annotation kinds to extract.
    pub fn with_kinds(mut self, kinds: Vec<AnnotationKind>) -> Self {
        self.kinds = kinds;
        self
    }

    /// Set page selection.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.pages = pages;
        self
    }

    /// Set cleanup options.
    pub fn with_cleanup(mut self, cleanup: CleanupOptions) -> Self {
        self.cleanup = Some(cleanup);
        self
    }

    /// Whether annotations of this kind produce fragments.
    pub fn accepts(&self, kind: &AnnotationKind) -> bool {
        self.kinds.contains(kind)
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            error_mode: ErrorMode::Strict,
            margin: DEFAULT_MARGIN,
            kinds: vec![AnnotationKind::Highlight, AnnotationKind::Underline],
            pages: PageSelection::All,
            cleanup: None,
        }
    }
}

/// Error handling mode during extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Fail on any error
    #[default]
    Strict,
    /// Skip pages that cannot be interpreted and continue
    Lenient,
}

/// Page selection for extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PageSelection {
    /// All pages
    #[default]
    All,
    /// A range of pages (inclusive, 1-indexed)
    Range(RangeInclusive<u32>),
    /// Specific pages (1-indexed)
    Pages(Vec<u32>),
}

impl PageSelection {
    /// Check if a page number should be included.
    pub fn includes(&self, page: u32) -> bool {
        match self {
            PageSelection::All => true,
            PageSelection::Range(range) => range.contains(&page),
            PageSelection::Pages(pages) => pages.contains(&page),
        }
    }

    /// Ensure every explicitly requested page exists in a document of
    /// `page_count` pages.
    pub fn validate(&self, page_count: u32) -> Result<()> {
        let highest = match self {
            PageSelection::All => return Ok(()),
            PageSelection::Range(range) => *range.end(),
            PageSelection::Pages(pages) => pages.iter().copied().max().unwrap_or(0),
        };
        if highest > page_count {
            return Err(Error::PageOutOfRange(highest, page_count));
        }
        Ok(())
    }

    /// Parse a page selection string (e.g., "1-10", "1,3,5,7-10").
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        if s.is_empty() || s == "all" {
            return Ok(PageSelection::All);
        }

        let invalid = || Error::InvalidPageRange(s.to_string());

        if let Some((start, end)) = s.split_once('-') {
            if !start.contains(',') && !end.contains(',') {
                let start = parse_page_number(start).ok_or_else(invalid)?;
                let end = parse_page_number(end).ok_or_else(invalid)?;
                if start > end {
                    return Err(invalid());
                }
                return Ok(PageSelection::Range(start..=end));
            }
        }

        let mut pages = Vec::new();
        for part in s.split(',') {
            if let Some((start, end)) = part.split_once('-') {
                let start = parse_page_number(start).ok_or_else(invalid)?;
                let end = parse_page_number(end).ok_or_else(invalid)?;
                pages.extend(start..=end);
            } else {
                pages.push(parse_page_number(part).ok_or_else(invalid)?);
            }
        }

        pages.sort_unstable();
        pages.dedup();
        Ok(PageSelection::Pages(pages))
    }
}

/// Pages are 1-indexed; zero is rejected.
fn parse_page_number(s: &str) -> Option<u32> {
    s.trim().parse().ok().filter(|&p| p > 0)
}
