//! Page annotations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Rect;

/// Annotation subtype as far as extraction is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    /// `/Subtype /Highlight`
    Highlight,
    /// `/Subtype /Underline`
    Underline,
    /// Anything else (notes, links, strikeouts, ...), keeping the raw subtype.
    Other(String),
}

impl AnnotationKind {
    /// Parse from a PDF `/Subtype` name.
    pub fn from_subtype(subtype: &str) -> Self {
        match subtype {
            "Highlight" => Self::Highlight,
            "Underline" => Self::Underline,
            other => Self::Other(other.to_string()),
        }
    }

    /// Highlight and underline are the reader's markup over body text.
    pub fn is_markup(&self) -> bool {
        matches!(self, Self::Highlight | Self::Underline)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Highlight => "Highlight",
            Self::Underline => "Underline",
            Self::Other(name) => name,
        }
    }
}

impl std::fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single annotation read from a page's `/Annots` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Page number (1-indexed)
    pub page: u32,
    /// Position in the page's `/Annots` array
    pub index: usize,
    pub kind: AnnotationKind,
    /// Bounding region in top-left page space
    pub rect: Rect,
    /// `/Contents` (popup note text)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contents: Option<String>,
    /// `/T` (author)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// `/M` (last modification)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

impl Annotation {
    pub fn new(page: u32, index: usize, kind: AnnotationKind, rect: Rect) -> Self {
        Self {
            page,
            index,
            kind,
            rect,
            contents: None,
            author: None,
            modified: None,
        }
    }
}

/// Parse a PDF date string (`D:YYYYMMDDHHmmSSOHH'mm'`).
///
/// Only the date and time fields are read; the UTC offset is ignored.
pub fn parse_pdf_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.strip_prefix("D:").unwrap_or(s);

    if s.len() < 4 {
        return None;
    }

    let year: i32 = s.get(0..4)?.parse().ok()?;
    let month: u32 = s.get(4..6).and_then(|m| m.parse().ok()).unwrap_or(1);
    let day: u32 = s.get(6..8).and_then(|d| d.parse().ok()).unwrap_or(1);
    let hour: u32 = s.get(8..10).and_then(|h| h.parse().ok()).unwrap_or(0);
    let minute: u32 = s.get(10..12).and_then(|m| m.parse().ok()).unwrap_or(0);
    let second: u32 = s.get(12..14).and_then(|s| s.parse().ok()).unwrap_or(0);

    chrono::NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc))
}
