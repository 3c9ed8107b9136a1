//! Plain text rendering for extracted fragments.

use crate::model::Fragment;

/// Default page label: `[Pg 3] ...`.
pub const DEFAULT_PAGE_LABEL: &str = "Pg";

/// Options for plain text rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextOptions {
    /// Page label placed inside the brackets (e.g. "Pg", "Pág")
    pub label: String,
}

impl TextOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            label: DEFAULT_PAGE_LABEL.to_string(),
        }
    }
}

/// One line per fragment: `[{label} {page}] {text}`.
///
/// Line breaks inside a fragment are kept as-is.
pub fn to_text(fragments: &[Fragment], options: &TextOptions) -> String {
    fragments
        .iter()
        .map(|f| format!("[{} {}] {}", options.label, f.page, f.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The `[Pg N] text` form handed to the summarizer.
pub fn raw_text(fragments: &[Fragment]) -> String {
    to_text(fragments, &TextOptions::default())
}
