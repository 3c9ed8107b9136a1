//! Summary generation from extracted fragments.
//!
//! The extractor knows nothing about language models. This module is the
//! seam: fragments are rendered to the `[Pg N] text` form, wrapped in an
//! instruction prompt and handed to a [`TextGenerator`].
//!
//! ```
//! use unmark::summarize::{summarize, SummaryRequest, TextGenerator};
//! use unmark::{AnnotationKind, Fragment, Rect};
//!
//! struct Echo;
//!
//! impl TextGenerator for Echo {
//!     fn generate(&self, prompt: &str) -> unmark::Result<String> {
//!         Ok(prompt.lines().last().unwrap_or_default().to_string())
//!     }
//! }
//!
//! let rect = Rect::new(72.0, 100.0, 200.0, 112.0);
//! let fragment = Fragment::new("Syncope is transient", 1, &rect, AnnotationKind::Highlight);
//! let fragments = vec![fragment];
//! let summary = summarize(&Echo, &fragments, &SummaryRequest::default())?;
//! assert_eq!(summary, "[Pg 1] Syncope is transient");
//! # Ok::<(), unmark::Error>(())
//! ```

#[cfg(feature = "gemini")]
mod gemini;

#[cfg(feature = "gemini")]
pub use gemini::{GeminiClient, GeminiConfig, API_KEY_ENV, DEFAULT_MODEL, DEFAULT_TEMPERATURE};

use std::path::Path;

use crate::error::{Error, Result};
use crate::model::Fragment;
use crate::render::raw_text;

/// Placeholder replaced by the fragment text when present in the
/// instructions. Without it, the text is appended after the instructions.
pub const TEXT_PLACEHOLDER: &str = "{text}";

/// Instructions used when none are supplied.
pub const DEFAULT_PROMPT: &str = "\
You are given passages a reader highlighted or underlined in a PDF document. \
Each line starts with a page marker such as [Pg 3]. The text comes straight \
from the page and may contain words split by hyphens, broken lines and scan \
artifacts.

Write a structured summary of these passages:
1. Rejoin split words, drop the page markers and fix obvious extraction errors.
2. Organise the content into short sections with headings instead of a flat list.
3. Keep technical terms, numbers, units and names exactly as written.
4. End with a section titled \"Key points\": a bullet list of the most important takeaways.

Output Markdown.

Passages:";

/// A service that turns a prompt into generated text.
pub trait TextGenerator {
    fn generate(&self, prompt: &str) -> Result<String>;
}

impl<T: TextGenerator + ?Sized> TextGenerator for &T {
    fn generate(&self, prompt: &str) -> Result<String> {
        (**self).generate(prompt)
    }
}

impl<T: TextGenerator + ?Sized> TextGenerator for Box<T> {
    fn generate(&self, prompt: &str) -> Result<String> {
        (**self).generate(prompt)
    }
}

/// Instruction prompt for a summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRequest {
    pub instructions: String,
}

impl SummaryRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the instructions.
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    /// Read the instructions from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let instructions = std::fs::read_to_string(path)?;
        if instructions.trim().is_empty() {
            return Err(Error::Config("prompt file is empty".to_string()));
        }
        Ok(Self { instructions })
    }

    /// Full prompt for `text`: the text replaces [`TEXT_PLACEHOLDER`], or
    /// follows the instructions on its own lines.
    pub fn build_prompt(&self, text: &str) -> String {
        if self.instructions.contains(TEXT_PLACEHOLDER) {
            self.instructions.replace(TEXT_PLACEHOLDER, text)
        } else {
            format!("{}\n\n{}", self.instructions.trim_end(), text)
        }
    }
}

impl Default for SummaryRequest {
    fn default() -> Self {
        Self {
            instructions: DEFAULT_PROMPT.to_string(),
        }
    }
}

/// Summarize fragments with `generator`.
///
/// An empty fragment list fails with [`Error::NothingToSummarize`] before the
/// generator is called. Generator failures come back as [`Error::Upstream`]
/// and are not retried.
pub fn summarize<G: TextGenerator + ?Sized>(
    generator: &G,
    fragments: &[Fragment],
    request: &SummaryRequest,
) -> Result<String> {
    if fragments.is_empty() {
        return Err(Error::NothingToSummarize);
    }

    let prompt = request.build_prompt(&raw_text(fragments));
    log::debug!(
        "Requesting summary of {} fragments ({} prompt bytes)",
        fragments.len(),
        prompt.len()
    );

    let summary = generator.generate(&prompt).map_err(|e| match e {
        Error::Upstream(message) => Error::Upstream(message),
        other => Error::Upstream(other.to_string()),
    })?;

    if summary.trim().is_empty() {
        return Err(Error::Upstream("empty response".to_string()));
    }
    Ok(summary)
}
