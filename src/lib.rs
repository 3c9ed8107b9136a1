//! # unmark
//!
//! Extract highlighted and underlined passages from PDF documents, in the
//! order a person reads them.
//!
//! For every highlight or underline annotation, the text under its rectangle
//! is clipped from the page. Fragments are then ordered page by page,
//! top-to-bottom and left-to-right, ready to be printed as `[Pg N] text`
//! lines or handed to a summarizer.
//!
//! ## Quick Start
//!
//! ```no_run
//! use unmark::{extract_file, raw_text};
//!
//! fn main() -> unmark::Result<()> {
//!     let fragments = extract_file("annotated.pdf")?;
//!     if fragments.is_empty() {
//!         eprintln!("no highlights detected");
//!     }
//!     println!("{}", raw_text(&fragments));
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Geometric clipping**: glyph boxes from the content stream are matched
//!   against each annotation's padded rectangle
//! - **Reading order**: stable per-page sort on the annotation's top-left
//!   corner
//! - **Cleanup pipeline**: ligatures, hyphenation and line breaks
//! - **Batch processing**: many documents in parallel with Rayon
//! - **Summaries**: a `TextGenerator` seam, with a Gemini client behind the
//!   `gemini` feature

pub mod batch;
pub mod detect;
pub mod error;
pub mod model;
pub mod parser;
pub mod render;
pub mod summarize;

// Re-export commonly used types
pub use detect::{is_pdf_bytes, sniff_file, sniff_header, PdfHeader};
pub use error::{Error, Result};
pub use model::{Annotation, AnnotationKind, Fragment, PageBox, Rect};
pub use parser::{
    AnnotationExtractor, ErrorMode, ExtractOptions, LopdfBackend, PageSelection, PdfBackend,
    DEFAULT_MARGIN,
};
pub use render::{raw_text, CleanupOptions, CleanupPreset, JsonFormat, TextOptions};

use std::io::Read;
use std::path::Path;

/// Extract highlighted and underlined text from PDF bytes.
///
/// A document without qualifying annotations yields an empty `Vec`, not an
/// error.
///
/// # Example
///
/// ```no_run
/// use unmark::extract;
///
/// let data = std::fs::read("annotated.pdf").unwrap();
/// for fragment in extract(&data).unwrap() {
///     println!("[Pg {}] {}", fragment.page, fragment.text);
/// }
/// ```
pub fn extract(data: &[u8]) -> Result<Vec<Fragment>> {
    extract_with_options(data, ExtractOptions::default())
}

/// Extract from PDF bytes with custom options.
///
/// # Example
///
/// ```no_run
/// use unmark::{extract_with_options, ExtractOptions, PageSelection};
///
/// let data = std::fs::read("annotated.pdf").unwrap();
/// let options = ExtractOptions::new()
///     .lenient()
///     .with_pages(PageSelection::parse("1-3").unwrap());
/// let fragments = extract_with_options(&data, options).unwrap();
/// ```
pub fn extract_with_options(data: &[u8], options: ExtractOptions) -> Result<Vec<Fragment>> {
    AnnotationExtractor::with_options(open_bytes(data)?, options).extract()
}

/// Extract from a PDF file.
pub fn extract_file<P: AsRef<Path>>(path: P) -> Result<Vec<Fragment>> {
    extract_file_with_options(path, ExtractOptions::default())
}

/// Extract from a PDF file with custom options.
pub fn extract_file_with_options<P: AsRef<Path>>(
    path: P,
    options: ExtractOptions,
) -> Result<Vec<Fragment>> {
    AnnotationExtractor::with_options(open_file(path)?, options).extract()
}

/// Extract from any reader (the whole stream is buffered first).
///
/// # Example
///
/// ```no_run
/// use unmark::extract_reader;
/// use std::fs::File;
///
/// let file = File::open("annotated.pdf").unwrap();
/// let fragments = extract_reader(file).unwrap();
/// ```
pub fn extract_reader<R: Read>(reader: R) -> Result<Vec<Fragment>> {
    extract_reader_with_options(reader, ExtractOptions::default())
}

/// Extract from a reader with custom options.
pub fn extract_reader_with_options<R: Read>(
    mut reader: R,
    options: ExtractOptions,
) -> Result<Vec<Fragment>> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    extract_with_options(&data, options)
}

/// Every annotation in the document, whatever its kind, in page then
/// `/Annots` order.
pub fn list_annotations(data: &[u8]) -> Result<Vec<Annotation>> {
    AnnotationExtractor::new(open_bytes(data)?).annotations()
}

/// List the annotations of a PDF file.
pub fn list_annotations_file<P: AsRef<Path>>(path: P) -> Result<Vec<Annotation>> {
    AnnotationExtractor::new(open_file(path)?).annotations()
}

fn open_bytes(data: &[u8]) -> Result<LopdfBackend> {
    let header = sniff_header(data)?;
    log::debug!("Loading {} ({} bytes)", header, data.len());
    if header.offset > 0 {
        log::debug!("Skipping {} bytes before the header", header.offset);
    }
    LopdfBackend::load_bytes(&data[header.offset..])
}

fn open_file<P: AsRef<Path>>(path: P) -> Result<LopdfBackend> {
    let path = path.as_ref();
    let header = sniff_file(path)?;
    if header.offset > 0 {
        return open_bytes(&std::fs::read(path)?);
    }
    log::debug!("Loading {} from {}", header, path.display());
    LopdfBackend::load_file(path)
}

/// Builder for extracting and rendering annotated text.
///
/// # Example
///
/// ```no_run
/// use unmark::{CleanupPreset, Unmark};
///
/// let text = Unmark::new()
///     .lenient()
///     .with_cleanup(CleanupPreset::Standard)
///     .with_label("Pág")
///     .extract("annotated.pdf")?
///     .to_text();
/// # Ok::<(), unmark::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Unmark {
    extract_options: ExtractOptions,
    text_options: TextOptions,
}

impl Unmark {
    /// Create a new Unmark builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip pages whose content cannot be interpreted instead of failing.
    pub fn lenient(mut self) -> Self {
        self.extract_options = self.extract_options.lenient();
        self
    }

    /// Set the capture margin around each annotation.
    pub fn with_margin(mut self, margin: f32) -> Self {
        self.extract_options = self.extract_options.with_margin(margin);
        self
    }

    /// Set the annotation kinds to extract.
    pub fn with_kinds(mut self, kinds: Vec<AnnotationKind>) -> Self {
        self.extract_options = self.extract_options.with_kinds(kinds);
        self
    }

    /// Set page selection.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.extract_options = self.extract_options.with_pages(pages);
        self
    }

    /// Set cleanup preset.
    pub fn with_cleanup(mut self, preset: CleanupPreset) -> Self {
        self.extract_options = self
            .extract_options
            .with_cleanup(CleanupOptions::from_preset(preset));
        self
    }

    /// Set the page label used by [`Extraction::to_text`].
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.text_options = self.text_options.with_label(label);
        self
    }

    /// Extract from a PDF file.
    pub fn extract<P: AsRef<Path>>(self, path: P) -> Result<Extraction> {
        let fragments = extract_file_with_options(path, self.extract_options)?;
        Ok(Extraction {
            fragments,
            text_options: self.text_options,
        })
    }

    /// Extract from PDF bytes.
    pub fn extract_bytes(self, data: &[u8]) -> Result<Extraction> {
        let fragments = extract_with_options(data, self.extract_options)?;
        Ok(Extraction {
            fragments,
            text_options: self.text_options,
        })
    }
}

/// Result of an extraction.
#[derive(Debug, Clone)]
pub struct Extraction {
    fragments: Vec<Fragment>,
    text_options: TextOptions,
}

impl Extraction {
    /// Fragments in reading order.
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn into_fragments(self) -> Vec<Fragment> {
        self.fragments
    }

    /// True when no highlight or underline produced text.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// `[label N] text` lines.
    pub fn to_text(&self) -> String {
        render::to_text(&self.fragments, &self.text_options)
    }

    /// Convert to JSON.
    pub fn to_json(&self, format: JsonFormat) -> Result<String> {
        render::to_json(&self.fragments, format)
    }
}
