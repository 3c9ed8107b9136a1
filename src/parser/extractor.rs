//! Highlight and underline text extraction.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::model::{sort_reading_order, Annotation, Fragment};
use crate::render::CleanupPipeline;

use super::backend::{PageId, PdfBackend, ResourceScope};
use super::clip::clip_text;
use super::content::{ContentInterpreter, Glyph};
use super::options::{ErrorMode, ExtractOptions};

/// Extracts the text under markup annotations, in reading order.
///
/// The extractor owns its backend; the underlying document is released when
/// the extractor is dropped.
pub struct AnnotationExtractor<B: PdfBackend> {
    backend: B,
    options: ExtractOptions,
    cleanup: Option<CleanupPipeline>,
}

impl<B: PdfBackend> AnnotationExtractor<B> {
    /// Create an extractor with default options.
    pub fn new(backend: B) -> Self {
        Self::with_options(backend, ExtractOptions::default())
    }

    /// Create an extractor with custom options.
    pub fn with_options(backend: B, options: ExtractOptions) -> Self {
        let cleanup = options.cleanup.clone().map(CleanupPipeline::new);
        Self {
            backend,
            options,
            cleanup,
        }
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> u32 {
        self.backend.pages().len() as u32
    }

    /// Extract all fragments: pages in document order, each page sorted
    /// top-to-bottom then left-to-right.
    pub fn extract(&self) -> Result<Vec<Fragment>> {
        let pages = self.selected_pages()?;
        let mut fragments = Vec::new();

        for (page_num, page_id) in pages {
            match self.extract_page(page_num, page_id) {
                Ok(mut page_fragments) => fragments.append(&mut page_fragments),
                Err(e) if self.options.error_mode == ErrorMode::Lenient => {
                    log::warn!("Skipping page {}: {}", page_num, e);
                }
                Err(e) => return Err(e),
            }
        }

        log::debug!("Extracted {} fragments", fragments.len());
        Ok(fragments)
    }

    /// Extract the sorted fragments of a single page.
    pub fn extract_page(&self, page_num: u32, page_id: PageId) -> Result<Vec<Fragment>> {
        let annotations: Vec<Annotation> = self
            .backend
            .page_annotations(page_num, page_id)?
            .into_iter()
            .filter(|a| self.options.accepts(&a.kind))
            .filter(|a| {
                let usable = !a.rect.is_degenerate();
                if !usable {
                    log::debug!("page {}: skipping degenerate annotation #{}", page_num, a.index);
                }
                usable
            })
            .collect();

        if annotations.is_empty() {
            return Ok(Vec::new());
        }

        let glyphs = self.page_glyphs(page_id)?;
        log::debug!(
            "page {}: {} markup annotations, {} glyphs",
            page_num,
            annotations.len(),
            glyphs.len()
        );

        let mut fragments = Vec::with_capacity(annotations.len());
        for annotation in annotations {
            let region = annotation.rect.padded(self.options.margin);
            let mut text = clip_text(&glyphs, &region);
            if let Some(cleanup) = &self.cleanup {
                text = cleanup.process(&text);
            }

            let text = text.trim();
            if text.is_empty() {
                log::debug!(
                    "page {}: annotation #{} covers no text",
                    page_num,
                    annotation.index
                );
                continue;
            }
            fragments.push(Fragment::new(text, page_num, &annotation.rect, annotation.kind));
        }

        sort_reading_order(&mut fragments);
        Ok(fragments)
    }

    /// Every annotation of every selected page, any kind, in page then
    /// enumeration order.
    pub fn annotations(&self) -> Result<Vec<Annotation>> {
        let mut all = Vec::new();
        for (page_num, page_id) in self.selected_pages()? {
            match self.backend.page_annotations(page_num, page_id) {
                Ok(mut annotations) => all.append(&mut annotations),
                Err(e) if self.options.error_mode == ErrorMode::Lenient => {
                    log::warn!("Skipping annotations of page {}: {}", page_num, e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(all)
    }

    /// Positioned glyphs of a page's content stream.
    fn page_glyphs(&self, page_id: PageId) -> Result<Vec<Glyph>> {
        let fonts = self.backend.page_fonts(page_id)?;
        let data = self.backend.page_content(page_id)?;
        let operations = self.backend.decode_content(&data)?;
        let page_box = self.backend.page_box(page_id);
        Ok(ContentInterpreter::new(&fonts, page_box)
            .with_forms(&self.backend, ResourceScope::Page(page_id))
            .run(&operations))
    }

    fn selected_pages(&self) -> Result<BTreeMap<u32, PageId>> {
        let pages = self.backend.pages();
        self.options.pages.validate(pages.len() as u32)?;
        Ok(pages
            .into_iter()
            .filter(|(num, _)| self.options.pages.includes(*num))
            .collect())
    }
}
