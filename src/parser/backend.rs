//! PDF backend abstraction layer.
//!
//! Provides a trait-based interface for the PDF operations the extractor
//! needs, isolating the concrete PDF library (lopdf) from the clipping and
//! ordering logic.

use std::collections::{BTreeMap, HashMap};

use crate::error::{Error, Result};
use crate::model::{parse_pdf_date, Annotation, AnnotationKind, PageBox};

use super::font::{parse_cid_widths, FontMetrics, PageFont, PageFonts, WidthEntry, FALLBACK_WIDTH};

/// Page identifier: (object number, generation number).
pub type PageId = (u32, u16);

/// A value from a PDF content stream operand.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Other,
}

/// A single operation from a PDF content stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

/// Where a content stream looks up its named resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceScope {
    /// The page's (possibly inherited) `/Resources`
    Page(PageId),
    /// A Form XObject's own `/Resources`, by object id
    Form((u32, u16)),
}

/// A Form XObject resolved from a `Do` operator.
#[derive(Debug)]
pub struct FormXObject<'a> {
    /// Scope for names used inside the form: its own resources when it has
    /// them, otherwise the scope that drew it
    pub scope: ResourceScope,
    /// `/Matrix`, form space to the space of the drawing stream
    pub matrix: Option<[f32; 6]>,
    /// Fonts of the form's own `/Resources`; `None` when it has none
    pub fonts: Option<PageFonts<'a>>,
    pub operations: Vec<ContentOp>,
}

/// Abstract interface for PDF document access.
///
/// Implementations provide page enumeration, page geometry, annotations,
/// fonts and content streams without exposing any concrete PDF library
/// types.
pub trait PdfBackend {
    /// Return all pages as (page_number → PageId).
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// Effective MediaBox of a page.
    fn page_box(&self, page: PageId) -> PageBox;

    /// All annotations of a page in `/Annots` order, any kind.
    fn page_annotations(&self, page_num: u32, page: PageId) -> Result<Vec<Annotation>>;

    /// Font resources of a page with their width tables and decoders.
    fn page_fonts(&self, page: PageId) -> Result<PageFonts<'_>>;

    /// Return the raw (decompressed) content stream bytes for a page.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>>;

    /// Parse raw content stream bytes into a sequence of operations.
    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>>;

    /// Resolve `name` in the `/XObject` resources of `scope`.
    ///
    /// `Ok(None)` for unknown names and for XObjects that are not forms
    /// (images, PostScript).
    fn form_xobject(&self, scope: ResourceScope, name: &[u8]) -> Result<Option<FormXObject<'_>>>;
}

/// Helper: extract a number from a [`PdfValue`].
pub fn get_number_from_value(val: &PdfValue) -> Option<f32> {
    match val {
        PdfValue::Integer(i) => Some(*i as f32),
        PdfValue::Real(r) => Some(*r),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// LopdfBackend: concrete implementation backed by lopdf
// ---------------------------------------------------------------------------

/// Page tree levels walked when looking for inherited attributes.
const MAX_TREE_DEPTH: usize = 32;

use lopdf::{Dictionary, Document as LopdfDocument, Object};

/// Concrete [`PdfBackend`] backed by `lopdf::Document`.
///
/// The document is owned; dropping the backend releases it.
pub struct LopdfBackend {
    doc: LopdfDocument,
}

impl LopdfBackend {
    /// Load from a file path.
    pub fn load_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let doc = LopdfDocument::load(path)?;
        Ok(Self { doc })
    }

    /// Load from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self> {
        let doc = LopdfDocument::load_mem(data)?;
        Ok(Self { doc })
    }

    /// Load from a reader.
    pub fn load_reader<R: std::io::Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::load_bytes(&data)
    }

    /// Direct access to the underlying `lopdf::Document`.
    pub fn raw_doc(&self) -> &LopdfDocument {
        &self.doc
    }

    /// Check if the document is encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.doc.is_encrypted()
    }

    /// Get PDF version string.
    pub fn version(&self) -> String {
        self.doc.version.to_string()
    }

    /// Follow a reference to its object; direct objects are returned as-is.
    fn resolve<'d>(&'d self, obj: &'d Object) -> Option<&'d Object> {
        match obj {
            Object::Reference(id) => self.doc.get_object(*id).ok(),
            other => Some(other),
        }
    }

    fn resolve_dict<'d>(&'d self, obj: &'d Object) -> Option<&'d Dictionary> {
        self.resolve(obj).and_then(|o| o.as_dict().ok())
    }

    fn number(&self, obj: &Object) -> Option<f32> {
        match self.resolve(obj)? {
            Object::Integer(i) => Some(*i as f32),
            Object::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Read `[x0 y0 x1 y1]` from a dictionary entry.
    fn rect_entry(&self, dict: &Dictionary, key: &[u8]) -> Option<[f32; 4]> {
        let array = self.resolve(dict.get(key).ok()?)?.as_array().ok()?;
        if array.len() < 4 {
            return None;
        }
        Some([
            self.number(&array[0])?,
            self.number(&array[1])?,
            self.number(&array[2])?,
            self.number(&array[3])?,
        ])
    }

    fn matrix_entry(&self, dict: &Dictionary, key: &[u8]) -> Option<[f32; 6]> {
        let array = self.resolve(dict.get(key).ok()?)?.as_array().ok()?;
        let values: Vec<f32> = array.iter().map(|v| self.number(v)).collect::<Option<_>>()?;
        values.try_into().ok()
    }

    /// Nearest `/Resources` up the page tree.
    fn page_resources(&self, page: PageId) -> Option<&Dictionary> {
        let mut current = self.doc.get_dictionary(page).ok();
        for _ in 0..=MAX_TREE_DEPTH {
            let dict = current?;
            let resources = dict.get(b"Resources").ok().and_then(|o| self.resolve_dict(o));
            if resources.is_some() {
                return resources;
            }
            current = dict.get(b"Parent").ok().and_then(|p| self.resolve_dict(p));
        }
        None
    }

    fn scope_resources(&self, scope: ResourceScope) -> Option<&Dictionary> {
        match scope {
            ResourceScope::Page(page) => self.page_resources(page),
            ResourceScope::Form(id) => {
                let stream = self.doc.get_object(id).ok()?.as_stream().ok()?;
                self.resolve_dict(stream.dict.get(b"Resources").ok()?)
            }
        }
    }

    fn page_font<'d>(&'d self, font_dict: &'d Dictionary) -> PageFont<'d> {
        let metrics = self.font_metrics(font_dict);
        let encoding = font_dict.get_font_encoding(&self.doc).ok();
        let decode = Box::new(move |bytes: &[u8]| {
            encoding
                .as_ref()
                .and_then(|enc| LopdfDocument::decode_text(enc, bytes).ok())
        });
        PageFont::new(metrics, decode)
    }

    /// Fonts listed in the `/Font` entry of a resource dictionary.
    fn resource_fonts<'d>(&'d self, resources: &'d Dictionary) -> PageFonts<'d> {
        let mut fonts = PageFonts::new();
        let font_dict = resources
            .get(b"Font")
            .ok()
            .and_then(|o| self.resolve_dict(o));
        let Some(font_dict) = font_dict else {
            return fonts;
        };
        for (name, entry) in font_dict.iter() {
            match self.resolve_dict(entry) {
                Some(font) => fonts.insert(name.clone(), self.page_font(font)),
                None => log::debug!(
                    "font /{} is not a dictionary",
                    String::from_utf8_lossy(name)
                ),
            }
        }
        fonts
    }

    fn font_metrics(&self, font: &Dictionary) -> FontMetrics {
        let base_font = font
            .get(b"BaseFont")
            .ok()
            .and_then(|o| o.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).to_string())
            .unwrap_or_else(|| "Unknown".to_string());

        let is_type0 = font
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name().ok())
            .is_some_and(|n| n == b"Type0");

        if is_type0 {
            let descendant = font
                .get(b"DescendantFonts")
                .ok()
                .and_then(|o| self.resolve(o))
                .and_then(|o| o.as_array().ok())
                .and_then(|arr| arr.first())
                .and_then(|o| self.resolve_dict(o));

            let (widths, default_width) = match descendant {
                Some(cid_font) => {
                    let default_width = cid_font
                        .get(b"DW")
                        .ok()
                        .and_then(|o| self.number(o))
                        .unwrap_or(1000.0);
                    let entries = cid_font
                        .get(b"W")
                        .ok()
                        .and_then(|o| self.resolve(o))
                        .and_then(|o| o.as_array().ok())
                        .map(|arr| self.width_entries(arr))
                        .unwrap_or_default();
                    (parse_cid_widths(&entries), default_width)
                }
                None => (HashMap::new(), 1000.0),
            };
            return FontMetrics::composite(base_font, widths, default_width);
        }

        let first_char = font
            .get(b"FirstChar")
            .ok()
            .and_then(|o| self.number(o))
            .unwrap_or(0.0) as u32;
        let widths = font
            .get(b"Widths")
            .ok()
            .and_then(|o| self.resolve(o))
            .and_then(|o| o.as_array().ok())
            .map(|arr| arr.iter().map(|w| self.number(w).unwrap_or(0.0)).collect())
            .unwrap_or_default();
        let missing_width = font
            .get(b"FontDescriptor")
            .ok()
            .and_then(|o| self.resolve_dict(o))
            .and_then(|d| d.get(b"MissingWidth").ok())
            .and_then(|o| self.number(o))
            .filter(|w| *w > 0.0)
            .unwrap_or(FALLBACK_WIDTH);

        FontMetrics::simple(base_font, first_char, widths).with_default_width(missing_width)
    }

    fn width_entries(&self, array: &[Object]) -> Vec<WidthEntry> {
        array
            .iter()
            .filter_map(|item| match self.resolve(item)? {
                Object::Array(inner) => Some(WidthEntry::Array(
                    inner.iter().map(|w| self.number(w).unwrap_or(0.0)).collect(),
                )),
                other => self.number(other).map(WidthEntry::Number),
            })
            .collect()
    }

    fn read_annotation(
        &self,
        page_num: u32,
        index: usize,
        dict: &Dictionary,
        page_box: &PageBox,
    ) -> Option<Annotation> {
        let subtype = match dict.get(b"Subtype").ok()? {
            Object::Name(name) => String::from_utf8_lossy(name).into_owned(),
            _ => return None,
        };
        let [x0, y0, x1, y1] = self.rect_entry(dict, b"Rect")?;
        let rect = page_box.rect_to_page_space(x0, y0, x1, y1);

        let mut annotation =
            Annotation::new(page_num, index, AnnotationKind::from_subtype(&subtype), rect);
        annotation.contents = get_string_from_dict(dict, b"Contents");
        annotation.author = get_string_from_dict(dict, b"T");
        annotation.modified = get_string_from_dict(dict, b"M").and_then(|m| parse_pdf_date(&m));
        Some(annotation)
    }
}

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn page_box(&self, page: PageId) -> PageBox {
        // MediaBox is inheritable: walk up the page tree until one is found.
        let mut current = self.doc.get_dictionary(page).ok();
        let mut depth = 0;
        while let Some(dict) = current {
            if let Some([x0, y0, x1, y1]) = self.rect_entry(dict, b"MediaBox") {
                let page_box = PageBox::new(x0, y0, x1, y1);
                if page_box.width() > 0.0 && page_box.height() > 0.0 {
                    return page_box;
                }
            }
            depth += 1;
            if depth > MAX_TREE_DEPTH {
                break;
            }
            current = dict.get(b"Parent").ok().and_then(|p| self.resolve_dict(p));
        }
        PageBox::letter()
    }

    fn page_annotations(&self, page_num: u32, page: PageId) -> Result<Vec<Annotation>> {
        let page_dict = self
            .doc
            .get_dictionary(page)
            .map_err(|e| Error::PdfParse(e.to_string()))?;

        let annots = match page_dict.get(b"Annots") {
            Ok(obj) => obj,
            Err(_) => return Ok(Vec::new()),
        };
        let annots = self
            .resolve(annots)
            .and_then(|o| o.as_array().ok())
            .ok_or_else(|| Error::PdfParse(format!("page {}: /Annots is not an array", page_num)))?;

        let page_box = self.page_box(page);
        let mut annotations = Vec::with_capacity(annots.len());

        for (index, entry) in annots.iter().enumerate() {
            let Some(dict) = self.resolve_dict(entry) else {
                log::warn!("page {}: skipping unresolvable annotation #{}", page_num, index);
                continue;
            };
            match self.read_annotation(page_num, index, dict, &page_box) {
                Some(annotation) => annotations.push(annotation),
                None => log::debug!(
                    "page {}: annotation #{} has no usable /Subtype or /Rect",
                    page_num,
                    index
                ),
            }
        }

        Ok(annotations)
    }

    fn page_fonts(&self, page: PageId) -> Result<PageFonts<'_>> {
        let lopdf_fonts = self
            .doc
            .get_page_fonts(page)
            .map_err(|e| Error::PdfParse(e.to_string()))?;

        let mut fonts = PageFonts::new();
        for (name, font_dict) in lopdf_fonts {
            fonts.insert(name, self.page_font(font_dict));
        }
        Ok(fonts)
    }

    fn page_content(&self, page_id: PageId) -> Result<Vec<u8>> {
        let page_dict = self
            .doc
            .get_dictionary(page_id)
            .map_err(|e| Error::PdfParse(e.to_string()))?;

        let contents = match page_dict.get(b"Contents") {
            Ok(contents) => contents,
            // A page without content streams is blank, not broken.
            Err(_) => return Ok(Vec::new()),
        };

        match contents {
            Object::Reference(r) => match self.doc.get_object(*r) {
                Ok(Object::Stream(s)) => Ok(s
                    .decompressed_content()
                    .unwrap_or_else(|_| s.content.clone())),
                Ok(Object::Array(arr)) => Ok(self.concat_streams(arr)),
                _ => Err(Error::PdfParse("Invalid content stream".to_string())),
            },
            Object::Array(arr) => Ok(self.concat_streams(arr)),
            _ => Err(Error::PdfParse("Invalid content stream".to_string())),
        }
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>> {
        let content =
            lopdf::content::Content::decode(data).map_err(|e| Error::PdfParse(e.to_string()))?;

        Ok(content
            .operations
            .into_iter()
            .map(|op| ContentOp {
                operator: op.operator,
                operands: op.operands.iter().map(convert_object).collect(),
            })
            .collect())
    }

    fn form_xobject(&self, scope: ResourceScope, name: &[u8]) -> Result<Option<FormXObject<'_>>> {
        let Some(xobjects) = self
            .scope_resources(scope)
            .and_then(|res| res.get(b"XObject").ok())
            .and_then(|o| self.resolve_dict(o))
        else {
            return Ok(None);
        };
        let Ok(Object::Reference(id)) = xobjects.get(name) else {
            return Ok(None);
        };

        let stream = self
            .doc
            .get_object(*id)
            .and_then(|o| o.as_stream())
            .map_err(|e| {
                Error::PdfParse(format!("XObject /{}: {}", String::from_utf8_lossy(name), e))
            })?;
        let is_form = stream
            .dict
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name().ok())
            .is_some_and(|n| n == b"Form");
        if !is_form {
            return Ok(None);
        }

        let own_resources = stream
            .dict
            .get(b"Resources")
            .ok()
            .and_then(|o| self.resolve_dict(o));
        let (scope, fonts) = match own_resources {
            Some(resources) => (ResourceScope::Form(*id), Some(self.resource_fonts(resources))),
            None => (scope, None),
        };
        let data = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());

        Ok(Some(FormXObject {
            scope,
            matrix: self.matrix_entry(&stream.dict, b"Matrix"),
            fonts,
            operations: self.decode_content(&data)?,
        }))
    }
}

impl LopdfBackend {
    fn concat_streams(&self, refs: &[Object]) -> Vec<u8> {
        let mut content = Vec::new();
        for obj in refs {
            if let Object::Reference(r) = obj {
                if let Ok(Object::Stream(s)) = self.doc.get_object(*r) {
                    let data = s
                        .decompressed_content()
                        .unwrap_or_else(|_| s.content.clone());
                    content.extend_from_slice(&data);
                    content.push(b' ');
                }
            }
        }
        content
    }
}

/// Convert a `lopdf::Object` to [`PdfValue`].
fn convert_object(obj: &Object) -> PdfValue {
    match obj {
        Object::Integer(i) => PdfValue::Integer(*i),
        Object::Real(r) => PdfValue::Real(*r),
        Object::Name(n) => PdfValue::Name(n.clone()),
        Object::String(b, _) => PdfValue::Str(b.clone()),
        Object::Array(arr) => PdfValue::Array(arr.iter().map(convert_object).collect()),
        _ => PdfValue::Other,
    }
}

/// Helper to get a text string from a PDF dictionary.
fn get_string_from_dict(dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key).ok()? {
        Object::String(bytes, _) => {
            // PDF text strings are UTF-16BE with a BOM or PDFDocEncoding.
            if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
                let utf16: Vec<u16> = bytes[2..]
                    .chunks_exact(2)
                    .map(|c| u16::from_be_bytes([c[0], c[1]]))
                    .collect();
                String::from_utf16(&utf16).ok()
            } else {
                Some(
                    String::from_utf8(bytes.clone())
                        .unwrap_or_else(|_| bytes.iter().map(|&b| b as char).collect()),
                )
            }
        }
        Object::Name(bytes) => String::from_utf8(bytes.clone()).ok(),
        _ => None,
    }
}
