//! Font metrics and character-code decoding for glyph positioning.

use std::collections::HashMap;

/// Advance width used when a font gives no usable width for a code
/// (thousandths of an em).
pub const FALLBACK_WIDTH: f32 = 500.0;

/// Width information for one font, in glyph space (1/1000 em).
#[derive(Debug, Clone)]
pub struct FontMetrics {
    /// Base font name (e.g., "Helvetica-Bold")
    pub base_font: String,
    /// Bytes per character code: 1 for simple fonts, 2 for Type0 fonts
    pub code_len: usize,
    first_char: u32,
    widths: Vec<f32>,
    cid_widths: HashMap<u32, f32>,
    default_width: f32,
}

impl FontMetrics {
    /// Metrics for a simple (single-byte) font.
    pub fn simple(base_font: impl Into<String>, first_char: u32, widths: Vec<f32>) -> Self {
        Self {
            base_font: base_font.into(),
            code_len: 1,
            first_char,
            widths,
            cid_widths: HashMap::new(),
            default_width: FALLBACK_WIDTH,
        }
    }

    /// Metrics for a composite (two-byte) font.
    pub fn composite(
        base_font: impl Into<String>,
        cid_widths: HashMap<u32, f32>,
        default_width: f32,
    ) -> Self {
        Self {
            base_font: base_font.into(),
            code_len: 2,
            first_char: 0,
            widths: Vec::new(),
            cid_widths,
            default_width,
        }
    }

    /// Override the width used for codes outside the width table.
    pub fn with_default_width(mut self, width: f32) -> Self {
        self.default_width = width;
        self
    }

    /// Advance width of a character code, in 1/1000 em.
    pub fn width(&self, code: u32) -> f32 {
        let width = if self.code_len == 1 {
            code.checked_sub(self.first_char)
                .and_then(|i| self.widths.get(i as usize))
                .copied()
        } else {
            self.cid_widths.get(&code).copied()
        };
        match width {
            Some(w) if w > 0.0 => w,
            _ => self.default_width,
        }
    }

    /// Split a shown string into character codes.
    pub fn codes<'b>(&self, bytes: &'b [u8]) -> impl Iterator<Item = (u32, &'b [u8])> {
        bytes.chunks(self.code_len.max(1)).map(|chunk| {
            let code = chunk.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32);
            (code, chunk)
        })
    }
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self::simple("Unknown", 0, Vec::new())
    }
}

/// One element of a CID font `/W` array.
#[derive(Debug, Clone, PartialEq)]
pub enum WidthEntry {
    Number(f32),
    Array(Vec<f32>),
}

/// Parse a CID font `/W` array into a code → width map.
///
/// Two forms are allowed: `c [w1 w2 ...]` and `c_first c_last w`.
pub fn parse_cid_widths(entries: &[WidthEntry]) -> HashMap<u32, f32> {
    let mut map = HashMap::new();
    let mut i = 0;
    while i < entries.len() {
        let WidthEntry::Number(start) = entries[i] else {
            i += 1;
            continue;
        };
        let start = cid_code(start);
        match (entries.get(i + 1), entries.get(i + 2)) {
            (Some(WidthEntry::Array(list)), _) => {
                if let Some(start) = start {
                    for (offset, w) in list.iter().enumerate() {
                        let code = u32::try_from(offset)
                            .ok()
                            .and_then(|offset| start.checked_add(offset));
                        let Some(code) = code else {
                            break;
                        };
                        map.insert(code, *w);
                    }
                }
                i += 2;
            }
            (Some(WidthEntry::Number(end)), Some(WidthEntry::Number(w))) => {
                if let (Some(start), Some(end)) = (start, cid_code(*end)) {
                    let end = end.min(start.saturating_add(0xFFFF));
                    for code in start..=end {
                        map.insert(code, *w);
                    }
                }
                i += 3;
            }
            _ => break,
        }
    }
    map
}

/// A `/W` number as a CID, rejecting negative and non-finite values.
fn cid_code(value: f32) -> Option<u32> {
    (value.is_finite() && value >= 0.0 && value <= u32::MAX as f32).then(|| value as u32)
}

type DecodeFn<'a> = Box<dyn Fn(&[u8]) -> Option<String> + 'a>;

/// A font resource on a page: metrics plus its code-to-text decoder.
pub struct PageFont<'a> {
    pub metrics: FontMetrics,
    decode: DecodeFn<'a>,
}

impl<'a> PageFont<'a> {
    pub fn new(metrics: FontMetrics, decode: DecodeFn<'a>) -> Self {
        Self { metrics, decode }
    }

    /// A font decoded with [`decode_text_simple`].
    pub fn plain(metrics: FontMetrics) -> Self {
        Self::new(metrics, Box::new(|bytes| Some(decode_text_simple(bytes))))
    }

    /// Decode one character code, falling back to simple decoding.
    pub fn decode(&self, code_bytes: &[u8]) -> String {
        (self.decode)(code_bytes).unwrap_or_else(|| decode_text_simple(code_bytes))
    }
}

impl std::fmt::Debug for PageFont<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageFont")
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

/// All font resources of one page, keyed by resource name (e.g. `F1`).
#[derive(Debug, Default)]
pub struct PageFonts<'a> {
    fonts: HashMap<Vec<u8>, PageFont<'a>>,
}

impl<'a> PageFonts<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<Vec<u8>>, font: PageFont<'a>) {
        self.fonts.insert(name.into(), font);
    }

    pub fn get(&self, name: &[u8]) -> Option<&PageFont<'a>> {
        self.fonts.get(name)
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}

/// Simple text decoding fallback when no encoding is available.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    // Try UTF-16BE first (BOM marker)
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks(2)
            .filter_map(|c| {
                if c.len() == 2 {
                    Some(u16::from_be_bytes([c[0], c[1]]))
                } else {
                    None
                }
            })
            .collect();
        return String::from_utf16(&utf16).unwrap_or_default();
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Fallback: Latin-1
    bytes.iter().map(|&b| b as char).collect()
}
