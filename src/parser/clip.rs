//! Text clipping: collect the glyphs inside a region and join them into text.

use crate::model::Rect;

use super::content::Glyph;

/// Gap (as a fraction of the font size) above which a space is inserted.
const WORD_GAP_RATIO: f32 = 0.2;

/// Baseline shift (as a fraction of the font size) that starts a new line.
const LINE_SHIFT_RATIO: f32 = 0.5;

/// Text of all glyphs whose box overlaps `region`, in content-stream order.
///
/// The result is not trimmed.
pub fn clip_text(glyphs: &[Glyph], region: &Rect) -> String {
    let mut out = String::new();
    let mut prev: Option<&Glyph> = None;

    for glyph in glyphs.iter().filter(|g| g.bbox.intersects(region)) {
        if let Some(p) = prev {
            if let Some(sep) = separator(p, glyph) {
                if !out.ends_with(char::is_whitespace) {
                    out.push(sep);
                }
            }
        }
        out.push_str(&glyph.text);
        prev = Some(glyph);
    }

    out
}

/// Separator to insert between two consecutive captured glyphs.
fn separator(prev: &Glyph, next: &Glyph) -> Option<char> {
    let size = prev.size.max(next.size).max(f32::EPSILON);

    let baseline_shift = (next.origin.1 - prev.origin.1).abs();
    let pen_back = next.origin.0 < prev.origin.0 - LINE_SHIFT_RATIO * size;
    if baseline_shift > LINE_SHIFT_RATIO * size || pen_back {
        return Some('\n');
    }

    if prev.is_whitespace() || next.is_whitespace() {
        return None;
    }

    let gap = next.origin.0 - prev.end.0;
    if gap > WORD_GAP_RATIO * size && !both_spaceless(prev, next) {
        return Some(' ');
    }
    None
}

fn both_spaceless(prev: &Glyph, next: &Glyph) -> bool {
    let last = prev.text.chars().last();
    let first = next.text.chars().next();
    match (last, first) {
        (Some(a), Some(b)) => is_spaceless_script_char(a) && is_spaceless_script_char(b),
        _ => false,
    }
}

/// Scripts written without inter-word spaces (Chinese, Japanese).
fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;

    // CJK Unified Ideographs
    (0x4E00..=0x9FFF).contains(&code)
    // Extension A
    || (0x3400..=0x4DBF).contains(&code)
    // Extensions B-F
    || (0x20000..=0x2EBEF).contains(&code)
    // Hiragana
    || (0x3040..=0x309F).contains(&code)
    // Katakana
    || (0x30A0..=0x30FF).contains(&code)
    // CJK Symbols and Punctuation
    || (0x3000..=0x303F).contains(&code)
    // Hangul is excluded: Korean separates words with spaces.
}
