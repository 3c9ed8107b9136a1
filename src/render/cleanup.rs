//! Text cleanup pipeline for extracted fragments.
//!
//! PDF text clipped from a highlight often carries layout artifacts: ligature
//! glyphs, words hyphenated across lines, hard line breaks inside a sentence
//! and runs of spaces from justified text. The pipeline normalises these so
//! the fragment reads as prose.

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Cleanup preset levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CleanupPreset {
    /// Unicode NFC normalization and whitespace collapsing only
    Minimal,
    /// Minimal + ligatures, hyphenation, line merging
    #[default]
    Standard,
}

impl std::str::FromStr for CleanupPreset {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minimal" => Ok(CleanupPreset::Minimal),
            "standard" => Ok(CleanupPreset::Standard),
            other => Err(crate::error::Error::Config(format!(
                "unknown cleanup preset '{}'",
                other
            ))),
        }
    }
}

/// Options for text cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupOptions {
    /// Normalize Unicode to NFC form
    pub normalize_unicode: bool,

    /// Fix ligatures (fi, fl, etc.)
    pub fix_ligatures: bool,

    /// Join words hyphenated at line breaks
    pub fix_hyphenation: bool,

    /// Remove Unicode replacement character (U+FFFD)
    pub remove_replacement_char: bool,

    /// Merge line breaks inside a fragment into spaces
    pub merge_newlines: bool,

    /// Collapse runs of spaces and tabs, trim each line
    pub normalize_whitespace: bool,
}

impl CleanupOptions {
    /// Create options from a preset.
    pub fn from_preset(preset: CleanupPreset) -> Self {
        match preset {
            CleanupPreset::Minimal => Self::minimal(),
            CleanupPreset::Standard => Self::standard(),
        }
    }

    /// Minimal cleanup options.
    pub fn minimal() -> Self {
        Self {
            normalize_unicode: true,
            fix_ligatures: false,
            fix_hyphenation: false,
            remove_replacement_char: false,
            merge_newlines: false,
            normalize_whitespace: true,
        }
    }

    /// Standard cleanup options.
    pub fn standard() -> Self {
        Self {
            normalize_unicode: true,
            fix_ligatures: true,
            fix_hyphenation: true,
            remove_replacement_char: true,
            merge_newlines: true,
            normalize_whitespace: true,
        }
    }
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self::standard()
    }
}

const LIGATURES: [(&str, &str); 7] = [
    ("\u{FB00}", "ff"),
    ("\u{FB01}", "fi"),
    ("\u{FB02}", "fl"),
    ("\u{FB03}", "ffi"),
    ("\u{FB04}", "ffl"),
    ("\u{FB05}", "st"),
    ("\u{FB06}", "st"),
];

/// Text cleanup pipeline.
#[derive(Debug, Clone)]
pub struct CleanupPipeline {
    options: CleanupOptions,
    hyphenation: Option<Regex>,
}

impl CleanupPipeline {
    /// Create a new cleanup pipeline with the given options.
    pub fn new(options: CleanupOptions) -> Self {
        // "sponta-\nneous", "sponta- neous" → "spontaneous"
        let hyphenation = Regex::new(r"(\p{L})-(?:[ \t]*\n[ \t]*|[ \t]+)(\p{Ll})").ok();
        Self {
            options,
            hyphenation,
        }
    }

    /// Create a pipeline from a preset.
    pub fn from_preset(preset: CleanupPreset) -> Self {
        Self::new(CleanupOptions::from_preset(preset))
    }

    pub fn options(&self) -> &CleanupOptions {
        &self.options
    }

    /// Process text through the cleanup pipeline.
    pub fn process(&self, text: &str) -> String {
        let mut result = text.to_string();

        if self.options.normalize_unicode {
            result = result.nfc().collect();
        }

        if self.options.fix_ligatures {
            for (ligature, replacement) in LIGATURES {
                result = result.replace(ligature, replacement);
            }
        }

        if self.options.remove_replacement_char {
            result = result.replace('\u{FFFD}', "");
        }

        // Must run before newline merging, which would hide the break.
        if self.options.fix_hyphenation {
            if let Some(re) = &self.hyphenation {
                result = re.replace_all(&result, "$1$2").into_owned();
            }
        }

        if self.options.merge_newlines {
            result = merge_newlines(&result);
        }

        if self.options.normalize_whitespace {
            result = normalize_whitespace(&result);
        }

        result.trim().to_string()
    }
}

impl Default for CleanupPipeline {
    fn default() -> Self {
        Self::new(CleanupOptions::default())
    }
}

/// Replace line breaks with a space, or with nothing between two CJK
/// characters and after a line-final hyphen.
fn merge_newlines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

    if let Some(first) = lines.next() {
        out.push_str(first);
    }
    for line in lines {
        let joins_cjk = matches!(
            (out.chars().last(), line.chars().next()),
            (Some(a), Some(b)) if is_cjk(a) && is_cjk(b)
        );
        if !joins_cjk && !out.ends_with('-') {
            out.push(' ');
        }
        out.push_str(line);
    }
    out
}

fn normalize_whitespace(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x3040..=0x30FF | 0x3400..=0x4DBF | 0x4E00..=0x9FFF | 0xF900..=0xFAFF)
}
