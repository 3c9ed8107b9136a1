//! JSON rendering for extracted fragments.

use crate::error::{Error, Result};
use crate::model::Fragment;

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Serialize fragments as a JSON array.
pub fn to_json(fragments: &[Fragment], format: JsonFormat) -> Result<String> {
    let result = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(fragments),
        JsonFormat::Compact => serde_json::to_string(fragments),
    };

    result.map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
}
