//! Rendering module for turning fragments into text or JSON.

mod cleanup;
mod json;
mod text;

pub use cleanup::{CleanupOptions, CleanupPipeline, CleanupPreset};
pub use json::{to_json, JsonFormat};
pub use text::{raw_text, to_text, TextOptions, DEFAULT_PAGE_LABEL};
