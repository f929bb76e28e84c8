pub mod error;
pub mod format;
pub mod reader;
pub mod response;

use std::path::Path;

pub use error::IoError;
pub use response::{DecodeError, HttpResponse, ResponseParseError};

/// Rules file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

/// Picks the rules format from the file extension.
pub fn resolve_input_format(input: &Path) -> Result<Format, IoError> {
    format_from_path(input).ok_or_else(|| IoError::UnsupportedPathExtension {
        path: input.to_string_lossy().into_owned(),
    })
}

fn format_from_path(path: &Path) -> Option<Format> {
    let ext = path.extension()?.to_string_lossy().to_ascii_lowercase();
    match ext.as_str() {
        "json" => Some(Format::Json),
        "yaml" | "yml" => Some(Format::Yaml),
        _ => None,
    }
}
