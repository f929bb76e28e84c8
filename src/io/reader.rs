use std::io::Read;

use serde_json::Value;

use crate::io::format::{json, yaml};
use crate::io::{Format, IoError};

/// Reads a single document as a JSON value tree.
pub fn read_value<R: Read>(reader: R, format: Format) -> Result<Value, IoError> {
    match format {
        Format::Json => json::read_json(reader),
        Format::Yaml => yaml::read_yaml(reader),
    }
}
