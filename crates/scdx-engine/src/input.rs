//! Desired snapshot input
//!
//! A snapshot is either a JSON array of objects or newline-delimited JSON
//! (one object per line, blank lines ignored).

#![allow(clippy::result_large_err)]

use scdx_core::errors::{ExError, ExErrorKind};
use scdx_core::DesiredEntry;
use serde_json::Value;
use std::path::Path;

/// Parse a desired snapshot from text
///
/// # Errors
///
/// - `InvalidInput`: the text is not valid JSON / NDJSON
/// - `Serialization`: an element is not a JSON object
pub fn parse_desired(text: &str) -> Result<Vec<DesiredEntry>, ExError> {
    let values: Vec<Value> = if text.trim_start().starts_with('[') {
        serde_json::from_str(text).map_err(|e| invalid_input(format!("Invalid JSON array: {}", e)))?
    } else {
        // Line numbers count every physical line, blank ones included
        text.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str(line)
                    .map_err(|e| invalid_input(format!("Invalid JSON on line {}: {}", n + 1, e)))
            })
            .collect::<Result<_, _>>()?
    };

    values
        .into_iter()
        .enumerate()
        .map(|(position, value)| {
            DesiredEntry::from_value(value, position)
                .map_err(|e| ExError::from(e).with_op("parse_desired"))
        })
        .collect()
}

/// Read and parse a desired snapshot file
///
/// # Errors
///
/// `Io` when the file cannot be read, otherwise as [`parse_desired`].
pub fn load_desired(path: &Path) -> Result<Vec<DesiredEntry>, ExError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        ExError::new(ExErrorKind::Io)
            .with_op("load_desired")
            .with_message(format!("Cannot read {}: {}", path.display(), e))
    })?;
    parse_desired(&text)
}

fn invalid_input(message: String) -> ExError {
    ExError::new(ExErrorKind::InvalidInput)
        .with_op("parse_desired")
        .with_message(message)
}
