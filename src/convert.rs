//! Conversion between in-memory result types and MCP JSON payloads.
//!
//! Result objects are hand-assembled with `serde_json::json!` so the wire
//! shape stays explicit in one place. Absent optional fields serialize as
//! JSON null. The argument helpers pull typed values out of tool-call
//! arguments with a uniform MissingArg/InvalidArg contract.

use serde_json::{Map, Value as JsonValue};

use crate::error::{McpError, Result};
use crate::model::{BatchResult, ConversionMetadata, ConversionResult};

/// Convert a conversion result to its JSON wire shape.
pub fn result_to_json(result: &ConversionResult) -> JsonValue {
    serde_json::json!({
        "success": result.success,
        "output_path": result.output_path,
        "file_name": result.file_name,
        "source_file": result.source_file,
        "metadata": result.metadata.as_ref().map(metadata_to_json),
        "error": result.error,
    })
}

/// Convert conversion metadata to JSON.
pub fn metadata_to_json(metadata: &ConversionMetadata) -> JsonValue {
    serde_json::json!({
        "source_format": metadata.source_format,
        "page_count": metadata.page_count,
        "slide_count": metadata.slide_count,
        "word_count": metadata.word_count,
        "has_images": metadata.has_images,
        "image_count": metadata.image_count,
        "conversion_warnings": metadata.conversion_warnings,
    })
}

/// Convert a batch result to JSON.
pub fn batch_to_json(batch: &BatchResult) -> JsonValue {
    serde_json::json!({
        "results": batch.results.iter().map(result_to_json).collect::<Vec<_>>(),
        "total": batch.total,
        "successful": batch.successful,
        "failed": batch.failed,
    })
}

/// Helper to get an optional string argument from JSON arguments.
pub fn get_optional_string(args: &Map<String, JsonValue>, name: &str) -> Option<String> {
    args.get(name).and_then(|v| v.as_str()).map(|s| s.to_string())
}

/// Helper to get an optional boolean argument.
pub fn get_optional_bool(args: &Map<String, JsonValue>, name: &str) -> Option<bool> {
    args.get(name).and_then(|v| v.as_bool())
}

/// Helper to get a required array-of-strings argument.
pub fn get_string_array_arg(args: &Map<String, JsonValue>, name: &str) -> Result<Vec<String>> {
    let arr = args
        .get(name)
        .and_then(|v| v.as_array())
        .ok_or_else(|| McpError::MissingArg(name.to_string()))?;

    arr.iter()
        .map(|v| {
            v.as_str().map(|s| s.to_string()).ok_or_else(|| McpError::InvalidArg {
                name: name.to_string(),
                reason: "Expected array of strings".to_string(),
            })
        })
        .collect()
}
