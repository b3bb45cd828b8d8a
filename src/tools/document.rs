//! Document conversion tools.
//!
//! Five tools share one argument convention: a source given as `file_path`
//! or as `base64_content` + `file_name`, plus optional output controls
//! (`output_dir`, `output_file_name`, `overwrite`). Handlers fold converter
//! failures into the returned JSON (`success: false`) instead of erroring,
//! so a bad document never looks like a protocol fault.

use serde_json::{Map, Value as JsonValue};

use crate::batch;
use crate::convert::{
    batch_to_json, get_optional_bool, get_optional_string, get_string_array_arg, result_to_json,
};
use crate::converters::{self, convert_auto};
use crate::error::{McpError, Result};
use crate::model::ConversionRequest;
use crate::schema;
use crate::tools::ToolDef;

const SOURCE_HINT: &str = "Provide file_path for local files, or base64_content plus file_name \
     when the file is not directly accessible (e.g. in Docker or sandboxed environments).";

/// The 5 document conversion tool definitions.
pub fn tools() -> Vec<ToolDef> {
    vec![
        ToolDef::new(
            "convert_pdf_to_markdown",
            &format!(
                "Convert a PDF file to Markdown and write it to disk. Extracts text page by \
                 page with page markers, detects column-aligned text as tables, and flags \
                 scanned pages with no extractable text. {SOURCE_HINT}"
            ),
            schema!(object {
                optional: {
                    "file_path": string,
                    "base64_content": string,
                    "file_name": string,
                    "output_dir": string,
                    "output_file_name": string,
                    "overwrite": boolean
                }
            }),
        ),
        ToolDef::new(
            "convert_docx_to_markdown",
            &format!(
                "Convert a Word DOCX file to Markdown and write it to disk. Preserves \
                 headings, bold/italic/strikethrough formatting, tables, lists, hyperlinks, \
                 footnotes, and comments. {SOURCE_HINT}"
            ),
            schema!(object {
                optional: {
                    "file_path": string,
                    "base64_content": string,
                    "file_name": string,
                    "output_dir": string,
                    "output_file_name": string,
                    "overwrite": boolean
                }
            }),
        ),
        ToolDef::new(
            "convert_pptx_to_markdown",
            &format!(
                "Convert a PowerPoint PPTX file to Markdown and write it to disk. Each slide \
                 becomes an H2 section with its title, body text, tables, image placeholders, \
                 and speaker notes. {SOURCE_HINT}"
            ),
            schema!(object {
                optional: {
                    "file_path": string,
                    "base64_content": string,
                    "file_name": string,
                    "output_dir": string,
                    "output_file_name": string,
                    "overwrite": boolean
                }
            }),
        ),
        ToolDef::new(
            "convert_auto",
            &format!(
                "Convert a document to Markdown with automatic format detection (PDF, DOCX, \
                 or PPTX). Detection uses the optional mime_type hint first, then the file \
                 extension, then a MIME guess from the name. {SOURCE_HINT}"
            ),
            schema!(object {
                optional: {
                    "file_path": string,
                    "base64_content": string,
                    "file_name": string,
                    "mime_type": string,
                    "output_dir": string,
                    "output_file_name": string,
                    "overwrite": boolean
                }
            }),
        ),
        ToolDef::new(
            "batch_convert",
            "Convert multiple documents to Markdown in one call, auto-detecting each file's \
             format from its path. Individual failures are reported in their result entry \
             and do not stop the batch.",
            schema!(object {
                required: { "file_paths": array_string },
                optional: {
                    "output_dir": string,
                    "overwrite": boolean
                }
            }),
        ),
    ]
}

/// Dispatch a document tool call to its handler.
pub fn dispatch(name: &str, args: Map<String, JsonValue>) -> Result<JsonValue> {
    match name {
        "convert_pdf_to_markdown" => dispatch_pdf(&args),
        "convert_docx_to_markdown" => dispatch_docx(&args),
        "convert_pptx_to_markdown" => dispatch_pptx(&args),
        "convert_auto" => dispatch_auto(&args),
        "batch_convert" => dispatch_batch(&args),
        _ => Err(McpError::UnknownTool(name.to_string())),
    }
}

fn request_from_args(args: &Map<String, JsonValue>) -> ConversionRequest {
    ConversionRequest {
        file_path: get_optional_string(args, "file_path"),
        base64_content: get_optional_string(args, "base64_content"),
        file_name: get_optional_string(args, "file_name"),
        output_dir: get_optional_string(args, "output_dir"),
        output_file_name: get_optional_string(args, "output_file_name"),
        overwrite: get_optional_bool(args, "overwrite").unwrap_or(false),
    }
}

// ── Per-format converters ────────────────────────────────────────────────

fn dispatch_pdf(args: &Map<String, JsonValue>) -> Result<JsonValue> {
    let req = request_from_args(args);
    Ok(result_to_json(&converters::pdf::convert(&req)))
}

fn dispatch_docx(args: &Map<String, JsonValue>) -> Result<JsonValue> {
    let req = request_from_args(args);
    Ok(result_to_json(&converters::docx::convert(&req)))
}

fn dispatch_pptx(args: &Map<String, JsonValue>) -> Result<JsonValue> {
    let req = request_from_args(args);
    Ok(result_to_json(&converters::pptx::convert(&req)))
}

// ── Auto-detect and batch ────────────────────────────────────────────────

fn dispatch_auto(args: &Map<String, JsonValue>) -> Result<JsonValue> {
    let req = request_from_args(args);
    let mime_type = get_optional_string(args, "mime_type");
    Ok(result_to_json(&convert_auto(&req, mime_type.as_deref())))
}

fn dispatch_batch(args: &Map<String, JsonValue>) -> Result<JsonValue> {
    let file_paths = get_string_array_arg(args, "file_paths")?;
    let output_dir = get_optional_string(args, "output_dir");
    let overwrite = get_optional_bool(args, "overwrite").unwrap_or(false);
    let batch = batch::run(&file_paths, output_dir.as_deref(), overwrite);
    Ok(batch_to_json(&batch))
}
