//! Format detection and routing for the auto-convert tool.

use std::path::Path;

use tracing::debug;

use crate::converters::{docx, pdf, pptx};
use crate::error::McpError;
use crate::model::{ConversionRequest, ConversionResult};

/// Document formats this crate can convert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocFormat {
    /// Portable Document Format.
    Pdf,
    /// Word `.docx` (OOXML) documents.
    Docx,
    /// PowerPoint `.pptx` (OOXML) presentations.
    Pptx,
}

fn format_for_mime(mime: &str) -> Option<DocFormat> {
    match mime {
        "application/pdf" => Some(DocFormat::Pdf),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
            Some(DocFormat::Docx)
        }
        "application/vnd.openxmlformats-officedocument.presentationml.presentation" => {
            Some(DocFormat::Pptx)
        }
        _ => None,
    }
}

fn format_for_extension(ext: &str) -> Option<DocFormat> {
    match ext {
        "pdf" => Some(DocFormat::Pdf),
        "docx" => Some(DocFormat::Docx),
        "pptx" => Some(DocFormat::Pptx),
        _ => None,
    }
}

/// Detect the document format from an explicit MIME type, the file
/// extension, or a MIME guess from the name, in that order.
pub fn detect_format(
    file_path: Option<&str>,
    file_name: Option<&str>,
    mime_type: Option<&str>,
) -> Option<DocFormat> {
    if let Some(format) = mime_type.and_then(format_for_mime) {
        return Some(format);
    }

    let name = file_name.or(file_path)?;
    if let Some(format) = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .and_then(|e| format_for_extension(&e))
    {
        return Some(format);
    }

    mime_guess::from_path(name)
        .first()
        .and_then(|m| format_for_mime(m.essence_str()))
}

/// Detect the format and hand off to the matching converter. Detection
/// failure yields a failed result, not an error.
pub fn convert_auto(req: &ConversionRequest, mime_type: Option<&str>) -> ConversionResult {
    match detect_format(req.file_path.as_deref(), req.file_name.as_deref(), mime_type) {
        Some(format) => {
            debug!("Detected {format:?} for {}", req.source_label());
            match format {
                DocFormat::Pdf => pdf::convert(req),
                DocFormat::Docx => docx::convert(req),
                DocFormat::Pptx => pptx::convert(req),
            }
        }
        None => {
            let source = req.source_label();
            let err = McpError::UnsupportedFormat {
                file: source.clone(),
            };
            ConversionResult::failure(source, err.to_string())
        }
    }
}
