//! Error types for the doc2md MCP server.
//!
//! A single [`McpError`] enum covers every failure mode, from input
//! resolution through document parsing to tool dispatch. Converters catch
//! these at their boundary and fold them into a failure
//! [`crate::ConversionResult`]; only the tool-dispatch variants ever reach
//! the JSON-RPC layer, where they become error payloads rather than faults.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the doc2md MCP server.
#[derive(Debug, Error)]
pub enum McpError {
    // ── Source resolution ─────────────────────────────────────────────────
    /// The given source path does not exist.
    #[error("Source file not found: {path}")]
    SourceNotFound { path: String },

    /// The given source path exists but is not a regular file.
    #[error("Source path is not a file: {path}")]
    SourceNotAFile { path: String },

    /// base64_content could not be decoded.
    #[error("Invalid base64 content: {reason}")]
    InvalidEncoding { reason: String },

    /// Neither a file path nor a complete base64 payload was supplied.
    #[error("Must provide either 'file_path' or both 'base64_content' and 'file_name'")]
    InvalidRequest,

    // ── Output resolution ─────────────────────────────────────────────────
    /// The requested output directory does not exist.
    #[error("Output directory does not exist: {}", path.display())]
    DirectoryMissing { path: PathBuf },

    /// The requested output directory is not writable.
    #[error("Output directory is not writable: {}", path.display())]
    DirectoryNotWritable { path: PathBuf },

    // ── Conversion ────────────────────────────────────────────────────────
    /// Auto-detection could not determine a supported format.
    #[error("Unsupported file type. Supported formats: PDF, DOCX, PPTX. File: {file}")]
    UnsupportedFormat { file: String },

    /// The document model rejected the file. Message passed through verbatim.
    #[error("{0}")]
    ParseFailure(String),

    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    // ── Tool dispatch ─────────────────────────────────────────────────────
    /// Tool name not in the registry.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Required argument missing.
    #[error("Missing required argument: {0}")]
    MissingArg(String),

    /// Invalid argument value.
    #[error("Invalid argument '{name}': {reason}")]
    InvalidArg { name: String, reason: String },

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<lopdf::Error> for McpError {
    fn from(e: lopdf::Error) -> Self {
        McpError::ParseFailure(e.to_string())
    }
}

impl From<zip::result::ZipError> for McpError {
    fn from(e: zip::result::ZipError) -> Self {
        McpError::ParseFailure(e.to_string())
    }
}

impl From<quick_xml::Error> for McpError {
    fn from(e: quick_xml::Error) -> Self {
        McpError::ParseFailure(e.to_string())
    }
}

/// Result type for MCP operations.
pub type Result<T> = std::result::Result<T, McpError>;
