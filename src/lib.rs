//! # doc2md-mcp
//!
//! MCP (Model Context Protocol) server that converts PDF, DOCX, and PPTX
//! documents to Markdown files on disk.
//!
//! This crate implements the MCP protocol over stdin/stdout using JSON-RPC 2.0
//! and exposes 5 conversion tools for AI agents:
//!
//! `convert_pdf_to_markdown`, `convert_docx_to_markdown`,
//! `convert_pptx_to_markdown`, `convert_auto`, `batch_convert`
//!
//! Every tool accepts a local `file_path` or a `base64_content` + `file_name`
//! pair, writes the converted Markdown next to the source (or into an explicit
//! `output_dir`), and returns a JSON result with the output path and document
//! metadata (page/slide counts, word count, images, warnings).
//!
//! ## Usage
//!
//! The server is typically run as an executable and configured in AI tools like
//! Claude Desktop:
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "doc2md": {
//!       "command": "/path/to/doc2md-mcp"
//!     }
//!   }
//! }
//! ```
//!
//! ## Library Usage
//!
//! For testing or embedding, you can use the library API:
//!
//! ```no_run
//! use doc2md_mcp::{convert_auto, ConversionRequest};
//!
//! let req = ConversionRequest::from_path("/path/to/report.pdf");
//! let result = convert_auto(&req, None);
//! if result.success {
//!     println!("wrote {}", result.output_path.unwrap());
//! }
//! ```

#![warn(missing_docs)]

mod batch;
mod convert;
mod converters;
mod error;
mod markdown;
mod model;
mod server;
mod source;
mod tools;

pub use convert::{batch_to_json, result_to_json};
pub use converters::{convert_auto, detect_format, DocFormat};
pub use error::{McpError, Result};
pub use model::{BatchResult, ConversionMetadata, ConversionRequest, ConversionResult};
pub use server::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, McpServer};
pub use tools::{ToolDef, ToolRegistry};
