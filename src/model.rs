//! Request and result types for document conversions.
//!
//! These are plain in-memory structs; the JSON wire shape is hand-built at
//! the tool boundary in [`crate::convert`].

/// Input to a single conversion. Exactly one source mode must be present:
/// a local `file_path`, or a `base64_content` payload with its declared
/// `file_name`. When both are supplied, `file_path` wins.
#[derive(Debug, Clone, Default)]
pub struct ConversionRequest {
    /// Path to a local source file.
    pub file_path: Option<String>,
    /// Base64-encoded file content, for sources not directly accessible.
    pub base64_content: Option<String>,
    /// Declared file name for base64 content (extension drives detection).
    pub file_name: Option<String>,
    /// Directory to write the output into. Defaults to the source file's
    /// directory, or the current directory for base64 input.
    pub output_dir: Option<String>,
    /// Output file name. `.md` is appended when missing. Defaults to the
    /// source name with its extension replaced.
    pub output_file_name: Option<String>,
    /// Overwrite an existing output file instead of suffixing a timestamp.
    pub overwrite: bool,
}

impl ConversionRequest {
    /// Request for a local file path, all output options defaulted.
    pub fn from_path(file_path: impl Into<String>) -> Self {
        ConversionRequest {
            file_path: Some(file_path.into()),
            ..Default::default()
        }
    }

    /// The name used to identify this source in results and error messages.
    pub fn source_label(&self) -> String {
        self.file_name
            .clone()
            .or_else(|| self.file_path.clone())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Metadata about a completed conversion.
#[derive(Debug, Clone, Default)]
pub struct ConversionMetadata {
    /// Format tag: "pdf", "docx", or "pptx".
    pub source_format: String,
    /// Page count, for paged formats.
    pub page_count: Option<usize>,
    /// Slide count, for presentations.
    pub slide_count: Option<usize>,
    /// Whitespace-delimited word count of the body text.
    pub word_count: usize,
    /// Whether any images were detected.
    pub has_images: bool,
    /// Number of images detected.
    pub image_count: usize,
    /// Non-fatal warnings gathered during conversion, in document order.
    pub conversion_warnings: Vec<String>,
}

/// Outcome of a single conversion.
///
/// `success == true` iff `output_path` is set and `error` is unset;
/// `success == false` iff `error` is set and `output_path` is unset.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    /// Whether the conversion succeeded.
    pub success: bool,
    /// Absolute path of the written Markdown file, on success.
    pub output_path: Option<String>,
    /// Base name of the written Markdown file, on success.
    pub file_name: Option<String>,
    /// Identifier of the source document.
    pub source_file: String,
    /// Conversion metadata, on success.
    pub metadata: Option<ConversionMetadata>,
    /// Error message, on failure.
    pub error: Option<String>,
}

impl ConversionResult {
    /// Successful conversion result.
    pub fn success(
        output_path: String,
        file_name: String,
        source_file: String,
        metadata: ConversionMetadata,
    ) -> Self {
        ConversionResult {
            success: true,
            output_path: Some(output_path),
            file_name: Some(file_name),
            source_file,
            metadata: Some(metadata),
            error: None,
        }
    }

    /// Failed conversion result carrying the error message.
    pub fn failure(source_file: String, error: String) -> Self {
        ConversionResult {
            success: false,
            output_path: None,
            file_name: None,
            source_file,
            metadata: None,
            error: Some(error),
        }
    }
}

/// Outcome of a batch conversion: one result per input, in input order.
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// Per-file results, ordered as the inputs were given.
    pub results: Vec<ConversionResult>,
    /// Number of inputs.
    pub total: usize,
    /// Number of successful conversions.
    pub successful: usize,
    /// Number of failed conversions.
    pub failed: usize,
}
