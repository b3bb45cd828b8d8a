//! Format converters: each walks a parsed document and emits Markdown.
//!
//! Every converter shares one state machine: resolve the source, parse it
//! with the format's document model, walk the structure emitting Markdown
//! fragments in document order, then write the file and assemble the
//! result. Errors never escape a converter; they fold into a failure
//! [`ConversionResult`] at the boundary.

pub mod auto;
pub mod docx;
mod ooxml;
pub mod pdf;
pub mod pptx;

pub use auto::{convert_auto, detect_format, DocFormat};

use crate::error::Result;
use crate::markdown::{count_words, generate_frontmatter};
use crate::model::{ConversionMetadata, ConversionRequest, ConversionResult};
use crate::source::{resolve_output, write_markdown, ResolvedSource};

/// A rendered document body plus the counts gathered while walking it.
pub(crate) struct Rendered {
    pub body: String,
    pub format: &'static str,
    pub pages: Option<usize>,
    pub slides: Option<usize>,
    pub image_count: usize,
    pub warnings: Vec<String>,
}

/// Shared tail of every converter: frontmatter, output resolution, write,
/// and result assembly.
pub(crate) fn finish(
    req: &ConversionRequest,
    source: &ResolvedSource,
    source_name: &str,
    rendered: Rendered,
) -> Result<ConversionResult> {
    let word_count = count_words(&rendered.body);
    let frontmatter = generate_frontmatter(
        source_name,
        rendered.format,
        rendered.pages,
        rendered.slides,
        word_count,
        &rendered.warnings,
    );
    let content = format!("{frontmatter}\n{}\n", rendered.body);

    let output_path = resolve_output(
        source_name,
        source.path(),
        req.output_dir.as_deref(),
        req.output_file_name.as_deref(),
        req.overwrite,
        source.from_base64(),
    )?;
    write_markdown(&output_path, &content)?;

    let metadata = ConversionMetadata {
        source_format: rendered.format.to_string(),
        page_count: rendered.pages,
        slide_count: rendered.slides,
        word_count,
        has_images: rendered.image_count > 0,
        image_count: rendered.image_count,
        conversion_warnings: rendered.warnings,
    };

    Ok(ConversionResult::success(
        output_path.display().to_string(),
        output_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        source_name.to_string(),
        metadata,
    ))
}
