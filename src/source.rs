//! Source resolution and output-path policy.
//!
//! Every tool accepts either a local `file_path` or a `base64_content` +
//! `file_name` pair. Decoded payloads are written into a fresh `TempDir`
//! owned by the returned [`ResolvedSource`], so the scratch file disappears
//! when the value drops, on the success and failure paths alike.

use crate::error::{McpError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::info;

/// The resolved source document, local or decoded from base64.
#[derive(Debug)]
pub enum ResolvedSource {
    /// Input was an existing local file.
    Local(PathBuf),
    /// Input was decoded from base64 into a temp directory.
    /// The `TempDir` is kept alive until conversion completes.
    Decoded { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedSource {
    /// Path to the source file regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedSource::Local(p) => p,
            ResolvedSource::Decoded { path, .. } => path,
        }
    }

    /// Whether the source came in as base64 content.
    pub fn from_base64(&self) -> bool {
        matches!(self, ResolvedSource::Decoded { .. })
    }
}

/// Resolve the source document from a path or a base64 payload.
///
/// Returns the resolved source and its base name. `file_path` takes
/// precedence when both modes are supplied.
pub fn resolve_source(
    file_path: Option<&str>,
    base64_content: Option<&str>,
    file_name: Option<&str>,
) -> Result<(ResolvedSource, String)> {
    if let Some(fp) = file_path.filter(|s| !s.is_empty()) {
        let path = PathBuf::from(fp);
        if !path.exists() {
            return Err(McpError::SourceNotFound {
                path: fp.to_string(),
            });
        }
        if !path.is_file() {
            return Err(McpError::SourceNotAFile {
                path: fp.to_string(),
            });
        }
        let path = path.canonicalize()?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| fp.to_string());
        return Ok((ResolvedSource::Local(path), name));
    }

    let content = base64_content.filter(|s| !s.is_empty());
    let name = file_name.filter(|s| !s.is_empty());
    if let (Some(content), Some(name)) = (content, name) {
        // Tolerate line-wrapped payloads.
        let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let data = STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| McpError::InvalidEncoding {
                reason: e.to_string(),
            })?;
        let temp_dir = tempfile::Builder::new().prefix("doc2md_").tempdir()?;
        let path = temp_dir.path().join(name);
        std::fs::write(&path, &data)?;
        return Ok((
            ResolvedSource::Decoded {
                path,
                _temp_dir: temp_dir,
            },
            name.to_string(),
        ));
    }

    Err(McpError::InvalidRequest)
}

/// Resolve where the Markdown output should be written.
///
/// The directory defaults to the source file's directory, or the current
/// directory for base64 input. The name defaults to the source's stem with
/// a `.md` extension. When the target exists and `overwrite` is false, an
/// epoch-seconds suffix keeps the write non-clobbering.
pub fn resolve_output(
    source_name: &str,
    source_path: &Path,
    output_dir: Option<&str>,
    output_file_name: Option<&str>,
    overwrite: bool,
    from_base64: bool,
) -> Result<PathBuf> {
    let out_dir = if let Some(dir) = output_dir.filter(|s| !s.is_empty()) {
        PathBuf::from(dir)
    } else if from_base64 {
        std::env::current_dir()?
    } else {
        source_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    };

    if !out_dir.exists() {
        return Err(McpError::DirectoryMissing { path: out_dir });
    }
    let out_dir = out_dir.canonicalize()?;
    if std::fs::metadata(&out_dir)?.permissions().readonly() {
        return Err(McpError::DirectoryNotWritable { path: out_dir });
    }

    let md_name = match output_file_name.filter(|s| !s.is_empty()) {
        Some(name) if name.ends_with(".md") => name.to_string(),
        Some(name) => format!("{name}.md"),
        None => {
            let stem = Path::new(source_name)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| source_name.to_string());
            format!("{stem}.md")
        }
    };

    let mut out_path = out_dir.join(&md_name);
    if out_path.exists() && !overwrite {
        let stem = out_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let timestamp = chrono::Utc::now().timestamp();
        out_path = out_dir.join(format!("{stem}_{timestamp}.md"));
    }

    Ok(out_path)
}

/// Write the Markdown document as UTF-8.
pub fn write_markdown(output_path: &Path, content: &str) -> Result<()> {
    std::fs::write(output_path, content)?;
    info!("Wrote markdown to {}", output_path.display());
    Ok(())
}
