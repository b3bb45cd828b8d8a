//! Shared Markdown assembly helpers: tables, frontmatter, text cleanup.
//!
//! Every converter funnels its output through these so that tables, word
//! counts, and the frontmatter block render identically across formats.

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;

/// Column alignment for [`format_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
}

/// Two-or-more spaces: the column gap separator for layout-based table
/// detection in PDF text.
static COLUMN_GAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

/// Split a text line into columns on runs of 2+ whitespace characters.
pub(crate) fn split_columns(line: &str) -> Vec<&str> {
    COLUMN_GAP.split(line.trim()).filter(|s| !s.is_empty()).collect()
}

/// Generate the YAML frontmatter block prefixed to every converted document.
///
/// Keys appear in a fixed order; `pages`/`slides` are emitted only when
/// present, `word_count` only when nonzero, `warnings` only when non-empty.
pub fn generate_frontmatter(
    source: &str,
    format: &str,
    pages: Option<usize>,
    slides: Option<usize>,
    word_count: usize,
    warnings: &[String],
) -> String {
    let mut out = String::from("---\n");
    out.push_str(&format!("source: {source}\n"));
    out.push_str(&format!("format: {format}\n"));
    out.push_str(&format!(
        "converted: {}\n",
        Utc::now().format("%Y-%m-%dT%H:%M:%SZ")
    ));
    if let Some(pages) = pages {
        out.push_str(&format!("pages: {pages}\n"));
    }
    if let Some(slides) = slides {
        out.push_str(&format!("slides: {slides}\n"));
    }
    if word_count > 0 {
        out.push_str(&format!("word_count: {word_count}\n"));
    }
    if !warnings.is_empty() {
        out.push_str("warnings:\n");
        for w in warnings {
            out.push_str(&format!("- {w}\n"));
        }
    }
    out.push_str("---\n");
    out
}

/// Render a table as pipe-delimited Markdown.
///
/// The column count comes from `headers`, or from the first row when no
/// headers are given (header cells are then empty). Rows are padded and
/// truncated to the column count; literal `|` in cells is escaped.
pub fn format_table(
    headers: &[String],
    rows: &[Vec<String>],
    alignments: Option<&[Alignment]>,
) -> String {
    if headers.is_empty() && rows.is_empty() {
        return String::new();
    }
    let num_cols = if headers.is_empty() {
        rows.first().map_or(0, |r| r.len())
    } else {
        headers.len()
    };
    if num_cols == 0 {
        return String::new();
    }

    let escape = |cell: &str| cell.replace('|', "\\|");

    let mut sep: Vec<&str> = match alignments {
        Some(aligns) => aligns
            .iter()
            .take(num_cols)
            .map(|a| match a {
                Alignment::Center => ":---:",
                Alignment::Right => "---:",
                Alignment::Left => "---",
            })
            .collect(),
        None => Vec::new(),
    };
    while sep.len() < num_cols {
        sep.push("---");
    }

    let header_cells: Vec<String> = (0..num_cols)
        .map(|i| headers.get(i).map(|h| escape(h)).unwrap_or_default())
        .collect();

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(format!("| {} |", header_cells.join(" | ")));
    lines.push(format!("| {} |", sep.join(" | ")));
    for row in rows {
        let cells: Vec<String> = (0..num_cols)
            .map(|i| row.get(i).map(|c| escape(c)).unwrap_or_default())
            .collect();
        lines.push(format!("| {} |", cells.join(" | ")));
    }
    lines.join("\n")
}

/// Drop control characters, keeping newlines and tabs. Everything at or
/// above U+0020 passes through unchanged.
pub fn clean_text(text: &str) -> String {
    text.chars()
        .filter(|&c| c == '\n' || c == '\t' || c as u32 >= 32)
        .collect()
}

/// Count whitespace-delimited words.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}
