//! DOCX to Markdown conversion.
//!
//! `word/document.xml` is parsed into a sequence of body blocks
//! (paragraphs and tables in document order), which are then rendered:
//! run formatting maps to Markdown emphasis, heading styles to ATX
//! headings, numbering properties to list items with per-list counters,
//! hyperlinks to inline links. Embedded images, comments, and footnotes
//! are appended after the body. Sub-extractions (styles, rels, comments,
//! footnotes, images) degrade to empty on failure; only the document part
//! itself is required.

use std::collections::HashMap;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, error};

use crate::converters::ooxml::{
    self, get_attribute, open_archive, parse_relationships, read_binary_part, read_optional_part,
    read_part, Archive, Relationship,
};
use crate::converters::{finish, Rendered};
use crate::error::Result;
use crate::markdown::{clean_text, format_table};
use crate::model::{ConversionRequest, ConversionResult};
use crate::source::resolve_source;

/// Convert a DOCX to Markdown on disk.
pub fn convert(req: &ConversionRequest) -> ConversionResult {
    match convert_inner(req) {
        Ok(result) => result,
        Err(e) => {
            error!("DOCX conversion failed: {e}");
            ConversionResult::failure(req.source_label(), e.to_string())
        }
    }
}

fn convert_inner(req: &ConversionRequest) -> Result<ConversionResult> {
    let (source, source_name) = resolve_source(
        req.file_path.as_deref(),
        req.base64_content.as_deref(),
        req.file_name.as_deref(),
    )?;

    let mut archive = open_archive(source.path())?;

    let styles = match read_optional_part(&mut archive, "word/styles.xml") {
        Some(xml) => match parse_styles(&xml) {
            Ok(map) => map,
            Err(e) => {
                debug!("Style resolution failed: {e}");
                HashMap::new()
            }
        },
        None => HashMap::new(),
    };

    let rels = match read_optional_part(&mut archive, "word/_rels/document.xml.rels") {
        Some(xml) => match parse_relationships(&xml) {
            Ok(rels) => rels,
            Err(e) => {
                debug!("Relationship parsing failed: {e}");
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    let document_xml = read_part(&mut archive, "word/document.xml")?;
    let parsed = parse_document(&document_xml, &rels)?;

    let mut sections = render_blocks(&parsed.blocks, &styles);

    let (image_placeholders, image_count) = extract_images(&mut archive, &rels);
    if !image_placeholders.is_empty() {
        sections.push("\n## Embedded Images\n".to_string());
        sections.extend(image_placeholders);
    }

    let comments = match read_optional_part(&mut archive, "word/comments.xml") {
        Some(xml) => match parse_comments(&xml) {
            Ok(comments) => comments,
            Err(e) => {
                debug!("Comment extraction failed: {e}");
                Vec::new()
            }
        },
        None => Vec::new(),
    };
    if !comments.is_empty() {
        sections.push(String::new());
        sections.extend(comments);
    }

    let footnotes = match read_optional_part(&mut archive, "word/footnotes.xml") {
        Some(xml) => match parse_footnotes(&xml) {
            Ok(footnotes) => footnotes,
            Err(e) => {
                debug!("Footnote extraction failed: {e}");
                Vec::new()
            }
        },
        None => Vec::new(),
    };
    if !footnotes.is_empty() {
        sections.push("\n## Footnotes\n".to_string());
        for (id, text) in &footnotes {
            sections.push(format!("[^{id}]: {text}"));
        }
    }

    let mut body = sections.join("\n\n");
    // Collapse runs of blank lines left by consecutive empty paragraphs.
    while body.contains("\n\n\n\n") {
        body = body.replace("\n\n\n\n", "\n\n\n");
    }

    finish(
        req,
        &source,
        &source_name,
        Rendered {
            body,
            format: "docx",
            pages: Some(parsed.section_count),
            slides: None,
            image_count,
            warnings: Vec::new(),
        },
    )
}

// ── Document model ───────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct DocRun {
    text: String,
    bold: bool,
    italic: bool,
    strike: bool,
    font: Option<String>,
    link: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct Numbering {
    num_id: String,
    level: usize,
}

#[derive(Debug, Default)]
struct DocParagraph {
    style_id: Option<String>,
    numbering: Option<Numbering>,
    runs: Vec<DocRun>,
}

#[derive(Debug)]
enum BodyBlock {
    Paragraph(DocParagraph),
    Table(Vec<Vec<String>>),
}

struct ParsedDocument {
    blocks: Vec<BodyBlock>,
    section_count: usize,
}

// ── Parsing ──────────────────────────────────────────────────────────────

fn parse_document(xml: &str, rels: &[Relationship]) -> Result<ParsedDocument> {
    let mut reader = Reader::from_reader(xml.as_bytes());
    let mut buf = Vec::new();

    let mut blocks: Vec<BodyBlock> = Vec::new();
    let mut section_count = 0usize;

    let mut paragraph = DocParagraph::default();
    let mut run = DocRun::default();
    let mut in_paragraph = false;
    let mut in_run = false;
    let mut in_text = false;
    let mut in_ppr = false;
    let mut in_rpr = false;
    let mut link: Option<String> = None;

    // Table cell text is collected one nesting level deep; deeper tables
    // are skipped, matching the flat cell-text model of the renderer.
    let mut table_depth = 0usize;
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell_paragraphs: Vec<String> = Vec::new();
    let mut cell_text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"tbl" => {
                    table_depth += 1;
                    if table_depth == 1 {
                        rows.clear();
                    }
                }
                b"tr" if table_depth == 1 => row.clear(),
                b"tc" if table_depth == 1 => cell_paragraphs.clear(),
                b"p" => {
                    if table_depth == 0 {
                        in_paragraph = true;
                        paragraph = DocParagraph::default();
                    } else if table_depth == 1 {
                        cell_text.clear();
                    }
                }
                b"r" => {
                    in_run = true;
                    if table_depth == 0 {
                        run = DocRun {
                            link: link.clone(),
                            ..DocRun::default()
                        };
                    }
                }
                b"t" => in_text = true,
                b"pPr" => in_ppr = true,
                b"rPr" if in_run => in_rpr = true,
                b"hyperlink" if table_depth == 0 => {
                    link = get_attribute(e, "id").and_then(|rid| {
                        rels.iter().find(|r| r.id == rid).map(|r| r.target.clone())
                    });
                }
                b"sectPr" => section_count += 1,
                _ => {
                    if table_depth == 0 && in_run && in_rpr {
                        apply_run_property(e, &mut run);
                    } else if table_depth == 0 && in_paragraph && in_ppr {
                        apply_paragraph_property(e, &mut paragraph);
                    }
                }
            },
            Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"p" => {
                    if table_depth == 0 {
                        blocks.push(BodyBlock::Paragraph(DocParagraph::default()));
                    } else if table_depth == 1 {
                        cell_paragraphs.push(String::new());
                    }
                }
                b"br" | b"cr" => {
                    if in_run {
                        if table_depth == 0 {
                            run.text.push('\n');
                        } else if table_depth == 1 {
                            cell_text.push('\n');
                        }
                    }
                }
                b"tab" => {
                    if in_run {
                        if table_depth == 0 {
                            run.text.push('\t');
                        } else if table_depth == 1 {
                            cell_text.push('\t');
                        }
                    }
                }
                b"sectPr" => section_count += 1,
                _ => {
                    if table_depth == 0 && in_run && in_rpr {
                        apply_run_property(e, &mut run);
                    } else if table_depth == 0 && in_paragraph && in_ppr {
                        apply_paragraph_property(e, &mut paragraph);
                    }
                }
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"tbl" => {
                    if table_depth == 1 {
                        blocks.push(BodyBlock::Table(std::mem::take(&mut rows)));
                    }
                    table_depth = table_depth.saturating_sub(1);
                }
                b"tr" if table_depth == 1 => rows.push(std::mem::take(&mut row)),
                b"tc" if table_depth == 1 => {
                    row.push(cell_paragraphs.join("\n"));
                    cell_paragraphs.clear();
                }
                b"p" => {
                    if table_depth == 0 && in_paragraph {
                        in_paragraph = false;
                        blocks.push(BodyBlock::Paragraph(std::mem::take(&mut paragraph)));
                    } else if table_depth == 1 {
                        cell_paragraphs.push(std::mem::take(&mut cell_text));
                    }
                }
                b"r" => {
                    in_run = false;
                    if table_depth == 0 && !run.text.is_empty() {
                        paragraph.runs.push(std::mem::take(&mut run));
                    }
                }
                b"t" => in_text = false,
                b"pPr" => in_ppr = false,
                b"rPr" => in_rpr = false,
                b"hyperlink" => link = None,
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_text && in_run {
                    let content = e.unescape().unwrap_or_default();
                    if table_depth == 0 {
                        run.text.push_str(&content);
                    } else if table_depth == 1 {
                        cell_text.push_str(&content);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }

    Ok(ParsedDocument {
        blocks,
        section_count,
    })
}

fn apply_run_property(e: &BytesStart, run: &mut DocRun) {
    match e.local_name().as_ref() {
        b"b" => run.bold = flag_value(e),
        b"i" => run.italic = flag_value(e),
        b"strike" => run.strike = flag_value(e),
        b"rFonts" => {
            run.font = get_attribute(e, "ascii").or_else(|| get_attribute(e, "hAnsi"));
        }
        _ => {}
    }
}

fn apply_paragraph_property(e: &BytesStart, paragraph: &mut DocParagraph) {
    match e.local_name().as_ref() {
        b"pStyle" => paragraph.style_id = get_attribute(e, "val"),
        b"numPr" => {
            paragraph.numbering = Some(Numbering {
                num_id: "0".to_string(),
                level: 0,
            });
        }
        b"ilvl" => {
            if let (Some(num), Some(val)) = (paragraph.numbering.as_mut(), get_attribute(e, "val"))
            {
                num.level = val.parse().unwrap_or(0);
            }
        }
        b"numId" => {
            if let (Some(num), Some(val)) = (paragraph.numbering.as_mut(), get_attribute(e, "val"))
            {
                num.num_id = val;
            }
        }
        _ => {}
    }
}

/// OOXML on/off flags: present means on unless val says otherwise.
fn flag_value(e: &BytesStart) -> bool {
    !matches!(get_attribute(e, "val").as_deref(), Some("0") | Some("false"))
}

fn parse_styles(xml: &str) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_reader(xml.as_bytes());
    let mut buf = Vec::new();
    let mut map = HashMap::new();
    let mut current_id: Option<String> = None;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"style" => current_id = get_attribute(e, "styleId"),
                b"name" => {
                    if let (Some(id), Some(val)) = (current_id.as_ref(), get_attribute(e, "val")) {
                        map.insert(id.clone(), normalize_style_name(val));
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"style" => current_id = None,
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }
    Ok(map)
}

/// Word stores built-in heading style names lowercase ("heading 1");
/// surface them the way the UI shows them.
fn normalize_style_name(name: String) -> String {
    if let Some(rest) = name.strip_prefix("heading ") {
        if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
            return format!("Heading {rest}");
        }
    }
    name
}

fn parse_comments(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_reader(xml.as_bytes());
    let mut buf = Vec::new();
    let mut comments = Vec::new();
    let mut in_comment = false;
    let mut in_text = false;
    let mut author = String::new();
    let mut text = String::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"comment" => {
                    in_comment = true;
                    author = get_attribute(e, "author").unwrap_or_else(|| "Unknown".to_string());
                    text.clear();
                }
                b"t" if in_comment => in_text = true,
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"comment" => {
                    in_comment = false;
                    if !text.is_empty() {
                        comments.push(format!("<!-- Comment ({author}): {text} -->"));
                    }
                }
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_comment && in_text {
                    text.push_str(&e.unescape().unwrap_or_default());
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }
    Ok(comments)
}

/// Footnotes in document order. Separator footnotes carry non-positive
/// ids and are skipped.
fn parse_footnotes(xml: &str) -> Result<Vec<(String, String)>> {
    let mut reader = Reader::from_reader(xml.as_bytes());
    let mut buf = Vec::new();
    let mut footnotes = Vec::new();
    let mut current_id: Option<String> = None;
    let mut in_text = false;
    let mut text = String::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"footnote" => {
                    current_id = get_attribute(e, "id")
                        .filter(|id| id.parse::<i64>().map_or(false, |n| n > 0));
                    text.clear();
                }
                b"t" if current_id.is_some() => in_text = true,
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"footnote" => {
                    if let Some(id) = current_id.take() {
                        if !text.is_empty() {
                            footnotes.push((id, std::mem::take(&mut text)));
                        }
                    }
                }
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if current_id.is_some() && in_text {
                    text.push_str(&e.unescape().unwrap_or_default());
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }
    Ok(footnotes)
}

// ── Rendering ────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq, Hash, Clone)]
enum ListKey {
    Numbering { num_id: String, level: usize },
    Style(String),
}

#[derive(Debug, Default)]
struct ListCounters(HashMap<ListKey, usize>);

impl ListCounters {
    fn next(&mut self, key: ListKey) -> usize {
        let n = self.0.entry(key).or_insert(0);
        *n += 1;
        *n
    }
}

fn render_blocks(blocks: &[BodyBlock], styles: &HashMap<String, String>) -> Vec<String> {
    let mut sections: Vec<String> = Vec::new();
    let mut counters = ListCounters::default();
    for block in blocks {
        match block {
            BodyBlock::Paragraph(paragraph) => {
                let md = render_paragraph(paragraph, styles, &mut counters);
                if !md.is_empty() {
                    sections.push(md);
                } else if sections.last().is_some_and(|s| !s.is_empty()) {
                    // one blank-line marker per run of empty paragraphs
                    sections.push(String::new());
                }
            }
            BodyBlock::Table(rows) => {
                let md = render_table(rows);
                if !md.is_empty() {
                    sections.push(md);
                }
            }
        }
    }
    sections
}

fn render_paragraph(
    paragraph: &DocParagraph,
    styles: &HashMap<String, String>,
    counters: &mut ListCounters,
) -> String {
    let style_name = match &paragraph.style_id {
        Some(id) => styles.get(id).cloned().unwrap_or_else(|| id.clone()),
        None => String::new(),
    };

    let mut text = String::new();
    let mut i = 0;
    while i < paragraph.runs.len() {
        let run = &paragraph.runs[i];
        match &run.link {
            Some(url) => {
                // consecutive runs of one hyperlink render as a single link
                let mut anchor = String::new();
                while i < paragraph.runs.len()
                    && paragraph.runs[i].link.as_deref() == Some(url.as_str())
                {
                    anchor.push_str(&paragraph.runs[i].text);
                    i += 1;
                }
                text.push_str(&format!("[{anchor}]({url})"));
            }
            None => {
                text.push_str(&format_run(run));
                i += 1;
            }
        }
    }
    let text = text.trim().to_string();
    if text.is_empty() {
        return String::new();
    }

    if style_name.starts_with("Heading") {
        let level = heading_level(&style_name);
        return format!("{} {text}", "#".repeat(level));
    }

    if let Some(num) = &paragraph.numbering {
        let indent = "  ".repeat(num.level);
        let ordered = style_name.contains("List Number") || !style_name.contains("List Bullet");
        if ordered {
            let n = counters.next(ListKey::Numbering {
                num_id: num.num_id.clone(),
                level: num.level,
            });
            return format!("{indent}{n}. {text}");
        }
        return format!("{indent}- {text}");
    }

    if style_name.contains("List Bullet") {
        return format!("- {text}");
    }
    if style_name.contains("List Number") {
        let n = counters.next(ListKey::Style(style_name));
        return format!("{n}. {text}");
    }

    text
}

fn format_run(run: &DocRun) -> String {
    if run.text.is_empty() {
        return String::new();
    }
    let mut text = run.text.clone();
    if run.bold {
        text = format!("**{text}**");
    }
    if run.italic {
        text = format!("*{text}*");
    }
    if run.strike {
        text = format!("~~{text}~~");
    }
    let monospace = run
        .font
        .as_deref()
        .is_some_and(|f| f.to_lowercase().contains("courier"));
    if monospace {
        text = format!("`{text}`");
    }
    text
}

fn heading_level(style_name: &str) -> usize {
    let digits: String = style_name
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(1).min(6)
}

fn render_table(rows: &[Vec<String>]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    let headers: Vec<String> = rows[0].iter().map(|c| clean_text(c.trim())).collect();
    let body: Vec<Vec<String>> = rows[1..]
        .iter()
        .map(|r| r.iter().map(|c| clean_text(c.trim())).collect())
        .collect();
    format_table(&headers, &body, None)
}

fn extract_images(archive: &mut Archive, rels: &[Relationship]) -> (Vec<String>, usize) {
    let mut placeholders = Vec::new();
    let mut count = 0usize;
    for rel in rels.iter().filter(|r| r.rel_type.contains("image")) {
        count += 1;
        let ext = Path::new(&rel.target)
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        let part = ooxml::resolve_target("word", &rel.target);
        match read_binary_part(archive, &part) {
            Ok(data) => {
                if matches!(
                    ext.as_str(),
                    "png" | "jpg" | "jpeg" | "gif" | "bmp" | "svg"
                ) {
                    let encoded = STANDARD.encode(&data);
                    placeholders.push(format!(
                        "![embedded image {count}](data:image/{ext};base64,{encoded})"
                    ));
                } else {
                    placeholders.push(format!("![embedded image {count}](image_{count}.{ext})"));
                }
            }
            Err(e) => {
                debug!("Image read failed for {part}: {e}");
                placeholders.push(format!("![embedded image {count}](image_{count}.png)"));
            }
        }
    }
    (placeholders, count)
}
