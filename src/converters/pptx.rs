//! PPTX to Markdown conversion.
//!
//! Slides are discovered by scanning the archive for `ppt/slides/slideN.xml`
//! parts and ordering them numerically. Each slide renders as an H2 section:
//! the title placeholder (idx 0) becomes part of the heading, remaining
//! shapes contribute text lines, tables, image placeholders, and chart
//! markers, and speaker notes are appended as a blockquote. One image
//! counter runs across the whole deck so placeholder names stay unique.

use once_cell::sync::Lazy;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use tracing::{debug, error};

use crate::converters::ooxml::{
    get_attribute, open_archive, parse_relationships, read_optional_part, read_part,
    resolve_target, Archive,
};
use crate::converters::{finish, Rendered};
use crate::error::Result;
use crate::markdown::{clean_text, format_table};
use crate::model::{ConversionRequest, ConversionResult};
use crate::source::resolve_source;

static SLIDE_PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ppt/slides/slide(\d+)\.xml$").unwrap());

/// Convert a PPTX to Markdown on disk.
pub fn convert(req: &ConversionRequest) -> ConversionResult {
    match convert_inner(req) {
        Ok(result) => result,
        Err(e) => {
            error!("PPTX conversion failed: {e}");
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

    let slide_parts = discover_slides(&archive);
    let slide_count = slide_parts.len();

    let mut counter = ImageCounter::default();
    let mut sections: Vec<String> = Vec::new();
    for (idx, (_, part)) in slide_parts.iter().enumerate() {
        let xml = read_part(&mut archive, part)?;
        let blocks = parse_slide(&xml)?;
        let notes = slide_notes(&mut archive, part);
        sections.push(render_slide(idx + 1, &blocks, notes.as_deref(), &mut counter));
    }

    let body = sections.join("\n\n");

    finish(
        req,
        &source,
        &source_name,
        Rendered {
            body,
            format: "pptx",
            pages: None,
            slides: Some(slide_count),
            image_count: counter.0,
            warnings: Vec::new(),
        },
    )
}

/// Slide parts in deck order. File numbering can be sparse after slide
/// deletions, so display numbers come from the sorted position.
fn discover_slides(archive: &Archive) -> Vec<(usize, String)> {
    let mut slides: Vec<(usize, String)> = archive
        .file_names()
        .filter_map(|name| {
            let caps = SLIDE_PART.captures(name)?;
            let num = caps[1].parse().ok()?;
            Some((num, name.to_string()))
        })
        .collect();
    slides.sort_by_key(|(num, _)| *num);
    slides
}

fn slide_notes(archive: &mut Archive, slide_part: &str) -> Option<String> {
    let file_name = slide_part.rsplit('/').next()?;
    let rels_part = format!("ppt/slides/_rels/{file_name}.rels");
    let rels_xml = read_optional_part(archive, &rels_part)?;
    let rels = match parse_relationships(&rels_xml) {
        Ok(rels) => rels,
        Err(e) => {
            debug!("Slide rels parsing failed for {rels_part}: {e}");
            return None;
        }
    };
    let target = rels
        .iter()
        .find(|r| r.rel_type.ends_with("notesSlide"))
        .map(|r| r.target.clone())?;
    let part = resolve_target("ppt/slides", &target);
    let xml = read_optional_part(archive, &part)?;
    let blocks = match parse_slide(&xml) {
        Ok(blocks) => blocks,
        Err(e) => {
            debug!("Notes slide parsing failed for {part}: {e}");
            return None;
        }
    };
    for block in blocks {
        if let SlideBlock::Text(frame) = block {
            if frame.ph_type.as_deref() == Some("body") {
                let text = frame.full_text();
                let text = text.trim();
                if text.is_empty() {
                    return None;
                }
                return Some(text.to_string());
            }
        }
    }
    None
}

// ── Slide model ──────────────────────────────────────────────────────────

#[derive(Debug)]
enum SlideBlock {
    Text(TextFrame),
    Table(Vec<Vec<String>>),
    Image { name: Option<String> },
    Chart { name: Option<String> },
    Group(Vec<SlideBlock>),
}

#[derive(Debug, Default)]
struct TextFrame {
    is_title_placeholder: bool,
    ph_type: Option<String>,
    paragraphs: Vec<SlideParagraph>,
}

impl TextFrame {
    fn full_text(&self) -> String {
        self.paragraphs
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Default)]
struct SlideParagraph {
    level: usize,
    text: String,
}

#[derive(Debug, Default)]
struct ImageCounter(usize);

// ── Parsing ──────────────────────────────────────────────────────────────

fn parse_slide(xml: &str) -> Result<Vec<SlideBlock>> {
    let mut reader = Reader::from_reader(xml.as_bytes());
    let mut buf = Vec::new();
    let mut blocks = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"sp" => {
                    if let Some(block) = parse_shape(&mut reader)? {
                        blocks.push(block);
                    }
                }
                b"pic" => blocks.push(parse_picture(&mut reader)?),
                b"graphicFrame" => {
                    if let Some(block) = parse_graphic_frame(&mut reader)? {
                        blocks.push(block);
                    }
                }
                b"grpSp" => blocks.push(SlideBlock::Group(parse_group(&mut reader)?)),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(blocks)
}

/// Consumes events through the matching `</p:sp>`.
fn parse_shape(reader: &mut Reader<&[u8]>) -> Result<Option<SlideBlock>> {
    let mut buf = Vec::new();
    let mut depth = 1usize;
    let mut frame = TextFrame::default();
    let mut has_text_body = false;
    let mut paragraph = SlideParagraph::default();
    let mut in_paragraph = false;
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                depth += 1;
                match e.local_name().as_ref() {
                    b"txBody" => has_text_body = true,
                    b"ph" => apply_placeholder(e, &mut frame),
                    b"p" if has_text_body => {
                        in_paragraph = true;
                        paragraph = SlideParagraph::default();
                    }
                    b"pPr" if in_paragraph => apply_level(e, &mut paragraph),
                    b"t" => in_text = true,
                    _ => {}
                }
            }
            Event::Empty(ref e) => match e.local_name().as_ref() {
                b"ph" => apply_placeholder(e, &mut frame),
                b"pPr" if in_paragraph => apply_level(e, &mut paragraph),
                b"br" if in_paragraph => paragraph.text.push('\n'),
                _ => {}
            },
            Event::End(ref e) => {
                match e.local_name().as_ref() {
                    b"p" if in_paragraph => {
                        in_paragraph = false;
                        frame.paragraphs.push(std::mem::take(&mut paragraph));
                    }
                    b"t" => in_text = false,
                    _ => {}
                }
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            Event::Text(e) => {
                if in_text && in_paragraph {
                    paragraph.text.push_str(&e.unescape().unwrap_or_default());
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if has_text_body {
        Ok(Some(SlideBlock::Text(frame)))
    } else {
        Ok(None)
    }
}

fn apply_placeholder(e: &BytesStart, frame: &mut TextFrame) {
    let idx = get_attribute(e, "idx")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    frame.is_title_placeholder = idx == 0;
    frame.ph_type = get_attribute(e, "type");
}

fn apply_level(e: &BytesStart, paragraph: &mut SlideParagraph) {
    if let Some(lvl) = get_attribute(e, "lvl") {
        paragraph.level = lvl.parse().unwrap_or(0);
    }
}

fn parse_picture(reader: &mut Reader<&[u8]>) -> Result<SlideBlock> {
    let mut buf = Vec::new();
    let mut depth = 1usize;
    let mut name: Option<String> = None;
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                depth += 1;
                if e.local_name().as_ref() == b"cNvPr" && name.is_none() {
                    name = get_attribute(e, "name");
                }
            }
            Event::Empty(ref e) => {
                if e.local_name().as_ref() == b"cNvPr" && name.is_none() {
                    name = get_attribute(e, "name");
                }
            }
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(SlideBlock::Image { name })
}

fn parse_graphic_frame(reader: &mut Reader<&[u8]>) -> Result<Option<SlideBlock>> {
    let mut buf = Vec::new();
    let mut depth = 1usize;
    let mut name: Option<String> = None;
    let mut table: Option<Vec<Vec<String>>> = None;
    let mut is_chart = false;
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                // parse_table consumes through </a:tbl>, so no depth change
                b"tbl" => table = Some(parse_table(reader)?),
                other => {
                    depth += 1;
                    match other {
                        b"cNvPr" if name.is_none() => name = get_attribute(e, "name"),
                        b"graphicData" => {
                            if get_attribute(e, "uri").is_some_and(|u| u.contains("chart")) {
                                is_chart = true;
                            }
                        }
                        _ => {}
                    }
                }
            },
            Event::Empty(ref e) => {
                if e.local_name().as_ref() == b"cNvPr" && name.is_none() {
                    name = get_attribute(e, "name");
                }
            }
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(rows) = table {
        Ok(Some(SlideBlock::Table(rows)))
    } else if is_chart {
        Ok(Some(SlideBlock::Chart { name }))
    } else {
        Ok(None)
    }
}

fn parse_group(reader: &mut Reader<&[u8]>) -> Result<Vec<SlideBlock>> {
    let mut buf = Vec::new();
    let mut depth = 1usize;
    let mut children = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"sp" => {
                    if let Some(block) = parse_shape(reader)? {
                        children.push(block);
                    }
                }
                b"pic" => children.push(parse_picture(reader)?),
                b"graphicFrame" => {
                    if let Some(block) = parse_graphic_frame(reader)? {
                        children.push(block);
                    }
                }
                b"grpSp" => children.push(SlideBlock::Group(parse_group(reader)?)),
                _ => depth += 1,
            },
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(children)
}

fn parse_table(reader: &mut Reader<&[u8]>) -> Result<Vec<Vec<String>>> {
    let mut buf = Vec::new();
    let mut depth = 1usize;
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell_paragraphs: Vec<String> = Vec::new();
    let mut paragraph = String::new();
    let mut in_cell = false;
    let mut in_paragraph = false;
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                depth += 1;
                match e.local_name().as_ref() {
                    b"tc" => {
                        in_cell = true;
                        cell_paragraphs.clear();
                    }
                    b"p" if in_cell => {
                        in_paragraph = true;
                        paragraph.clear();
                    }
                    b"t" => in_text = true,
                    _ => {}
                }
            }
            Event::End(ref e) => {
                match e.local_name().as_ref() {
                    b"tr" => rows.push(std::mem::take(&mut row)),
                    b"tc" => {
                        in_cell = false;
                        row.push(cell_paragraphs.join("\n"));
                    }
                    b"p" if in_paragraph => {
                        in_paragraph = false;
                        cell_paragraphs.push(std::mem::take(&mut paragraph));
                    }
                    b"t" => in_text = false,
                    _ => {}
                }
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            Event::Text(e) => {
                if in_text && in_paragraph {
                    paragraph.push_str(&e.unescape().unwrap_or_default());
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(rows)
}

// ── Rendering ────────────────────────────────────────────────────────────

fn render_slide(
    slide_num: usize,
    blocks: &[SlideBlock],
    notes: Option<&str>,
    counter: &mut ImageCounter,
) -> String {
    let title = slide_title(blocks);
    let header = match &title {
        Some(t) => format!("## Slide {slide_num}: {t}"),
        None => format!("## Slide {slide_num}"),
    };
    let mut lines = vec![header, String::new()];

    for block in blocks {
        // title text already lives in the heading
        if let SlideBlock::Text(frame) = block {
            if frame.is_title_placeholder {
                continue;
            }
        }
        let block_lines = block_to_lines(block, counter);
        if !block_lines.is_empty() {
            lines.extend(block_lines);
            lines.push(String::new());
        }
    }

    if let Some(notes) = notes {
        lines.push(format!("> **Speaker Notes:** {notes}"));
        lines.push(String::new());
    }

    lines.join("\n")
}

fn slide_title(blocks: &[SlideBlock]) -> Option<String> {
    for block in blocks {
        if let SlideBlock::Text(frame) = block {
            if frame.is_title_placeholder {
                let text = frame.full_text();
                let text = text.trim();
                if !text.is_empty() {
                    return Some(text.to_string());
                }
                break;
            }
        }
    }
    // fallback: first text frame with content
    blocks.iter().find_map(|block| match block {
        SlideBlock::Text(frame) => {
            let text = frame.full_text();
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        }
        _ => None,
    })
}

fn block_to_lines(block: &SlideBlock, counter: &mut ImageCounter) -> Vec<String> {
    match block {
        SlideBlock::Text(frame) => frame_lines(frame),
        SlideBlock::Table(rows) => {
            let md = render_table(rows);
            if md.is_empty() {
                Vec::new()
            } else {
                vec![md]
            }
        }
        SlideBlock::Image { name } => {
            counter.0 += 1;
            let n = counter.0;
            let desc = name
                .as_deref()
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("image {n}"));
            vec![format!("![{desc}](image_{n}.png)")]
        }
        SlideBlock::Chart { name } => {
            let label = name
                .as_deref()
                .filter(|n| !n.is_empty())
                .unwrap_or("unnamed chart");
            vec![format!("*[Chart: {label}]*")]
        }
        SlideBlock::Group(children) => {
            let mut lines = Vec::new();
            for child in children {
                lines.extend(block_to_lines(child, counter));
            }
            lines
        }
    }
}

fn frame_lines(frame: &TextFrame) -> Vec<String> {
    let mut lines = Vec::new();
    for para in &frame.paragraphs {
        let text = para.text.trim();
        if text.is_empty() {
            continue;
        }
        if para.level > 0 {
            let indent = "  ".repeat(para.level);
            lines.push(format!("{indent}- {text}"));
        } else {
            lines.push(text.to_string());
        }
    }
    lines
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
