//! PDF to Markdown conversion on top of the lopdf object model.
//!
//! Pages are processed in order. Each page gets an HTML comment marker,
//! its extracted text, placeholders for any raster images found in the
//! page's XObject resources, and any tables recovered from the text
//! layout. A page with images but no text is flagged as a scanned page.

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, error};

use crate::converters::{finish, Rendered};
use crate::error::Result;
use crate::markdown::{clean_text, format_table, split_columns};
use crate::model::{ConversionRequest, ConversionResult};
use crate::source::resolve_source;

/// Convert a PDF to Markdown on disk.
pub fn convert(req: &ConversionRequest) -> ConversionResult {
    match convert_inner(req) {
        Ok(result) => result,
        Err(e) => {
            error!("PDF conversion failed: {e}");
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

    let doc = Document::load(source.path())?;
    let pages = doc.get_pages();
    let page_count = pages.len();

    let mut warnings: Vec<String> = Vec::new();
    let mut total_images = 0usize;
    let mut sections: Vec<String> = Vec::with_capacity(page_count);

    for (&page_num, &page_id) in pages.iter() {
        let mut text = match doc.extract_text(&[page_num]) {
            Ok(t) => clean_text(&t).trim().to_string(),
            Err(e) => {
                debug!("Text extraction failed on page {page_num}: {e}");
                String::new()
            }
        };
        let tables = detect_text_tables(&text);

        let image_count = count_page_images(&doc, page_id);
        total_images += image_count;

        if text.is_empty() && image_count > 0 {
            warnings.push(format!(
                "Page {page_num} appears to be a scanned image that could not be OCR'd"
            ));
            text = format!("*[Page {page_num} contains a scanned image with no extractable text]*");
        }

        if image_count > 0 {
            let refs: Vec<String> = (1..=image_count)
                .map(|i| format!("![image](image_p{page_num}_{i}.png)"))
                .collect();
            text.push_str("\n\n");
            text.push_str(&refs.join("\n"));
        }

        if !tables.is_empty() {
            text.push_str("\n\n");
            text.push_str(&tables.join("\n\n"));
        }

        sections.push(format!("<!-- Page {page_num} -->\n\n{text}"));
    }

    let body = sections.join("\n\n---\n\n");
    finish(
        req,
        &source,
        &source_name,
        Rendered {
            body,
            format: "pdf",
            pages: Some(page_count),
            slides: None,
            image_count: total_images,
            warnings,
        },
    )
}

/// Count raster images in a page's XObject resources, direct and inherited.
fn count_page_images(doc: &Document, page_id: ObjectId) -> usize {
    let (resources, resource_ids) = doc.get_page_resources(page_id);
    let mut count = resources.map_or(0, |dict| count_image_xobjects(doc, dict));
    for id in resource_ids {
        if let Ok(dict) = doc.get_object(id).and_then(|o| o.as_dict()) {
            count += count_image_xobjects(doc, dict);
        }
    }
    count
}

fn count_image_xobjects(doc: &Document, resources: &Dictionary) -> usize {
    let xobjects = match resources.get(b"XObject") {
        Ok(obj) => obj,
        Err(_) => return 0,
    };
    let dict = match xobjects {
        Object::Dictionary(d) => d,
        Object::Reference(id) => match doc.get_object(*id).and_then(|o| o.as_dict()) {
            Ok(d) => d,
            Err(_) => return 0,
        },
        _ => return 0,
    };

    let mut count = 0;
    for (_name, value) in dict.iter() {
        let stream = match value {
            Object::Stream(s) => Some(s),
            Object::Reference(id) => doc.get_object(*id).ok().and_then(|o| o.as_stream().ok()),
            _ => None,
        };
        let is_image = stream
            .and_then(|s| s.dict.get(b"Subtype").ok())
            .and_then(|o| o.as_name().ok())
            .map_or(false, |n| n == b"Image");
        if is_image {
            count += 1;
        }
    }
    count
}

/// Best-effort table recovery from extracted page text.
///
/// A run of 2+ consecutive lines that all split into the same number of
/// columns (2 or more) on wide whitespace gaps is treated as a table, with
/// the first line as the header row.
fn detect_text_tables(text: &str) -> Vec<String> {
    let mut tables = Vec::new();
    let mut block: Vec<Vec<String>> = Vec::new();

    for line in text.lines() {
        let cols = split_columns(line);
        if cols.len() >= 2 {
            if block.is_empty() || block[0].len() == cols.len() {
                block.push(cols.iter().map(|c| c.to_string()).collect());
                continue;
            }
            flush_table(&mut block, &mut tables);
            block.push(cols.iter().map(|c| c.to_string()).collect());
            continue;
        }
        flush_table(&mut block, &mut tables);
    }
    flush_table(&mut block, &mut tables);
    tables
}

fn flush_table(block: &mut Vec<Vec<String>>, tables: &mut Vec<String>) {
    if block.len() >= 2 {
        let headers = block[0].clone();
        let rows = block[1..].to_vec();
        let md = format_table(&headers, &rows, None);
        if !md.is_empty() {
            tables.push(md);
        }
    }
    block.clear();
}
