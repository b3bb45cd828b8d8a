//! Shared OOXML plumbing for the DOCX and PPTX converters.
//!
//! Both formats are ZIP archives of XML parts wired together by `.rels`
//! relationship files. This module covers part access, relationship
//! parsing, relative target resolution, and attribute lookup; the
//! format-specific element walks live in their own modules.

use crate::error::Result;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

pub(crate) type Archive = ZipArchive<std::fs::File>;

/// Open a document archive from disk.
pub(crate) fn open_archive(path: &Path) -> Result<Archive> {
    let file = std::fs::File::open(path)?;
    Ok(ZipArchive::new(file)?)
}

/// Read a required part as UTF-8 text.
pub(crate) fn read_part(archive: &mut Archive, name: &str) -> Result<String> {
    let mut file = archive.by_name(name)?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(content)
}

/// Read a part that may legitimately be absent.
pub(crate) fn read_optional_part(archive: &mut Archive, name: &str) -> Option<String> {
    let mut file = archive.by_name(name).ok()?;
    let mut content = String::new();
    file.read_to_string(&mut content).ok()?;
    Some(content)
}

/// Read a binary part (image payloads).
pub(crate) fn read_binary_part(archive: &mut Archive, name: &str) -> Result<Vec<u8>> {
    let mut file = archive.by_name(name)?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;
    Ok(data)
}

/// One entry from a `.rels` part.
#[derive(Debug, Clone)]
pub(crate) struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
}

/// Parse a `.rels` part, preserving document order.
pub(crate) fn parse_relationships(xml: &str) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_reader(xml.as_bytes());
    let mut rels = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                rels.push(Relationship {
                    id: get_attribute(e, "Id").unwrap_or_default(),
                    rel_type: get_attribute(e, "Type").unwrap_or_default(),
                    target: get_attribute(e, "Target").unwrap_or_default(),
                });
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }
    Ok(rels)
}

/// Resolve a relationship target against the directory of the part that
/// declared it ("word", "ppt/slides"). Handles `..` segments and
/// archive-absolute targets.
pub(crate) fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut parts: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Attribute lookup by local name, ignoring any namespace prefix.
pub(crate) fn get_attribute(e: &BytesStart, name: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == name.as_bytes())
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}
