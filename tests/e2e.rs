//! End-to-end tests: build real PDF/DOCX/PPTX fixtures on disk, convert
//! them through the tool registry, and check the written Markdown.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use serde_json::{json, Value as JsonValue};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use doc2md_mcp::{JsonRpcRequest, McpServer, ToolRegistry};

// ── Fixture builders ─────────────────────────────────────────────────────

fn build_pdf(path: &Path) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let page_texts = [
        vec![
            "Test Document Title",
            "This is paragraph one with some content.",
        ],
        vec!["Page Two Content", "Second page paragraph."],
    ];
    let mut kids = Vec::new();
    for lines in &page_texts {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![50.into(), 750.into()]),
        ];
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                operations.push(Operation::new("Td", vec![0.into(), (-20).into()]));
            }
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode page content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();
    doc.save(path).expect("save pdf fixture");
}

fn write_zip(path: &Path, parts: &[(&str, &str)]) {
    let file = File::create(path).expect("create archive");
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    for (name, content) in parts {
        zip.start_file(*name, options).expect("start zip entry");
        zip.write_all(content.as_bytes()).expect("write zip entry");
    }
    zip.finish().expect("finish archive");
}

fn build_docx(path: &Path) {
    let content_types = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#;

    let root_rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

    let document = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <w:body>
    <w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Test Document</w:t></w:r></w:p>
    <w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Bold text</w:t></w:r><w:r><w:t xml:space="preserve"> and </w:t></w:r><w:r><w:rPr><w:i/></w:rPr><w:t>italic text</w:t></w:r></w:p>
    <w:p><w:pPr><w:pStyle w:val="Heading2"/></w:pPr><w:r><w:t>Data</w:t></w:r></w:p>
    <w:tbl>
      <w:tr><w:tc><w:p><w:r><w:t>Name</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>Value</w:t></w:r></w:p></w:tc></w:tr>
      <w:tr><w:tc><w:p><w:r><w:t>Alpha</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>100</w:t></w:r></w:p></w:tc></w:tr>
      <w:tr><w:tc><w:p><w:r><w:t>Beta</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>200</w:t></w:r></w:p></w:tc></w:tr>
    </w:tbl>
    <w:p><w:pPr><w:pStyle w:val="ListBullet"/></w:pPr><w:r><w:t>Item one</w:t></w:r></w:p>
    <w:p><w:pPr><w:pStyle w:val="ListBullet"/></w:pPr><w:r><w:t>Item two</w:t></w:r></w:p>
    <w:sectPr><w:pgSz w:w="12240" w:h="15840"/></w:sectPr>
  </w:body>
</w:document>"#;

    let styles = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/></w:style>
  <w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/></w:style>
  <w:style w:type="paragraph" w:styleId="ListBullet"><w:name w:val="List Bullet"/></w:style>
</w:styles>"#;

    let doc_rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

    write_zip(
        path,
        &[
            ("[Content_Types].xml", content_types),
            ("_rels/.rels", root_rels),
            ("word/document.xml", document),
            ("word/styles.xml", styles),
            ("word/_rels/document.xml.rels", doc_rels),
        ],
    );
}

fn build_pptx(path: &Path) {
    let content_types = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>
</Types>"#;

    let root_rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/>
</Relationships>"#;

    let presentation = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"/>"#;

    let slide1 = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main">
  <p:cSld><p:spTree>
    <p:sp>
      <p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:nvPr><p:ph type="ctrTitle"/></p:nvPr></p:nvSpPr>
      <p:txBody><a:p><a:r><a:t>Test Presentation</a:t></a:r></a:p></p:txBody>
    </p:sp>
    <p:sp>
      <p:nvSpPr><p:cNvPr id="3" name="Subtitle 2"/><p:nvPr><p:ph type="subTitle" idx="1"/></p:nvPr></p:nvSpPr>
      <p:txBody><a:p><a:r><a:t>A subtitle</a:t></a:r></a:p></p:txBody>
    </p:sp>
  </p:spTree></p:cSld>
</p:sld>"#;

    let slide2 = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main">
  <p:cSld><p:spTree>
    <p:sp>
      <p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr>
      <p:txBody><a:p><a:r><a:t>Agenda</a:t></a:r></a:p></p:txBody>
    </p:sp>
    <p:sp>
      <p:nvSpPr><p:cNvPr id="3" name="Content 2"/><p:nvPr><p:ph type="body" idx="1"/></p:nvPr></p:nvSpPr>
      <p:txBody>
        <a:p><a:r><a:t>First topic</a:t></a:r></a:p>
        <a:p><a:pPr lvl="1"/><a:r><a:t>Subtopic</a:t></a:r></a:p>
      </p:txBody>
    </p:sp>
  </p:spTree></p:cSld>
</p:sld>"#;

    let slide2_rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide" Target="../notesSlides/notesSlide1.xml"/>
</Relationships>"#;

    let notes1 = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:notes xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main">
  <p:cSld><p:spTree>
    <p:sp>
      <p:nvSpPr><p:cNvPr id="2" name="Slide Image Placeholder 1"/><p:nvPr><p:ph type="sldImg"/></p:nvPr></p:nvSpPr>
    </p:sp>
    <p:sp>
      <p:nvSpPr><p:cNvPr id="3" name="Notes Placeholder 2"/><p:nvPr><p:ph type="body" idx="1"/></p:nvPr></p:nvSpPr>
      <p:txBody><a:p><a:r><a:t>These are speaker notes for slide 2.</a:t></a:r></a:p></p:txBody>
    </p:sp>
  </p:spTree></p:cSld>
</p:notes>"#;

    let slide3 = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main">
  <p:cSld><p:spTree>
    <p:graphicFrame>
      <p:nvGraphicFramePr><p:cNvPr id="4" name="Table 3"/></p:nvGraphicFramePr>
      <a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table">
        <a:tbl>
          <a:tr><a:tc><a:txBody><a:p><a:r><a:t>Header A</a:t></a:r></a:p></a:txBody></a:tc>
                <a:tc><a:txBody><a:p><a:r><a:t>Header B</a:t></a:r></a:p></a:txBody></a:tc></a:tr>
          <a:tr><a:tc><a:txBody><a:p><a:r><a:t>Cell 1</a:t></a:r></a:p></a:txBody></a:tc>
                <a:tc><a:txBody><a:p><a:r><a:t>Cell 2</a:t></a:r></a:p></a:txBody></a:tc></a:tr>
        </a:tbl>
      </a:graphicData></a:graphic>
    </p:graphicFrame>
  </p:spTree></p:cSld>
</p:sld>"#;

    write_zip(
        path,
        &[
            ("[Content_Types].xml", content_types),
            ("_rels/.rels", root_rels),
            ("ppt/presentation.xml", presentation),
            ("ppt/slides/slide1.xml", slide1),
            ("ppt/slides/slide2.xml", slide2),
            ("ppt/slides/slide3.xml", slide3),
            ("ppt/slides/_rels/slide2.xml.rels", slide2_rels),
            ("ppt/notesSlides/notesSlide1.xml", notes1),
        ],
    );
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn dispatch(name: &str, args: JsonValue) -> JsonValue {
    let registry = ToolRegistry::new();
    let map = args.as_object().cloned().unwrap_or_default();
    registry.dispatch(name, map).expect("dispatch")
}

fn read_output(result: &JsonValue) -> String {
    let path = result["output_path"].as_str().expect("output_path");
    std::fs::read_to_string(path).expect("read output file")
}

// ── PDF ──────────────────────────────────────────────────────────────────

#[test]
fn pdf_converts_with_page_markers() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("sample.pdf");
    build_pdf(&pdf);

    let result = dispatch("convert_pdf_to_markdown", json!({ "file_path": pdf.to_str().unwrap() }));
    assert_eq!(result["success"], json!(true), "{result}");
    assert_eq!(result["file_name"], json!("sample.md"));
    assert_eq!(result["source_file"], json!("sample.pdf"));
    assert_eq!(result["metadata"]["source_format"], json!("pdf"));
    assert_eq!(result["metadata"]["page_count"], json!(2));
    assert!(result["metadata"]["word_count"].as_u64().unwrap() > 0);

    let content = read_output(&result);
    assert!(content.starts_with("---\n"));
    assert!(content.contains("source: sample.pdf"));
    assert!(content.contains("format: pdf"));
    assert!(content.contains("pages: 2"));
    assert!(content.contains("<!-- Page 1 -->"));
    assert!(content.contains("<!-- Page 2 -->"));
    assert_eq!(content.matches("<!-- Page ").count(), 2);
    assert!(content.contains("Test Document Title"));
    assert!(content.contains("Page Two Content"));
    assert!(content.contains("\n---\n"));
}

#[test]
fn pdf_converts_from_base64() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("orig.pdf");
    build_pdf(&pdf);
    let encoded = STANDARD.encode(std::fs::read(&pdf).unwrap());

    let out_dir = tempfile::tempdir().unwrap();
    let result = dispatch(
        "convert_pdf_to_markdown",
        json!({
            "base64_content": encoded,
            "file_name": "encoded.pdf",
            "output_dir": out_dir.path().to_str().unwrap(),
        }),
    );
    assert_eq!(result["success"], json!(true), "{result}");
    assert_eq!(result["file_name"], json!("encoded.md"));
    assert_eq!(result["source_file"], json!("encoded.pdf"));
    let content = read_output(&result);
    assert!(content.contains("source: encoded.pdf"));
    assert!(content.contains("Test Document Title"));
}

#[test]
fn pdf_custom_output_name() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("sample.pdf");
    build_pdf(&pdf);

    let result = dispatch(
        "convert_pdf_to_markdown",
        json!({
            "file_path": pdf.to_str().unwrap(),
            "output_file_name": "custom",
        }),
    );
    assert_eq!(result["file_name"], json!("custom.md"));
}

#[test]
fn pdf_collision_suffixes_unless_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("sample.pdf");
    build_pdf(&pdf);
    let args = json!({ "file_path": pdf.to_str().unwrap() });

    let first = dispatch("convert_pdf_to_markdown", args.clone());
    let second = dispatch("convert_pdf_to_markdown", args.clone());
    assert_ne!(first["output_path"], second["output_path"]);
    assert!(second["file_name"].as_str().unwrap().starts_with("sample_"));

    let overwrite = dispatch(
        "convert_pdf_to_markdown",
        json!({ "file_path": pdf.to_str().unwrap(), "overwrite": true }),
    );
    assert_eq!(overwrite["output_path"], first["output_path"]);
}

#[test]
fn pdf_missing_file_fails_in_band() {
    let result = dispatch("convert_pdf_to_markdown", json!({ "file_path": "/nonexistent/x.pdf" }));
    assert_eq!(result["success"], json!(false));
    assert!(result["error"].as_str().unwrap().contains("not found"));
    assert_eq!(result["output_path"], JsonValue::Null);
}

// ── DOCX ─────────────────────────────────────────────────────────────────

#[test]
fn docx_preserves_structure() {
    let dir = tempfile::tempdir().unwrap();
    let docx = dir.path().join("report.docx");
    build_docx(&docx);

    let result = dispatch("convert_docx_to_markdown", json!({ "file_path": docx.to_str().unwrap() }));
    assert_eq!(result["success"], json!(true), "{result}");
    assert_eq!(result["metadata"]["source_format"], json!("docx"));
    assert_eq!(result["metadata"]["page_count"], json!(1));
    assert_eq!(result["metadata"]["has_images"], json!(false));

    let content = read_output(&result);
    assert!(content.contains("format: docx"));
    assert!(content.contains("# Test Document"));
    assert!(content.contains("**Bold text** and *italic text*"));
    assert!(content.contains("## Data"));
    assert!(content.contains("| Name | Value |"));
    assert!(content.contains("| Alpha | 100 |"));
    assert!(content.contains("| Beta | 200 |"));
    assert!(content.contains("- Item one"));
    assert!(content.contains("- Item two"));
}

// ── PPTX ─────────────────────────────────────────────────────────────────

#[test]
fn pptx_renders_slides_notes_and_tables() {
    let dir = tempfile::tempdir().unwrap();
    let pptx = dir.path().join("deck.pptx");
    build_pptx(&pptx);

    let result = dispatch("convert_pptx_to_markdown", json!({ "file_path": pptx.to_str().unwrap() }));
    assert_eq!(result["success"], json!(true), "{result}");
    assert_eq!(result["metadata"]["source_format"], json!("pptx"));
    assert_eq!(result["metadata"]["slide_count"], json!(3));

    let content = read_output(&result);
    assert!(content.contains("slides: 3"));
    assert!(content.contains("## Slide 1: Test Presentation"));
    assert!(content.contains("A subtitle"));
    assert!(content.contains("## Slide 2: Agenda"));
    assert!(content.contains("First topic"));
    assert!(content.contains("  - Subtopic"));
    assert!(content.contains("> **Speaker Notes:** These are speaker notes for slide 2."));
    assert!(content.contains("## Slide 3"));
    assert!(content.contains("| Header A | Header B |"));
    assert!(content.contains("| Cell 1 | Cell 2 |"));
}

// ── Auto and batch ───────────────────────────────────────────────────────

#[test]
fn auto_detects_docx_by_extension() {
    let dir = tempfile::tempdir().unwrap();
    let docx = dir.path().join("memo.docx");
    build_docx(&docx);

    let result = dispatch("convert_auto", json!({ "file_path": docx.to_str().unwrap() }));
    assert_eq!(result["success"], json!(true), "{result}");
    assert_eq!(result["metadata"]["source_format"], json!("docx"));
}

#[test]
fn auto_rejects_unknown_extension() {
    let dir = tempfile::tempdir().unwrap();
    let txt = dir.path().join("notes.txt");
    std::fs::write(&txt, "plain text").unwrap();

    let result = dispatch("convert_auto", json!({ "file_path": txt.to_str().unwrap() }));
    assert_eq!(result["success"], json!(false));
    assert!(result["error"]
        .as_str()
        .unwrap()
        .contains("Unsupported file type"));
}

#[test]
fn batch_preserves_order_and_tallies() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("a.pdf");
    let pptx = dir.path().join("c.pptx");
    build_pdf(&pdf);
    build_pptx(&pptx);

    let out_dir = tempfile::tempdir().unwrap();
    let result = dispatch(
        "batch_convert",
        json!({
            "file_paths": [
                pdf.to_str().unwrap(),
                "/nonexistent/b.docx",
                pptx.to_str().unwrap(),
            ],
            "output_dir": out_dir.path().to_str().unwrap(),
        }),
    );
    assert_eq!(result["total"], json!(3));
    assert_eq!(result["successful"], json!(2));
    assert_eq!(result["failed"], json!(1));

    let results = result["results"].as_array().unwrap();
    assert_eq!(results[0]["success"], json!(true));
    assert_eq!(results[0]["metadata"]["source_format"], json!("pdf"));
    assert_eq!(results[1]["success"], json!(false));
    assert!(results[1]["error"].as_str().unwrap().contains("not found"));
    assert_eq!(results[2]["success"], json!(true));
    assert_eq!(results[2]["metadata"]["source_format"], json!("pptx"));
    // outputs landed in the requested directory
    assert!(results[0]["output_path"]
        .as_str()
        .unwrap()
        .starts_with(out_dir.path().canonicalize().unwrap().to_str().unwrap()));
}

// ── Full protocol round trip ─────────────────────────────────────────────

#[test]
fn server_converts_over_json_rpc() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("rpc.pdf");
    build_pdf(&pdf);

    let server = McpServer::new();
    let req = JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        id: Some(json!(1)),
        method: "tools/call".to_string(),
        params: Some(json!({
            "name": "convert_pdf_to_markdown",
            "arguments": { "file_path": pdf.to_str().unwrap() }
        })),
    };
    let resp = server.handle_request(req).expect("response");
    assert!(resp.error.is_none());
    let result = resp.result.unwrap();
    assert_eq!(result["isError"], json!(false));

    let text = result["content"][0]["text"].as_str().unwrap();
    let payload: JsonValue = serde_json::from_str(text).unwrap();
    assert_eq!(payload["success"], json!(true));
    assert!(payload["output_path"].as_str().unwrap().ends_with("rpc.md"));
}
