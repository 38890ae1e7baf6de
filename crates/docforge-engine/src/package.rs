/*
 * package.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Reading and writing `.docx` archive containers.
//!
//! Entries are read as raw bytes. Only the templated XML parts are decoded
//! as UTF-8; every other entry (images, fonts, relationships, styles) is
//! copied through unchanged. Output archives use DEFLATE level 9 and a fixed
//! modification time, so the same input always produces the same bytes.

use std::io::{Cursor, Read, Write};

use serde_json::Value;
use tracing::{debug, info, warn};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use crate::error::{EngineError, EngineResult};
use crate::evaluator::render;
use crate::options::MergeOptions;
use crate::parser::parse_part;

/// Main document part.
pub const DOCUMENT_PART: &str = "word/document.xml";

const COMPRESSION_LEVEL: i64 = 9;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELATIONSHIPS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const SAMPLE_DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r><w:t>docforge sample document</w:t></w:r></w:p><w:sectPr/></w:body></w:document>"#;

/// An archive entry held in memory.
struct Entry {
    name: String,
    data: Vec<u8>,
}

/// Merge `data` into a `.docx` template and return the new archive.
///
/// # Errors
///
/// - [`EngineError::Archive`] if `template` is not a readable ZIP archive
/// - [`EngineError::Xml`] if a templated part is malformed
/// - [`EngineError::Template`] with the tag errors of all parts
///
/// A malformed part is fatal: its error is returned in place of any tag
/// errors collected from earlier parts.
pub fn render_document(
    template: &[u8],
    data: &Value,
    options: &MergeOptions,
) -> EngineResult<Vec<u8>> {
    let entries = read_entries(template)?;
    let mut errors = Vec::new();
    let mut rendered = Vec::with_capacity(entries.len());
    let mut templated = 0usize;

    for entry in entries {
        if !is_templated_part(&entry.name) {
            rendered.push(entry);
            continue;
        }
        templated += 1;

        match render_part(&entry.name, &entry.data, data, options) {
            Ok(xml) => rendered.push(Entry {
                data: xml.into_bytes(),
                ..entry
            }),
            Err(EngineError::Template {
                errors: part_errors,
            }) => errors.extend(part_errors),
            Err(fatal) => {
                if !errors.is_empty() {
                    warn!(
                        tag_errors = errors.len(),
                        part = %entry.name,
                        "Discarding tag errors, a part could not be read"
                    );
                }
                return Err(fatal);
            }
        }
    }

    if !errors.is_empty() {
        return Err(EngineError::Template { errors });
    }

    let output = build_package(
        rendered
            .iter()
            .map(|entry| (entry.name.as_str(), entry.data.as_slice())),
    )?;

    info!(
        entries = rendered.len(),
        templated_parts = templated,
        size = output.len(),
        "Rendered document"
    );
    Ok(output)
}

/// Whether an archive entry may contain placeholders.
pub fn is_templated_part(name: &str) -> bool {
    match name.strip_prefix("word/") {
        Some(rest) if !rest.contains('/') => {
            matches!(rest, "document.xml" | "footnotes.xml" | "endnotes.xml")
                || ((rest.starts_with("header") || rest.starts_with("footer"))
                    && rest.ends_with(".xml"))
        }
        _ => false,
    }
}

/// Write entries into a new archive.
///
/// Names ending in `/` become directory entries. Every file is deflated at
/// level 9 with a fixed timestamp.
pub fn build_package<'a>(
    entries: impl IntoIterator<Item = (&'a str, &'a [u8])>,
) -> EngineResult<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(COMPRESSION_LEVEL))
        .last_modified_time(DateTime::default());

    for (name, data) in entries {
        if name.ends_with('/') {
            writer.add_directory(name, options)?;
            continue;
        }
        writer.start_file(name, options)?;
        writer
            .write_all(data)
            .map_err(|e| EngineError::Archive(format!("failed to write {}: {}", name, e)))?;
    }

    Ok(writer.finish()?.into_inner())
}

/// Build a minimal package around a `word/document.xml` body.
pub fn package_with_document(document_xml: &str) -> EngineResult<Vec<u8>> {
    build_package([
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("_rels/.rels", PACKAGE_RELATIONSHIPS.as_bytes()),
        (DOCUMENT_PART, document_xml.as_bytes()),
    ])
}

/// A small, valid one-paragraph `.docx`.
pub fn sample_document() -> EngineResult<Vec<u8>> {
    package_with_document(SAMPLE_DOCUMENT)
}

/// Read one entry of an archive, or `None` if it does not exist.
pub fn read_entry(archive: &[u8], name: &str) -> EngineResult<Option<Vec<u8>>> {
    let mut archive = ZipArchive::new(Cursor::new(archive))?;
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut data = Vec::new();
    file.read_to_end(&mut data)
        .map_err(|e| EngineError::Archive(format!("failed to read {}: {}", name, e)))?;
    Ok(Some(data))
}

fn read_entries(archive: &[u8]) -> EngineResult<Vec<Entry>> {
    let mut archive = ZipArchive::new(Cursor::new(archive))?;
    let mut entries = Vec::with_capacity(archive.len());

    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        let name = file.name().to_string();
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|e| EngineError::Archive(format!("failed to read {}: {}", name, e)))?;
        entries.push(Entry { name, data });
    }

    debug!(entries = entries.len(), "Read template archive");
    Ok(entries)
}

fn render_part(
    name: &str,
    bytes: &[u8],
    data: &Value,
    options: &MergeOptions,
) -> EngineResult<String> {
    let content = std::str::from_utf8(bytes).map_err(|e| EngineError::Xml {
        part: name.to_string(),
        message: format!("part is not valid UTF-8: {}", e),
    })?;
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let nodes = parse_part(name, content, options)?;
    let xml = render(name, &nodes, data, options)?;
    debug!(part = name, size = xml.len(), "Rendered part");
    Ok(xml)
}
