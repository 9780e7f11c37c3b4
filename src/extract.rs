//! Document partitioning: one source file → ordered text elements.
//!
//! [`Partitioner`] is the narrow interface the rest of the pipeline sees;
//! [`FormatPartitioner`] is the bundled implementation covering the corpus
//! allow-list (txt, md, html, pdf, docx, pptx). Partitioning is
//! all-or-nothing per file: any failure returns an error and yields no
//! partial elements.

use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};

/// Maximum decompressed bytes read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Turns a source document into an ordered sequence of text elements.
///
/// Elements may be empty or whitespace-only; filtering is the chunk
/// extractor's job so element indices stay stable.
pub trait Partitioner: Send + Sync {
    fn partition(&self, path: &Path) -> Result<Vec<String>>;
}

/// Extension-dispatched partitioner for the supported corpus formats.
pub struct FormatPartitioner;

impl Partitioner for FormatPartitioner {
    fn partition(&self, path: &Path) -> Result<Vec<String>> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "txt" | "md" => partition_plain(path),
            "html" => partition_html(path),
            "pdf" => partition_pdf(path),
            "docx" => partition_docx(path),
            "pptx" => partition_pptx(path),
            other => Err(extraction_error(
                path,
                format!("unsupported extension: '{}'", other),
            )),
        }
    }
}

fn extraction_error(path: &Path, reason: impl Into<String>) -> Error {
    Error::Extraction {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| extraction_error(path, e.to_string()))
}

/// Split plain text into paragraph elements on blank lines.
fn split_blocks(text: &str) -> Vec<String> {
    text.split("\n\n").map(|block| block.to_string()).collect()
}

fn partition_plain(path: &Path) -> Result<Vec<String>> {
    let bytes = read_bytes(path)?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(split_blocks(&text))
}

fn partition_pdf(path: &Path) -> Result<Vec<String>> {
    let bytes = read_bytes(path)?;
    let text = pdf_extract::extract_text_from_mem(&bytes)
        .map_err(|e| extraction_error(path, e.to_string()))?;
    Ok(split_blocks(&text))
}

/// Strip tags from an HTML document, emitting one element per block-level
/// region. Script and style bodies are dropped.
fn partition_html(path: &Path) -> Result<Vec<String>> {
    let bytes = read_bytes(path)?;

    let mut reader = quick_xml::Reader::from_reader(bytes.as_slice());
    reader.config_mut().trim_text(true);
    reader.config_mut().check_end_names = false;

    let mut elements = Vec::new();
    let mut current = String::new();
    let mut skip_depth: usize = 0;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if is_dropped_tag(e.local_name().as_ref()) {
                    skip_depth += 1;
                }
            }
            Ok(quick_xml::events::Event::End(e)) => {
                let name = e.local_name();
                if is_dropped_tag(name.as_ref()) {
                    skip_depth = skip_depth.saturating_sub(1);
                } else if is_block_tag(name.as_ref()) && !current.is_empty() {
                    elements.push(std::mem::take(&mut current));
                }
            }
            Ok(quick_xml::events::Event::Text(te)) if skip_depth == 0 => {
                let text = te.unescape().unwrap_or_default();
                if !current.is_empty() && !text.is_empty() {
                    current.push(' ');
                }
                current.push_str(text.as_ref());
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(extraction_error(path, e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if !current.is_empty() {
        elements.push(current);
    }
    Ok(elements)
}

fn is_dropped_tag(name: &[u8]) -> bool {
    matches!(name, b"script" | b"style")
}

fn is_block_tag(name: &[u8]) -> bool {
    matches!(
        name,
        b"p" | b"li"
            | b"h1"
            | b"h2"
            | b"h3"
            | b"h4"
            | b"h5"
            | b"h6"
            | b"div"
            | b"section"
            | b"article"
            | b"tr"
            | b"title"
    )
}

fn open_archive(path: &Path, bytes: &[u8]) -> Result<zip::ZipArchive<std::io::Cursor<Vec<u8>>>> {
    zip::ZipArchive::new(std::io::Cursor::new(bytes.to_vec()))
        .map_err(|e| extraction_error(path, e.to_string()))
}

fn read_zip_entry_bounded(
    archive: &mut zip::ZipArchive<std::io::Cursor<Vec<u8>>>,
    path: &Path,
    name: &str,
) -> Result<Vec<u8>> {
    let entry = archive
        .by_name(name)
        .map_err(|e| extraction_error(path, e.to_string()))?;
    let mut out = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(|e| extraction_error(path, e.to_string()))?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(extraction_error(
            path,
            format!("ZIP entry {} exceeds size limit", name),
        ));
    }
    Ok(out)
}

/// One element per `w:p` paragraph, text gathered from its `w:t` runs.
fn partition_docx(path: &Path) -> Result<Vec<String>> {
    let bytes = read_bytes(path)?;
    let mut archive = open_archive(path, &bytes)?;
    let doc_xml = read_zip_entry_bounded(&mut archive, path, "word/document.xml")?;

    let mut reader = quick_xml::Reader::from_reader(doc_xml.as_slice());
    reader.config_mut().trim_text(true);

    let mut elements = Vec::new();
    let mut paragraph = String::new();
    let mut in_text_run = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text_run = true;
                }
            }
            Ok(quick_xml::events::Event::Text(te)) if in_text_run => {
                paragraph.push_str(te.unescape().unwrap_or_default().as_ref());
            }
            Ok(quick_xml::events::Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"p" => elements.push(std::mem::take(&mut paragraph)),
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(extraction_error(path, e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if !paragraph.is_empty() {
        elements.push(paragraph);
    }
    Ok(elements)
}

/// One element per slide, text gathered from the slide's `a:t` runs.
fn partition_pptx(path: &Path) -> Result<Vec<String>> {
    let bytes = read_bytes(path)?;
    let mut archive = open_archive(path, &bytes)?;

    let mut slide_names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    slide_names.sort_by_key(|name| {
        name.trim_start_matches("ppt/slides/slide")
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });

    let mut elements = Vec::new();
    for name in slide_names {
        let xml = read_zip_entry_bounded(&mut archive, path, &name)?;
        elements.push(slide_text(path, &xml)?);
    }
    Ok(elements)
}

fn slide_text(path: &Path, xml: &[u8]) -> Result<String> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut out = String::new();
    let mut in_text_run = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text_run = true;
                }
            }
            Ok(quick_xml::events::Event::Text(te)) if in_text_run => {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(te.unescape().unwrap_or_default().as_ref());
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text_run = false;
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(extraction_error(path, e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}
