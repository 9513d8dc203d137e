//! Text extraction from fetched binary documents (PDF, Word).
//!
//! The fetch layer supplies bytes plus the original extension; this module
//! returns plain UTF-8 text for pattern extraction. No panic on malformed
//! input: the pipeline logs the error and skips the document.

use std::io::Read;
use thiserror::Error;

/// Maximum decompressed bytes read from a single ZIP entry (zip-bomb guard).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum DocError {
    #[error("unsupported document extension: {0}")]
    Unsupported(String),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("Word extraction failed: {0}")]
    Word(String),
}

/// Extract plain text from document bytes, dispatching on extension.
pub fn extract_text(bytes: &[u8], extension: &str) -> Result<String, DocError> {
    match extension {
        ".pdf" => extract_pdf(bytes),
        ".doc" | ".docx" => extract_docx(bytes),
        other => Err(DocError::Unsupported(other.to_string())),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, DocError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| DocError::Pdf(e.to_string()))
}

/// OOXML word processing text: every `w:t` run, one line per `w:p` paragraph.
fn extract_docx(bytes: &[u8]) -> Result<String, DocError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| DocError::Word(e.to_string()))?;
    let mut doc_xml = Vec::new();
    {
        let entry = archive
            .by_name("word/document.xml")
            .map_err(|e| DocError::Word(e.to_string()))?;
        entry
            .take(MAX_XML_ENTRY_BYTES)
            .read_to_end(&mut doc_xml)
            .map_err(|e| DocError::Word(e.to_string()))?;
        if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
            return Err(DocError::Word(
                "word/document.xml exceeds size limit".to_string(),
            ));
        }
    }
    paragraph_text(&doc_xml)
}

fn paragraph_text(xml: &[u8]) -> Result<String, DocError> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_t = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_t = true;
                }
            }
            Ok(quick_xml::events::Event::Text(te)) if in_t => {
                out.push_str(te.unescape().unwrap_or_default().as_ref());
            }
            Ok(quick_xml::events::Event::End(e)) => {
                match e.local_name().as_ref() {
                    b"t" => in_t = false,
                    // Paragraph boundaries become line breaks so downstream
                    // line-anchored patterns see the document's structure.
                    b"p" => {
                        if !out.ends_with('\n') && !out.is_empty() {
                            out.push('\n');
                        }
                    }
                    _ => {}
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(DocError::Word(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn docx_with_paragraphs(paragraphs: &[&str]) -> Vec<u8> {
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
            .collect();
        let xml = format!(
            r#"<?xml version="1.0"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        );
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut cursor);
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("word/document.xml", options).unwrap();
            zip.write_all(xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn unsupported_extension_returns_error() {
        let err = extract_text(b"foo", ".xlsx").unwrap_err();
        assert!(matches!(err, DocError::Unsupported(_)));
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let err = extract_text(b"not a pdf", ".pdf").unwrap_err();
        assert!(matches!(err, DocError::Pdf(_)));
    }

    #[test]
    fn invalid_zip_returns_error_for_docx() {
        let err = extract_text(b"not a zip", ".docx").unwrap_err();
        assert!(matches!(err, DocError::Word(_)));
    }

    #[test]
    fn docx_paragraphs_become_lines() {
        let bytes = docx_with_paragraphs(&["Mission: EUTM Mali", "Country: Mali"]);
        let text = extract_text(&bytes, ".docx").unwrap();
        assert_eq!(text, "Mission: EUTM Mali\nCountry: Mali\n");
    }

    #[test]
    fn docx_without_document_xml_returns_error() {
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut cursor);
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("other.xml", options).unwrap();
            zip.write_all(b"<x/>").unwrap();
            zip.finish().unwrap();
        }
        let err = extract_text(&cursor.into_inner(), ".docx").unwrap_err();
        assert!(matches!(err, DocError::Word(_)));
    }
}
