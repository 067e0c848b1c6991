use std::io::{Cursor, Read};

use anyhow::{bail, Context, Result};
use tracing::debug;

pub const UNSUPPORTED_TYPE: &str = "Unsupported file type. Please upload a PDF, DOCX, or text file.";

/// Below this many characters an extraction is not worth sending to the model.
pub const MIN_ANALYZABLE_CHARS: usize = 50;

const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    Text,
}

/// Decide by MIME type, falling back to the file extension when the browser
/// sent a generic type.
pub fn detect_kind(mime: &str, file_name: &str) -> Option<DocumentKind> {
    let mime = mime.trim().to_lowercase();
    if mime == "application/pdf" {
        return Some(DocumentKind::Pdf);
    }
    if mime == DOCX_MIME {
        return Some(DocumentKind::Docx);
    }
    if mime.starts_with("text/") {
        return Some(DocumentKind::Text);
    }
    if !mime.is_empty() && mime != "application/octet-stream" {
        return None;
    }
    let ext = file_name.rsplit_once('.').map(|(_, e)| e.to_lowercase())?;
    match ext.as_str() {
        "pdf" => Some(DocumentKind::Pdf),
        "docx" => Some(DocumentKind::Docx),
        "txt" | "md" | "text" => Some(DocumentKind::Text),
        _ => None,
    }
}

/// Plain text of an uploaded PDF, DOCX or text file.
pub fn extract_text(bytes: &[u8], mime: &str, file_name: &str) -> Result<String> {
    let Some(kind) = detect_kind(mime, file_name) else {
        bail!(UNSUPPORTED_TYPE);
    };
    debug!(file = file_name, ?kind, bytes = bytes.len(), "extracting text");
    match kind {
        DocumentKind::Pdf => pdf_text(bytes),
        DocumentKind::Docx => docx_text(bytes),
        DocumentKind::Text => Ok(String::from_utf8_lossy(bytes).into_owned()),
    }
}

/// Reject extractions that are empty or too short to analyze.
pub fn ensure_analyzable(text: &str) -> Result<&str, &'static str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err("No text could be read from this file. Try a PDF or DOCX with selectable text, or use a plain .txt file.");
    }
    if trimmed.chars().count() < MIN_ANALYZABLE_CHARS {
        return Err("Not enough text was extracted to analyze. The file may be image-only or corrupted. Try a different file or use the sample lease.");
    }
    Ok(trimmed)
}

fn pdf_text(bytes: &[u8]) -> Result<String> {
    let document = lopdf::Document::load_mem(bytes).context("invalid PDF")?;
    let pages: Vec<u32> = document.get_pages().keys().copied().collect();
    let mut full = String::new();
    for page in pages {
        // Pages without a text layer are skipped rather than failing the upload.
        if let Ok(text) = document.extract_text(&[page]) {
            full.push_str(&text);
            full.push_str("\n\n");
        }
    }
    Ok(full)
}

fn docx_text(bytes: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).context("invalid DOCX archive")?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .context("DOCX has no word/document.xml")?
        .read_to_string(&mut xml)?;
    Ok(wordml_to_text(&xml))
}

/// Paragraph and line breaks become newlines, tabs stay tabs, all other
/// markup is dropped and the five XML entities are decoded.
fn wordml_to_text(xml: &str) -> String {
    let mut out = String::with_capacity(xml.len() / 4);
    let mut rest = xml;
    while let Some(start) = rest.find('<') {
        out.push_str(&decode_entities(&rest[..start]));
        let Some(end) = rest[start..].find('>') else {
            rest = "";
            break;
        };
        let tag = &rest[start + 1..start + end];
        let name = tag
            .trim_start_matches('/')
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or("");
        match name {
            "w:p" if tag.starts_with('/') => out.push('\n'),
            "w:br" | "w:cr" => out.push('\n'),
            "w:tab" if !tag.starts_with('/') => out.push('\t'),
            _ => {}
        }
        rest = &rest[start + end + 1..];
    }
    out.push_str(&decode_entities(rest));
    out
}

fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn docx_with(body: &str) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            let opts = zip::write::SimpleFileOptions::default();
            zip.start_file("word/document.xml", opts).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn detects_by_mime_then_extension() {
        assert_eq!(detect_kind("application/pdf", "x"), Some(DocumentKind::Pdf));
        assert_eq!(detect_kind("text/plain; charset=utf-8", "x"), Some(DocumentKind::Text));
        assert_eq!(detect_kind(DOCX_MIME, "lease"), Some(DocumentKind::Docx));
        assert_eq!(detect_kind("application/octet-stream", "Lease.DOCX"), Some(DocumentKind::Docx));
        assert_eq!(detect_kind("", "notes.txt"), Some(DocumentKind::Text));
        assert_eq!(detect_kind("image/png", "scan.pdf"), None);
        assert_eq!(detect_kind("", "archive.zip"), None);
    }

    #[test]
    fn unsupported_type_message() {
        let err = extract_text(b"\x89PNG", "image/png", "photo.png").unwrap_err();
        assert_eq!(err.to_string(), UNSUPPORTED_TYPE);
    }

    #[test]
    fn plain_text_passthrough() {
        let text = extract_text("Rent: $975".as_bytes(), "text/plain", "lease.txt").unwrap();
        assert_eq!(text, "Rent: $975");
    }

    #[test]
    fn docx_paragraphs_and_entities() {
        let xml = r#"<?xml version="1.0"?><w:document><w:body><w:p><w:r><w:t>Rent &amp; fees</w:t></w:r></w:p><w:p><w:r><w:t>Late fee:</w:t><w:tab/><w:t>$75</w:t></w:r></w:p></w:body></w:document>"#;
        let text = extract_text(&docx_with(xml), DOCX_MIME, "lease.docx").unwrap();
        assert_eq!(text, "Rent & fees\nLate fee:\t$75\n");
    }

    #[test]
    fn docx_without_document_part_fails() {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            zip.start_file("other.xml", zip::write::SimpleFileOptions::default()).unwrap();
            zip.write_all(b"<x/>").unwrap();
            zip.finish().unwrap();
        }
        assert!(extract_text(&buf.into_inner(), DOCX_MIME, "x.docx").is_err());
    }

    #[test]
    fn short_extractions_are_rejected() {
        assert!(ensure_analyzable("   ").unwrap_err().starts_with("No text"));
        assert!(ensure_analyzable("Rent $975").unwrap_err().starts_with("Not enough"));
        let long = "This residential lease is made between the landlord and tenant for 12 months.";
        assert_eq!(ensure_analyzable(&format!("  {long}\n")).unwrap(), long);
    }
}
