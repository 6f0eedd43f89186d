//! Content type detection
//!
//! Persisted attachments report the type of their stored bytes rather than
//! whatever the uploader declared. Detection looks at magic numbers first;
//! generic results (plain text, OLE containers) are refined with the file
//! name so a CSV reads as `text/csv` and a legacy workbook as
//! `application/vnd.ms-excel`.

use mime::Mime;

/// Byte-level MIME type detection
#[cfg_attr(test, mockall::automock)]
pub trait MimeSniffer: Send + Sync {
    /// Detect the MIME essence of `bytes`
    fn sniff(&self, bytes: &[u8]) -> String;

    /// Detect, then refine a generic result using the file name's extension
    fn sniff_named(&self, bytes: &[u8], file_name: &str) -> String {
        refine(self.sniff(bytes), file_name)
    }
}

/// Magic-number sniffer covering the formats attachments are imported from
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureSniffer;

const PDF: &[u8] = b"%PDF";
const PNG: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG: &[u8] = b"\xff\xd8\xff";
const GIF87: &[u8] = b"GIF87a";
const GIF89: &[u8] = b"GIF89a";
const ZIP: &[u8] = b"PK\x03\x04";
const OLE: &[u8] = b"\xd0\xcf\x11\xe0\xa1\xb1\x1a\xe1";
const GZIP: &[u8] = b"\x1f\x8b";
const XML: &[u8] = b"<?xml";

pub const OLE_STORAGE: &str = "application/x-ole-storage";
pub const EMPTY: &str = "application/x-empty";
const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

impl MimeSniffer for SignatureSniffer {
    fn sniff(&self, bytes: &[u8]) -> String {
        if bytes.is_empty() {
            return EMPTY.to_string();
        }

        let detected = if bytes.starts_with(PDF) {
            "application/pdf"
        } else if bytes.starts_with(PNG) {
            "image/png"
        } else if bytes.starts_with(JPEG) {
            "image/jpeg"
        } else if bytes.starts_with(GIF87) || bytes.starts_with(GIF89) {
            "image/gif"
        } else if bytes.starts_with(ZIP) {
            sniff_zip(bytes)
        } else if bytes.starts_with(OLE) {
            OLE_STORAGE
        } else if bytes.starts_with(GZIP) {
            "application/gzip"
        } else if bytes.starts_with(XML) {
            "text/xml"
        } else if is_text(bytes) {
            "text/plain"
        } else {
            "application/octet-stream"
        };

        detected.to_string()
    }
}

/// Office Open XML packages are zip archives; the first entries name the part
fn sniff_zip(bytes: &[u8]) -> &'static str {
    let head = &bytes[..bytes.len().min(4096)];
    if contains(head, b"xl/") {
        XLSX
    } else if contains(head, b"word/") {
        DOCX
    } else {
        "application/zip"
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn is_text(bytes: &[u8]) -> bool {
    match std::str::from_utf8(bytes) {
        Ok(text) => !text
            .chars()
            .any(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t' | '\x0c')),
        Err(_) => false,
    }
}

/// Replace a generic detection result with the extension-based guess when
/// the two agree on the family
pub fn refine(detected: String, file_name: &str) -> String {
    let guess: Option<Mime> = mime_guess::from_path(file_name).first();
    let Some(guess) = guess else {
        return detected;
    };

    let refined = if detected == mime::TEXT_PLAIN.essence_str() {
        guess.type_() == mime::TEXT
            || guess.essence_str() == mime::APPLICATION_JSON.essence_str()
            || guess.essence_str() == "application/xml"
    } else if detected == OLE_STORAGE {
        let essence = guess.essence_str();
        essence == "application/vnd.ms-excel"
            || essence == "application/msword"
            || essence == "application/vnd.ms-powerpoint"
    } else {
        false
    };

    if refined {
        guess.essence_str().to_string()
    } else {
        detected
    }
}

/// Strip parameters (`; charset=...`) from a content type
pub fn essence(content_type: &str) -> String {
    match content_type.parse::<Mime>() {
        Ok(parsed) => parsed.essence_str().to_string(),
        Err(_) => content_type
            .split(';')
            .next()
            .unwrap_or(content_type)
            .trim()
            .to_string(),
    }
}
