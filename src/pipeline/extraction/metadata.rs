use std::panic::{self, AssertUnwindSafe};

use lopdf::{Dictionary, Document, Object, ObjectId};

use super::{decode_pdf_string, ExtractionError, ExtractionMethod, LineExtractor};
use crate::pipeline::strategy::panic_message;

const INFO_FIELDS: [(&str, &str); 6] = [
    ("Title", "Title"),
    ("Author", "Author"),
    ("Subject", "Subject"),
    ("Keywords", "Keywords"),
    ("Creator", "Created with"),
    ("Producer", "Produced by"),
];

/// Parent chain depth limit when resolving an inherited MediaBox.
const MAX_INHERIT_DEPTH: usize = 16;

/// Last resort: document metadata and page sizes, with an explicit caveat
/// that the content itself is unavailable. Never returns an error.
pub struct MetadataExtractor;

impl LineExtractor for MetadataExtractor {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::Metadata
    }

    fn extract_lines(&self, pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        let described = panic::catch_unwind(AssertUnwindSafe(|| describe(pdf_bytes)))
            .unwrap_or_else(|p| Err(panic_message(&p)));
        Ok(described.unwrap_or_else(|error| diagnostic_lines(&error)))
    }
}

fn describe(pdf_bytes: &[u8]) -> Result<Vec<String>, String> {
    let doc = Document::load_mem(pdf_bytes).map_err(|e| e.to_string())?;
    let pages = doc.get_pages();

    let mut lines = vec![
        "PDF DOCUMENT".to_string(),
        "============".to_string(),
        String::new(),
    ];

    if let Some(info) = info_dictionary(&doc) {
        for (key, label) in INFO_FIELDS {
            if let Some(value) = info_value(&doc, info, key) {
                lines.push(format!("{label}: {value}"));
            }
        }
        lines.push(String::new());
    }

    lines.push(format!("Page count: {}", pages.len()));
    lines.push(String::new());

    for (number, page_id) in pages {
        lines.push(format!("PAGE {number}"));
        match page_size(&doc, page_id) {
            Some((w, h)) => lines.push(format!("Size: {w:.0} x {h:.0} points")),
            None => lines.push("Size: unknown".to_string()),
        }
        lines.push(String::new());
        lines.push("The content of this page could not be extracted.".to_string());
        lines.push("See the original PDF for the complete content.".to_string());
        lines.push(String::new());
    }

    lines.push("============".to_string());
    lines.push("Note: only document metadata could be recovered from this PDF.".to_string());
    lines.push("Install LibreOffice on the server for a full-text conversion.".to_string());
    Ok(lines)
}

fn diagnostic_lines(error: &str) -> Vec<String> {
    vec![
        "PDF information could not be read".to_string(),
        format!("Error: {error}"),
        String::new(),
        "Please try again with a valid PDF file.".to_string(),
    ]
}

fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
    match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn info_value(doc: &Document, info: &Dictionary, key: &str) -> Option<String> {
    let value = match info.get(key.as_bytes()).ok()? {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    match value {
        Object::String(bytes, _) => {
            let text = decode_pdf_string(bytes).trim().to_string();
            (!text.is_empty()).then_some(text)
        }
        _ => None,
    }
}

/// MediaBox width and height, following the Parent chain for inheritance.
fn page_size(doc: &Document, page_id: ObjectId) -> Option<(f32, f32)> {
    let mut dict = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_INHERIT_DEPTH {
        if let Ok(obj) = dict.get(b"MediaBox") {
            let obj = match obj {
                Object::Reference(id) => doc.get_object(*id).ok()?,
                other => other,
            };
            let values: Vec<f32> = obj
                .as_array()
                .ok()?
                .iter()
                .filter_map(|v| v.as_float().ok())
                .collect();
            if let [x1, y1, x2, y2] = values[..] {
                return Some(((x2 - x1).abs(), (y2 - y1).abs()));
            }
            return None;
        }
        let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
        dict = doc.get_dictionary(parent).ok()?;
    }
    None
}
