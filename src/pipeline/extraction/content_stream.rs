use std::panic::{self, AssertUnwindSafe};

use lopdf::content::Operation;
use lopdf::{Document, Object};

use super::{decode_pdf_string, ExtractionError, ExtractionMethod, LineExtractor};
use crate::pipeline::strategy::panic_message;

/// Vertical offsets closer than this belong to the same line.
const SAME_LINE_EPSILON: f32 = 0.5;

/// `TJ` adjustments at least this negative (thousandths of an em) are word gaps.
const TJ_SPACE_THRESHOLD: f32 = -250.0;

/// Walks each page's content stream and groups shown text into lines by
/// vertical position.
pub struct ContentStreamExtractor;

impl LineExtractor for ContentStreamExtractor {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::ContentStream
    }

    fn extract_lines(&self, pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        panic::catch_unwind(AssertUnwindSafe(|| scan(pdf_bytes)))
            .map_err(|p| ExtractionError::Panicked(panic_message(&p)))?
    }
}

fn scan(pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
    let doc = Document::load_mem(pdf_bytes).map_err(|e| ExtractionError::PdfParsing(e.to_string()))?;
    let pages = doc.get_pages();

    let mut lines = vec![format!("PDF document - {} pages", pages.len()), String::new()];
    let mut found_text = false;

    for (number, page_id) in pages {
        lines.push(format!("-- Page {number} --"));
        let content = doc
            .get_and_decode_page_content(page_id)
            .map_err(|e| ExtractionError::PdfParsing(format!("page {number}: {e}")))?;

        let page_lines = group_lines(&content.operations);
        found_text |= !page_lines.is_empty();
        lines.extend(page_lines);
        lines.push(String::new());
    }

    if !found_text {
        return Err(ExtractionError::NoText);
    }
    Ok(lines)
}

/// Text-positioning state of one content stream.
#[derive(Default)]
struct TextCursor {
    line_y: f32,
    leading: f32,
}

/// Append runs to the current line while their y matches the previous run;
/// start a new line when it changes.
fn group_lines(operations: &[Operation]) -> Vec<String> {
    let mut cursor = TextCursor::default();
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut last_y: Option<f32> = None;

    let mut show = |text: String, y: f32, current: &mut String, lines: &mut Vec<String>| {
        if let Some(prev) = last_y {
            if (y - prev).abs() > SAME_LINE_EPSILON {
                flush(current, lines);
            }
        }
        current.push_str(&text);
        last_y = Some(y);
    };

    for op in operations {
        let num = |i: usize| op.operands.get(i).and_then(|o| o.as_float().ok()).unwrap_or(0.0);
        match op.operator.as_str() {
            "BT" => cursor.line_y = 0.0,
            "Tm" => cursor.line_y = num(5),
            "Td" => cursor.line_y += num(1),
            "TD" => {
                cursor.leading = -num(1);
                cursor.line_y += num(1);
            }
            "TL" => cursor.leading = num(0),
            "T*" => cursor.line_y -= cursor.leading,
            "Tj" => {
                if let Some(text) = op.operands.first().and_then(string_operand) {
                    show(text, cursor.line_y, &mut current, &mut lines);
                }
            }
            "'" | "\"" => {
                cursor.line_y -= cursor.leading;
                if let Some(text) = op.operands.last().and_then(string_operand) {
                    show(text, cursor.line_y, &mut current, &mut lines);
                }
            }
            "TJ" => {
                if let Some(Object::Array(parts)) = op.operands.first() {
                    show(array_text(parts), cursor.line_y, &mut current, &mut lines);
                }
            }
            _ => {}
        }
    }
    flush(&mut current, &mut lines);
    lines
}

fn flush(current: &mut String, lines: &mut Vec<String>) {
    let line = current.trim().to_string();
    if !line.is_empty() {
        lines.push(line);
    }
    current.clear();
}

fn string_operand(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => Some(printable(&decode_pdf_string(bytes))),
        _ => None,
    }
}

fn array_text(parts: &[Object]) -> String {
    let mut text = String::new();
    for part in parts {
        match part {
            Object::String(..) => {
                if let Some(s) = string_operand(part) {
                    text.push_str(&s);
                }
            }
            other => {
                let adjust = other.as_float().unwrap_or(0.0);
                if adjust <= TJ_SPACE_THRESHOLD && !text.ends_with(' ') {
                    text.push(' ');
                }
            }
        }
    }
    text
}

fn printable(s: &str) -> String {
    s.chars().filter(|c| !c.is_control() || *c == '\t').collect()
}
