use std::panic::{self, AssertUnwindSafe};

use super::{ExtractionError, ExtractionMethod, LineExtractor, NO_TEXT_SENTINEL};
use crate::pipeline::strategy::panic_message;

/// General-purpose extraction of the embedded text layer via pdf-extract.
/// Scanned (image-only) PDFs yield the no-text sentinel.
pub struct TextLayerExtractor;

impl LineExtractor for TextLayerExtractor {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::TextLayer
    }

    fn extract_lines(&self, pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        // pdf-extract panics on some malformed fonts and encodings
        let pages = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
        }))
        .map_err(|p| ExtractionError::Panicked(panic_message(&p)))?
        .map_err(|e| ExtractionError::PdfParsing(e.to_string()))?;

        let mut lines = Vec::new();
        for page in &pages {
            for line in page.lines() {
                lines.push(line.trim_end().to_string());
            }
            lines.push(String::new());
        }

        if lines.iter().all(|l| l.trim().is_empty()) {
            return Ok(vec![NO_TEXT_SENTINEL.to_string()]);
        }
        Ok(lines)
    }
}
