use std::panic::{self, AssertUnwindSafe};

use super::content_stream::ContentStreamExtractor;
use super::metadata::MetadataExtractor;
use super::text_layer::TextLayerExtractor;
use super::{ExtractedDocument, ExtractionError, ExtractionMethod, LineExtractor, NO_TEXT_SENTINEL};
use crate::pipeline::strategy::panic_message;

/// Results with at most this many lines are checked for the no-text sentinel.
const DEGENERATE_MAX_LINES: usize = 3;

/// Ordered extraction methods. Never fails outward.
pub struct ExtractionChain {
    methods: Vec<Box<dyn LineExtractor>>,
}

impl Default for ExtractionChain {
    fn default() -> Self {
        Self::new(vec![
            Box::new(TextLayerExtractor),
            Box::new(ContentStreamExtractor),
            Box::new(MetadataExtractor),
        ])
    }
}

impl ExtractionChain {
    pub fn new(methods: Vec<Box<dyn LineExtractor>>) -> Self {
        Self { methods }
    }

    /// Try each method in order; the first non-degenerate result wins.
    pub fn extract(&self, pdf_bytes: &[u8]) -> ExtractedDocument {
        let mut last_error = String::from("no extraction method configured");

        for extractor in &self.methods {
            let method = extractor.method();
            let result = panic::catch_unwind(AssertUnwindSafe(|| extractor.extract_lines(pdf_bytes)))
                .unwrap_or_else(|p| Err(ExtractionError::Panicked(panic_message(&p))));

            match result {
                Ok(lines) if is_degenerate(&lines) => {
                    tracing::warn!(method = %method, lines = lines.len(), "Degenerate extraction result, trying next method");
                    last_error = format!("{method}: no text extracted");
                }
                Ok(lines) => {
                    tracing::info!(method = %method, lines = lines.len(), "Text extracted");
                    return ExtractedDocument {
                        lines: normalize(lines),
                        method,
                    };
                }
                Err(e) => {
                    tracing::warn!(method = %method, error = %e, "Extraction method failed, trying next");
                    last_error = format!("{method}: {e}");
                }
            }
        }

        // Only reachable with a custom chain lacking the metadata method
        ExtractedDocument {
            lines: vec![
                "Text could not be extracted from this PDF.".to_string(),
                format!("Error: {last_error}"),
            ],
            method: ExtractionMethod::Metadata,
        }
    }
}

/// Three or fewer lines carrying the no-text sentinel, or nothing at all.
pub fn is_degenerate(lines: &[String]) -> bool {
    if lines.iter().all(|l| l.trim().is_empty()) {
        return true;
    }
    lines.len() <= DEGENERATE_MAX_LINES && lines.iter().any(|l| l.contains(NO_TEXT_SENTINEL))
}

/// Trim trailing whitespace and collapse blank-line runs to a single blank.
/// Never returns an empty sequence.
pub fn normalize(lines: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    for line in lines {
        let line = line.trim_end().to_string();
        if line.trim().is_empty() {
            if out.last().is_some_and(|prev| prev.is_empty()) {
                continue;
            }
            out.push(String::new());
        } else {
            out.push(line);
        }
    }
    if out.iter().all(|l| l.is_empty()) {
        return vec![NO_TEXT_SENTINEL.to_string()];
    }
    out
}
