//! PDF → text line extraction.
//!
//! Three methods, tried in order by `ExtractionChain`:
//! - text layer (`pdf-extract`)
//! - raw content-stream scan (`lopdf`), grouping runs by vertical position
//! - metadata only (`lopdf`), which never fails

pub mod chain;
pub mod content_stream;
pub mod metadata;
pub mod text_layer;

pub use chain::*;

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Emitted by the text-layer method when a PDF has no extractable text.
pub const NO_TEXT_SENTINEL: &str = "[No text extracted]";

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("No text found in page content")]
    NoText,

    #[error("Extractor panicked: {0}")]
    Panicked(String),
}

/// Which method produced an `ExtractedDocument`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    TextLayer,
    ContentStream,
    Metadata,
}

impl ExtractionMethod {
    /// Human label, shown in the provenance note of reconstructed documents.
    pub fn label(&self) -> &'static str {
        match self {
            Self::TextLayer => "pdf-extract (text layer)",
            Self::ContentStream => "lopdf (content stream scan)",
            Self::Metadata => "lopdf (metadata only)",
        }
    }

    pub fn is_highest_fidelity(&self) -> bool {
        matches!(self, Self::TextLayer)
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Ordered, normalized text lines. Never empty.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedDocument {
    pub lines: Vec<String>,
    pub method: ExtractionMethod,
}

impl ExtractedDocument {
    /// Lower-fidelity methods flag the result as degraded.
    pub fn is_degraded(&self) -> bool {
        !self.method.is_highest_fidelity()
    }
}

/// One PDF text-extraction method (allows mocking for tests).
pub trait LineExtractor: Send + Sync {
    fn method(&self) -> ExtractionMethod;

    fn extract_lines(&self, pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractionError>;
}

/// Decode a PDF string object: UTF-16BE with BOM, otherwise byte-per-char.
pub(crate) fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}
