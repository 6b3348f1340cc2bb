use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Extensions accepted at the upload boundary (lowercase, without dot).
pub const ACCEPTED_EXTENSIONS: [&str; 3] = ["doc", "docx", "pdf"];

/// Conversion direction. Decided solely by the input extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    WordToPdf,
    PdfToWord,
}

impl Direction {
    /// Dispatch on a file name. `None` means the format is unsupported.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let ext = source_extension(file_name)?;
        match ext.as_str() {
            "doc" | "docx" => Some(Self::WordToPdf),
            "pdf" => Some(Self::PdfToWord),
            _ => None,
        }
    }

    /// Target extension, without dot.
    pub fn target_extension(&self) -> &'static str {
        match self {
            Self::WordToPdf => "pdf",
            Self::PdfToWord => "docx",
        }
    }

    pub fn target_mime(&self) -> &'static str {
        match self {
            Self::WordToPdf => PDF_MIME,
            Self::PdfToWord => DOCX_MIME,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WordToPdf => "word_to_pdf",
            Self::PdfToWord => "pdf_to_word",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercased extension of a file name, if any.
pub fn source_extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Output file name: the source extension replaced by the target one.
///
/// `report.docx` → `report.pdf`, `Scan.PDF` → `Scan.docx`.
pub fn output_file_name(original: &str, direction: Direction) -> String {
    let stem = Path::new(original)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("document");
    format!("{stem}.{}", direction.target_extension())
}

/// Human title derived from the upload name (file stem).
pub fn document_title(original: &str) -> String {
    Path::new(original)
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("Document")
        .to_string()
}

/// ASCII-only file name safe to place inside a quoted `Content-Disposition` value.
pub fn header_safe_file_name(name: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let re = UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._\- ]").expect("static regex"));
    let cleaned = re.replace_all(name, "_");
    let trimmed = cleaned.trim();
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '.' || c == '_') {
        "converted".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_extensions_convert_to_pdf() {
        assert_eq!(Direction::from_file_name("a.doc"), Some(Direction::WordToPdf));
        assert_eq!(Direction::from_file_name("a.docx"), Some(Direction::WordToPdf));
        assert_eq!(Direction::from_file_name("A.DOCX"), Some(Direction::WordToPdf));
    }

    #[test]
    fn pdf_converts_to_word() {
        assert_eq!(Direction::from_file_name("scan.pdf"), Some(Direction::PdfToWord));
        assert_eq!(Direction::from_file_name("scan.Pdf"), Some(Direction::PdfToWord));
    }

    #[test]
    fn everything_else_is_rejected() {
        for name in ["notes.txt", "image.png", "archive.docx.zip", "noext", "", ".pdf"] {
            assert_eq!(Direction::from_file_name(name), None, "{name} should be rejected");
        }
    }

    #[test]
    fn accepted_extensions_all_dispatch() {
        for ext in ACCEPTED_EXTENSIONS {
            assert!(Direction::from_file_name(&format!("f.{ext}")).is_some());
        }
    }

    #[test]
    fn output_name_swaps_extension() {
        assert_eq!(output_file_name("report.docx", Direction::WordToPdf), "report.pdf");
        assert_eq!(output_file_name("old.doc", Direction::WordToPdf), "old.pdf");
        assert_eq!(output_file_name("Scan.PDF", Direction::PdfToWord), "Scan.docx");
        assert_eq!(output_file_name("my.report.v2.pdf", Direction::PdfToWord), "my.report.v2.docx");
    }

    #[test]
    fn target_mime_types() {
        assert_eq!(Direction::WordToPdf.target_mime(), "application/pdf");
        assert!(Direction::PdfToWord.target_mime().contains("wordprocessingml"));
    }

    #[test]
    fn header_name_strips_quotes_and_non_ascii() {
        assert_eq!(header_safe_file_name("Résumé \"final\".pdf"), "R_sum_ _final_.pdf");
        assert_eq!(header_safe_file_name("plain-name_1.docx"), "plain-name_1.docx");
        assert_eq!(header_safe_file_name("\"\""), "converted");
    }

    #[test]
    fn title_from_stem() {
        assert_eq!(document_title("Quarterly Report.docx"), "Quarterly Report");
        assert_eq!(document_title(".docx"), ".docx");
        assert_eq!(document_title(""), "Document");
    }
}
