use docx_rs::{read_docx, DocumentChild, Paragraph, ParagraphChild, RunChild};

use crate::pipeline::strategy::StrategyFailure;

/// OLE compound-file signature of legacy binary `.doc` files.
const OLE_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Plain text of a Word document, one entry per paragraph (empty paragraphs
/// kept as blank lines).
///
/// Only the OOXML (`.docx`) container is readable here. Legacy binary `.doc`
/// files need the office tool.
pub fn paragraphs(bytes: &[u8]) -> Result<Vec<String>, StrategyFailure> {
    if bytes.starts_with(&OLE_SIGNATURE) {
        return Err(StrategyFailure::Extraction(
            "legacy binary .doc files can only be converted with LibreOffice".into(),
        ));
    }

    let docx = read_docx(bytes)
        .map_err(|e| StrategyFailure::Extraction(format!("could not read Word document: {e}")))?;

    Ok(docx
        .document
        .children
        .iter()
        .filter_map(|child| match child {
            DocumentChild::Paragraph(p) => Some(paragraph_text(p)),
            _ => None,
        })
        .collect())
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut text = String::new();
    for child in &paragraph.children {
        if let ParagraphChild::Run(run) = child {
            for rc in &run.children {
                match rc {
                    RunChild::Text(t) => text.push_str(&t.text),
                    RunChild::Tab(_) => text.push('\t'),
                    _ => {}
                }
            }
        }
    }
    text
}
