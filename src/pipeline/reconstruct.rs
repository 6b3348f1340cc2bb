//! Document reconstruction: extracted text lines → Word document.
//!
//! Lines are classified as blank, heading or body, then wrapped with a title,
//! a provenance line naming the extraction method, and a closing note.
//! Degraded extractions get an extra advisory so they never pass as
//! full-fidelity conversions.

use std::io::Cursor;

use docx_rs::{AlignmentType, Docx, Paragraph, Run};
use serde::Serialize;

use crate::config::APP_NAME;
use crate::pipeline::extraction::{ExtractionChain, ExtractionMethod};
use crate::pipeline::format::document_title;
use crate::pipeline::orchestrator::ConversionJob;
use crate::pipeline::strategy::{ConversionOutput, ConversionStrategy, StrategyFailure, StrategyOutcome};

pub const RECONSTRUCT_STRATEGY: &str = "pdf-text-reconstruction";

// Run sizes are in half-points.
const TITLE_SIZE: usize = 32;
const HEADING_SIZE: usize = 26;
const BODY_SIZE: usize = 22;
const NOTE_SIZE: usize = 18;
const NOTE_COLOR: &str = "666666";

/// Heading-detection thresholds (character counts of the trimmed line).
#[derive(Debug, Clone, Serialize)]
pub struct HeadingRules {
    /// Capitalized lines shorter than this, not ending in a period, are headings.
    pub max_len: usize,
    /// Lines shorter than this ending in a colon are headings.
    pub colon_max_len: usize,
}

impl Default for HeadingRules {
    fn default() -> Self {
        Self {
            max_len: 60,
            colon_max_len: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    Heading,
    Body,
}

/// Classify one line. Rules are evaluated in order; the first match wins.
pub fn classify_line(line: &str, rules: &HeadingRules) -> LineKind {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LineKind::Blank;
    }

    let len = trimmed.chars().count();
    let starts_upper = trimmed.chars().next().is_some_and(char::is_uppercase);
    let ends_colon = trimmed.ends_with(':');

    if len < rules.max_len && starts_upper && (!trimmed.ends_with('.') || ends_colon) {
        return LineKind::Heading;
    }
    if (len < rules.colon_max_len && ends_colon) || is_marker(trimmed) {
        return LineKind::Heading;
    }
    LineKind::Body
}

/// `-- Page 3 --` style markers emitted by the extraction chain.
fn is_marker(trimmed: &str) -> bool {
    trimmed.len() > 4 && trimmed.starts_with("--") && trimmed.ends_with("--")
}

/// One element of the reconstructed document.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Title(String),
    Attribution(String),
    Heading(String),
    Body(String),
    Spacer,
    Note(String),
}

#[derive(Debug, Clone)]
pub struct ReconstructedDocument {
    pub blocks: Vec<Block>,
}

/// Build the block structure for `lines` produced by `method`.
pub fn build(
    title: &str,
    lines: &[String],
    method: ExtractionMethod,
    rules: &HeadingRules,
) -> ReconstructedDocument {
    let mut blocks = Vec::with_capacity(lines.len() + 6);
    blocks.push(Block::Title(title.to_string()));
    blocks.push(Block::Attribution(format!(
        "Converted from PDF using: {}",
        method.label()
    )));
    blocks.push(Block::Spacer);

    for line in lines {
        match classify_line(line, rules) {
            LineKind::Blank => blocks.push(Block::Spacer),
            LineKind::Heading => blocks.push(Block::Heading(line.trim().to_string())),
            LineKind::Body => blocks.push(Block::Body(line.trim().to_string())),
        }
    }

    blocks.push(Block::Spacer);
    blocks.push(Block::Note(format!(
        "This document was converted from PDF by {APP_NAME}. Layout, fonts, tables and images are not preserved."
    )));
    if !method.is_highest_fidelity() {
        blocks.push(Block::Note(
            "The PDF text layer could not be read directly, so a fallback extraction method was used. \
             Install LibreOffice on the server for a higher-fidelity conversion."
                .to_string(),
        ));
    }

    ReconstructedDocument { blocks }
}

impl ReconstructedDocument {
    pub fn to_docx(&self) -> Result<Vec<u8>, StrategyFailure> {
        let mut docx = Docx::new();
        for block in &self.blocks {
            docx = docx.add_paragraph(paragraph(block));
        }

        let mut cursor = Cursor::new(Vec::new());
        docx.build()
            .pack(&mut cursor)
            .map_err(|e| StrategyFailure::Render(format!("docx packing failed: {e}")))?;
        Ok(cursor.into_inner())
    }
}

fn paragraph(block: &Block) -> Paragraph {
    match block {
        Block::Title(text) => Paragraph::new()
            .add_run(Run::new().add_text(text).bold().size(TITLE_SIZE))
            .align(AlignmentType::Center),
        Block::Attribution(text) => Paragraph::new()
            .add_run(Run::new().add_text(text).italic().size(NOTE_SIZE).color(NOTE_COLOR))
            .align(AlignmentType::Center),
        Block::Heading(text) => {
            Paragraph::new().add_run(Run::new().add_text(text).bold().size(HEADING_SIZE))
        }
        Block::Body(text) => Paragraph::new().add_run(Run::new().add_text(text).size(BODY_SIZE)),
        Block::Spacer => Paragraph::new(),
        Block::Note(text) => Paragraph::new()
            .add_run(Run::new().add_text(text).italic().size(NOTE_SIZE).color(NOTE_COLOR)),
    }
}

/// PDF → Word fallback: extraction chain, then reconstruction.
pub struct ReconstructionStrategy {
    chain: ExtractionChain,
    rules: HeadingRules,
}

impl ReconstructionStrategy {
    pub fn new(chain: ExtractionChain, rules: HeadingRules) -> Self {
        Self { chain, rules }
    }
}

impl ConversionStrategy for ReconstructionStrategy {
    fn name(&self) -> &'static str {
        RECONSTRUCT_STRATEGY
    }

    fn run(&self, job: &ConversionJob) -> StrategyOutcome {
        let extracted = self.chain.extract(&job.source);
        tracing::info!(
            job_id = %job.id,
            method = %extracted.method,
            lines = extracted.lines.len(),
            degraded = extracted.is_degraded(),
            "Rebuilding document from extracted text"
        );

        let document = build(
            &document_title(&job.original_name),
            &extracted.lines,
            extracted.method,
            &self.rules,
        );
        document
            .to_docx()
            .and_then(|bytes| {
                ConversionOutput::emit(job, bytes, RECONSTRUCT_STRATEGY, extracted.is_degraded())
            })
            .into()
    }
}
