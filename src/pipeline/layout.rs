//! PDF layout engine: plain text lines → paginated A4 pages.
//!
//! Layout is a pure function producing positioned lines; `render_pdf` then
//! draws them with printpdf's built-in Helvetica (no font files needed).

use std::io::BufWriter;

use printpdf::{BuiltinFont, Mm, PdfDocument, Pt};
use serde::Serialize;

use crate::pipeline::format::document_title;
use crate::pipeline::orchestrator::ConversionJob;
use crate::pipeline::strategy::{ConversionOutput, ConversionStrategy, StrategyFailure, StrategyOutcome};
use crate::pipeline::word_text;

pub const LAYOUT_STRATEGY: &str = "text-layout";

/// Page geometry and typography, all in points.
#[derive(Debug, Clone, Serialize)]
pub struct LayoutSettings {
    /// Source text is processed in chunks of whole lines up to this many characters.
    pub chunk_chars: usize,
    pub font_size: f32,
    pub title_size: f32,
    /// Line advance as a multiple of the font size.
    pub line_height: f32,
    pub margin: f32,
    pub page_width: f32,
    pub page_height: f32,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            chunk_chars: 3000,
            font_size: 11.0,
            title_size: 16.0,
            line_height: 1.2,
            margin: 50.0,
            page_width: 595.28,
            page_height: 841.89,
        }
    }
}

impl LayoutSettings {
    pub fn content_width(&self) -> f32 {
        self.page_width - 2.0 * self.margin
    }
}

/// One drawn line. `y` is the baseline, measured from the page bottom.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedLine {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub bold: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PageLayout {
    pub lines: Vec<PlacedLine>,
}

// ═══════════════════════════════════════════════════════════
// Metrics
// ═══════════════════════════════════════════════════════════

/// Helvetica advance widths for ASCII 32..=126, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // space../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0-9
    278, 278, 584, 584, 584, 556, 1015, // :..@
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, 778, 722,
    667, 611, 722, 667, 944, 667, 667, 611, // A-Z
    278, 278, 278, 469, 556, 333, // [..`
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, 556, 556, 333,
    500, 278, 556, 500, 722, 500, 500, 500, // a-z
    334, 260, 334, 584, // {..~
];
const DEFAULT_WIDTH: u16 = 556;
const BOLD_FACTOR: f32 = 1.06;

/// Approximate rendered width of `text` in points.
pub fn text_width(text: &str, size: f32, bold: bool) -> f32 {
    let units: u32 = text
        .chars()
        .map(|c| {
            let code = c as u32;
            if (32..=126).contains(&code) {
                HELVETICA_WIDTHS[(code - 32) as usize] as u32
            } else if c == '\t' {
                4 * HELVETICA_WIDTHS[0] as u32
            } else {
                DEFAULT_WIDTH as u32
            }
        })
        .sum();
    let width = units as f32 * size / 1000.0;
    if bold {
        width * BOLD_FACTOR
    } else {
        width
    }
}

/// Greedy word wrap. A word wider than `max_width` goes alone on its line.
pub fn wrap_line(line: &str, size: f32, bold: bool, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in line.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{current} {word}");
        if text_width(&candidate, size, bold) <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Group whole lines into chunks of at most `chunk_chars` characters.
/// A single longer line forms its own chunk.
pub fn chunk_lines(lines: &[String], chunk_chars: usize) -> Vec<&[String]> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut size = 0;
    for (i, line) in lines.iter().enumerate() {
        let len = line.chars().count() + 1;
        if i > start && size + len > chunk_chars.max(1) {
            chunks.push(&lines[start..i]);
            start = i;
            size = 0;
        }
        size += len;
    }
    if start < lines.len() {
        chunks.push(&lines[start..]);
    }
    chunks
}

// ═══════════════════════════════════════════════════════════
// Layout
// ═══════════════════════════════════════════════════════════

struct Cursor<'a> {
    settings: &'a LayoutSettings,
    pages: Vec<PageLayout>,
    y: f32,
}

impl<'a> Cursor<'a> {
    fn new(settings: &'a LayoutSettings) -> Self {
        Self {
            settings,
            pages: vec![PageLayout::default()],
            y: settings.page_height - settings.margin,
        }
    }

    /// Place one line, breaking to a new page when its baseline would pass the bottom margin.
    fn place(&mut self, text: String, size: f32, bold: bool) {
        let baseline = self.y - size;
        let baseline = if baseline < self.settings.margin {
            self.pages.push(PageLayout::default());
            self.y = self.settings.page_height - self.settings.margin;
            self.y - size
        } else {
            baseline
        };

        if let Some(page) = self.pages.last_mut() {
            page.lines.push(PlacedLine {
                text,
                x: self.settings.margin,
                y: baseline,
                size,
                bold,
            });
        }
        self.y -= size * self.settings.line_height;
    }

    fn skip(&mut self) {
        self.y -= self.settings.font_size * self.settings.line_height;
    }
}

/// Lay out a bold title (first page only) followed by `lines`.
pub fn layout(title: &str, lines: &[String], settings: &LayoutSettings) -> Vec<PageLayout> {
    let mut cursor = Cursor::new(settings);
    let width = settings.content_width();

    for segment in wrap_line(title, settings.title_size, true, width) {
        cursor.place(segment, settings.title_size, true);
    }
    cursor.skip();

    for chunk in chunk_lines(lines, settings.chunk_chars) {
        for line in chunk {
            if line.trim().is_empty() {
                cursor.skip();
                continue;
            }
            for segment in wrap_line(line, settings.font_size, false, width) {
                cursor.place(segment, settings.font_size, false);
            }
        }
    }

    cursor.pages
}

// ═══════════════════════════════════════════════════════════
// Rendering
// ═══════════════════════════════════════════════════════════

pub fn render_pdf(
    title: &str,
    pages: &[PageLayout],
    settings: &LayoutSettings,
) -> Result<Vec<u8>, StrategyFailure> {
    let width = Mm::from(Pt(settings.page_width));
    let height = Mm::from(Pt(settings.page_height));

    let (doc, first_page, first_layer) = PdfDocument::new(title, width, height, "Layer 1");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| StrategyFailure::Render(format!("PDF font error: {e}")))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| StrategyFailure::Render(format!("PDF font error: {e}")))?;

    for (i, page) in pages.iter().enumerate() {
        let (page_idx, layer_idx) = if i == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(width, height, "Layer 1")
        };
        let layer = doc.get_page(page_idx).get_layer(layer_idx);
        for line in &page.lines {
            let face = if line.bold { &bold } else { &font };
            layer.use_text(
                line.text.as_str(),
                line.size,
                Mm::from(Pt(line.x)),
                Mm::from(Pt(line.y)),
                face,
            );
        }
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| StrategyFailure::Render(format!("PDF save error: {e}")))?;
    buf.into_inner()
        .map_err(|e| StrategyFailure::Render(format!("PDF buffer error: {e}")))
}

/// Word → PDF fallback: paragraph text, laid out and rendered.
pub struct LayoutStrategy {
    settings: LayoutSettings,
}

impl LayoutStrategy {
    pub fn new(settings: LayoutSettings) -> Self {
        Self { settings }
    }

    fn convert(&self, job: &ConversionJob) -> Result<ConversionOutput, StrategyFailure> {
        let lines = word_text::paragraphs(&job.source)?;
        let title = document_title(&job.original_name);
        let pages = layout(&title, &lines, &self.settings);
        tracing::info!(
            job_id = %job.id,
            paragraphs = lines.len(),
            pages = pages.len(),
            "Rendering PDF from document text"
        );
        let bytes = render_pdf(&title, &pages, &self.settings)?;
        ConversionOutput::emit(job, bytes, LAYOUT_STRATEGY, true)
    }
}

impl ConversionStrategy for LayoutStrategy {
    fn name(&self) -> &'static str {
        LAYOUT_STRATEGY
    }

    fn run(&self, job: &ConversionJob) -> StrategyOutcome {
        self.convert(job).into()
    }
}
