//! Report assembly: lay the summaries out as a document outline and render it
//! to `.docx` bytes in memory.

use crate::error::{DigestError, Result};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::state::{Report, SummarizedCollection};
use chrono::{DateTime, Local};
use docx_rs::{Docx, Paragraph, Run, Style, StyleType};
use std::io::Cursor;
use tracing::info;

/// One block of the report outline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Title(String),
    Heading { level: u8, text: String },
    Paragraph(String),
}

impl Block {
    fn heading(level: u8, text: impl Into<String>) -> Self {
        Block::Heading {
            level,
            text: text.into(),
        }
    }

    fn blank() -> Self {
        Block::Paragraph(String::new())
    }
}

/// Build the outline: title, timestamp, then one section per source and one
/// subsection per article.
pub fn outline(summaries: &SummarizedCollection, query: &str, generated_at: DateTime<Local>) -> Vec<Block> {
    let mut blocks = vec![
        Block::Title(format!("Research Analysis: {}", query)),
        Block::Paragraph(format!(
            "Generated on: {}",
            generated_at.format("%Y-%m-%d %H:%M:%S")
        )),
        Block::blank(),
    ];

    for (source, articles) in summaries {
        if articles.is_empty() {
            continue;
        }
        blocks.push(Block::heading(1, source.name()));
        blocks.push(Block::blank());

        for (title, entry) in articles {
            blocks.push(Block::heading(2, title.as_str()));
            blocks.push(Block::Paragraph(entry.body().to_string()));
            blocks.push(Block::Paragraph(format!("Source: {}", entry.link())));
            blocks.push(Block::blank());
        }
    }

    blocks
}

fn heading_style(level: u8) -> &'static str {
    match level {
        0 | 1 => "Heading1",
        2 => "Heading2",
        _ => "Heading3",
    }
}

fn styles() -> Vec<Style> {
    vec![
        Style::new("Title", StyleType::Paragraph).name("Title").size(52),
        Style::new("Heading1", StyleType::Paragraph)
            .name("Heading 1")
            .size(32)
            .bold(),
        Style::new("Heading2", StyleType::Paragraph)
            .name("Heading 2")
            .size(26)
            .bold(),
        Style::new("Heading3", StyleType::Paragraph)
            .name("Heading 3")
            .size(24)
            .bold(),
    ]
}

/// Render an outline to a Word document
pub fn render_docx(blocks: &[Block]) -> Result<Vec<u8>> {
    let mut docx = styles().into_iter().fold(Docx::new(), Docx::add_style);

    for block in blocks {
        let paragraph = match block {
            Block::Title(text) => Paragraph::new()
                .add_run(Run::new().add_text(text.as_str()))
                .style("Title"),
            Block::Heading { level, text } => Paragraph::new()
                .add_run(Run::new().add_text(text.as_str()))
                .style(heading_style(*level)),
            Block::Paragraph(text) if text.is_empty() => Paragraph::new(),
            Block::Paragraph(text) => Paragraph::new().add_run(Run::new().add_text(text.as_str())),
        };
        docx = docx.add_paragraph(paragraph);
    }

    let mut cursor = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut cursor)
        .map_err(|e| DigestError::Document(format!("Failed to pack document: {}", e)))?;
    Ok(cursor.into_inner())
}

/// Query reduced to alphanumerics, spaces and underscores, trailing
/// whitespace trimmed, each run of spaces replaced by one underscore
pub fn sanitize_query(query: &str) -> String {
    let kept: String = query
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '_')
        .collect();

    let mut sanitized = String::with_capacity(kept.len());
    let mut in_gap = false;
    for c in kept.trim_end().chars() {
        if c == ' ' {
            if !in_gap {
                sanitized.push('_');
            }
            in_gap = true;
        } else {
            sanitized.push(c);
            in_gap = false;
        }
    }
    sanitized
}

/// `research_analysis_{query}_{YYYYMMDD_HHMMSS}.docx`
pub fn document_name(query: &str, now: DateTime<Local>) -> String {
    format!(
        "research_analysis_{}_{}.docx",
        sanitize_query(query),
        now.format("%Y%m%d_%H%M%S")
    )
}

/// Build the report for a finished summarization
pub fn assemble_report(
    summaries: &SummarizedCollection,
    query: &str,
    now: DateTime<Local>,
    sink: &dyn ProgressSink,
) -> Result<Report> {
    sink.emit(ProgressEvent::ReportStarted);

    let blocks = outline(summaries, query, now);
    let bytes = render_docx(&blocks)?;
    let name = document_name(query, now);

    info!(name = %name, bytes = bytes.len(), "Report assembled");
    sink.emit(ProgressEvent::ReportFinished { name: name.clone() });
    Ok(Report { bytes, name })
}
