//! Writing run artifacts to disk: the `.docx` report and a CSV of summaries.

use crate::error::Result;
use crate::state::{Report, SummarizedCollection};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// One CSV row per summarized article
#[derive(Debug, Serialize)]
struct SummaryRow<'a> {
    source: &'a str,
    title: &'a str,
    link: &'a str,
    status: &'a str,
    summary: &'a str,
}

/// Write the report into `dir` under its document name
pub fn save_report(report: &Report, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(&report.name);
    std::fs::write(&path, &report.bytes)?;
    info!(path = %path.display(), bytes = report.bytes.len(), "Saved report");
    Ok(path)
}

/// Save summaries as CSV. Writes nothing when there are no entries.
pub fn save_summaries_csv(summarized: &SummarizedCollection, path: &Path) -> Result<usize> {
    let rows: Vec<SummaryRow> = summarized
        .iter()
        .flat_map(|(source, articles)| {
            articles.iter().map(move |(title, entry)| SummaryRow {
                source: source.name(),
                title,
                link: entry.link(),
                status: if entry.is_failed() { "failed" } else { "summarized" },
                summary: entry.body(),
            })
        })
        .collect();

    if rows.is_empty() {
        info!(path = %path.display(), "No summaries to save");
        return Ok(0);
    }

    let mut wtr = csv::WriterBuilder::new().has_headers(true).from_path(path)?;
    for row in &rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;

    info!(path = %path.display(), rows = rows.len(), "Saved summaries");
    Ok(rows.len())
}
