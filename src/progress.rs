//! Progress reporting.
//!
//! Stages never talk to a terminal or UI directly; they emit [`ProgressEvent`]s
//! into a caller-supplied [`ProgressSink`]. Any `Fn(ProgressEvent)` closure is a
//! sink, so the CLI can simply print each event.

use crate::config::Source;
use std::fmt;
use std::sync::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tracing::info;

/// A human-readable progress step emitted by a pipeline stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    ScrapeStarted { source: Source },
    ScrapingArticle { source: Source, title: String },
    ScrapeFinished { source: Source, articles: usize },
    SummarizeStarted,
    SummarizingSource { source: Source },
    SummarizingArticle { source: Source, title: String },
    SummarizeFinished,
    ReportStarted,
    ReportFinished { name: String },
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressEvent::ScrapeStarted { source } => write!(f, "- Scraping {} articles...", source),
            ProgressEvent::ScrapingArticle { title, .. } => write!(f, "Scraping {}...", title),
            ProgressEvent::ScrapeFinished { source, articles } => {
                write!(f, "- Scraping for {} complete ({} articles)...", source, articles)
            }
            ProgressEvent::SummarizeStarted => f.write_str("Starting summarization process..."),
            ProgressEvent::SummarizingSource { source } => {
                write!(f, "- Summarizing articles from {}...", source)
            }
            ProgressEvent::SummarizingArticle { title, .. } => write!(f, "Summarizing '{}'...", title),
            ProgressEvent::SummarizeFinished => f.write_str("- Summarization complete."),
            ProgressEvent::ReportStarted => f.write_str("- Creating analysis report..."),
            ProgressEvent::ReportFinished { name } => write!(f, "- Report ready: {}", name),
        }
    }
}

/// Receiver of progress events. Write-only from the pipeline's point of view.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn emit(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Sink that writes every event to the `tracing` log at info level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn emit(&self, event: ProgressEvent) {
        info!(target: "paperdigest::progress", "{}", event);
    }
}

/// Sink that forwards events into a tokio channel.
///
/// Events sent after the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<ProgressEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

/// Sink that keeps every event in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl ProgressSink for CollectingSink {
    fn emit(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
