//! Run state threaded through the pipeline.
//!
//! Each stage produces a new slice of state; [`RunState`] is rebuilt by
//! consuming transitions rather than mutated in place.

use crate::config::{RunConfig, Source};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw article text scraped from a publisher page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedArticle {
    /// Article URL
    pub link: String,
    /// Paragraph text joined with single spaces
    pub content: String,
}

/// source -> title -> article
pub type ScrapedCollection = BTreeMap<Source, BTreeMap<String, ScrapedArticle>>;

/// Outcome of summarizing one article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SummaryEntry {
    Summarized { link: String, summary: String },
    Failed { link: String, message: String },
}

impl SummaryEntry {
    pub fn link(&self) -> &str {
        match self {
            SummaryEntry::Summarized { link, .. } | SummaryEntry::Failed { link, .. } => link,
        }
    }

    /// Summary text, or the failure message for failed entries
    pub fn body(&self) -> &str {
        match self {
            SummaryEntry::Summarized { summary, .. } => summary,
            SummaryEntry::Failed { message, .. } => message,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SummaryEntry::Failed { .. })
    }
}

/// source -> title -> summary entry
pub type SummarizedCollection = BTreeMap<Source, BTreeMap<String, SummaryEntry>>;

/// Token usage tracking
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn add(&mut self, other: &TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// Assembled Word document held in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub bytes: Vec<u8>,
    pub name: String,
}

/// Accumulated state of one pipeline run
#[derive(Debug, Clone)]
pub struct RunState {
    pub config: RunConfig,
    pub scraped: ScrapedCollection,
    pub summarized: SummarizedCollection,
    pub token_usage: TokenUsage,
    pub report: Option<Report>,
}

impl RunState {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            scraped: ScrapedCollection::new(),
            summarized: SummarizedCollection::new(),
            token_usage: TokenUsage::default(),
            report: None,
        }
    }

    pub fn with_scraped(self, scraped: ScrapedCollection) -> Self {
        Self { scraped, ..self }
    }

    pub fn with_summaries(self, summarized: SummarizedCollection, token_usage: TokenUsage) -> Self {
        Self {
            summarized,
            token_usage,
            ..self
        }
    }

    pub fn with_report(self, report: Report) -> Self {
        Self {
            report: Some(report),
            ..self
        }
    }

    pub fn document_bytes(&self) -> Option<&[u8]> {
        self.report.as_ref().map(|r| r.bytes.as_slice())
    }

    pub fn document_name(&self) -> Option<&str> {
        self.report.as_ref().map(|r| r.name.as_str())
    }

    /// Number of scraped articles across all sources
    pub fn scraped_count(&self) -> usize {
        self.scraped.values().map(BTreeMap::len).sum()
    }

    /// (succeeded, failed) summary counts
    pub fn summary_counts(&self) -> (usize, usize) {
        let failed = self
            .summarized
            .values()
            .flat_map(BTreeMap::values)
            .filter(|e| e.is_failed())
            .count();
        let total: usize = self.summarized.values().map(BTreeMap::len).sum();
        (total - failed, failed)
    }
}
