//! Run configuration: which publishers to query, how deep to go, and how much
//! article text the model gets to see.

use crate::error::{DigestError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound on search result pages per source
pub const MAX_PAGES_TO_SEARCH: u32 = 5;

/// Upper bound on articles visited per search result page
pub const MAX_PAGE_DEPTH: u32 = 10;

/// Default Gemini model used for summarization
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Models offered by the CLI help text
pub const KNOWN_MODELS: &[&str] = &["gemini-2.5-flash-lite", "gemini-2.5-flash", "gemini-2.5-pro"];

/// Academic publisher the pipeline knows how to scrape.
///
/// The declaration order is the order sources appear in collections and in the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum Source {
    #[serde(rename = "IEEE", alias = "ieee")]
    #[value(name = "ieee")]
    Ieee,
    #[serde(rename = "Springer", alias = "springer")]
    #[value(name = "springer")]
    Springer,
    #[serde(rename = "MDPI", alias = "mdpi")]
    #[value(name = "mdpi")]
    Mdpi,
}

impl Source {
    /// Display name used in headings and progress lines
    pub fn name(&self) -> &'static str {
        match self {
            Source::Ieee => "IEEE",
            Source::Springer => "Springer",
            Source::Mdpi => "MDPI",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How much of each article is sent to the model.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum SummarizationDepth {
    #[serde(alias = "low")]
    Low,
    #[default]
    #[serde(alias = "moderate")]
    Moderate,
    #[serde(alias = "high")]
    High,
    #[serde(alias = "max")]
    Max,
}

impl SummarizationDepth {
    /// Character cap applied before prompting. `None` sends the whole article.
    pub fn char_limit(&self) -> Option<usize> {
        match self {
            SummarizationDepth::Low => Some(10_000),
            SummarizationDepth::Moderate => Some(15_000),
            SummarizationDepth::High => Some(25_000),
            SummarizationDepth::Max => None,
        }
    }

    /// Cap historically advertised to users for this level.
    ///
    /// These do not match [`SummarizationDepth::char_limit`]; the applied caps
    /// are authoritative, this is only logged next to them when summarization starts.
    pub fn advertised_char_limit(&self) -> Option<usize> {
        match self {
            SummarizationDepth::Low => Some(15_000),
            SummarizationDepth::Moderate => Some(25_000),
            SummarizationDepth::High => Some(35_000),
            SummarizationDepth::Max => None,
        }
    }
}

impl fmt::Display for SummarizationDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SummarizationDepth::Low => "Low",
            SummarizationDepth::Moderate => "Moderate",
            SummarizationDepth::High => "High",
            SummarizationDepth::Max => "Max",
        };
        f.write_str(name)
    }
}

/// Immutable configuration for one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Research query submitted to every source
    pub query: String,
    /// Publishers to scrape
    pub sources: Vec<Source>,
    /// Search result pages per source
    #[serde(default = "default_pages_to_search")]
    pub pages_to_search: u32,
    /// Articles visited per search result page
    #[serde(default = "default_page_depth")]
    pub page_depth: u32,
    /// Truncation policy applied before summarization
    #[serde(default)]
    pub summarization_depth: SummarizationDepth,
    /// Model identifier passed to the language model
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_pages_to_search() -> u32 {
    1
}

fn default_page_depth() -> u32 {
    3
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

impl RunConfig {
    /// Create a configuration with default depth settings
    pub fn new(query: impl Into<String>, sources: Vec<Source>) -> Self {
        Self {
            query: query.into(),
            sources,
            pages_to_search: default_pages_to_search(),
            page_depth: default_page_depth(),
            summarization_depth: SummarizationDepth::default(),
            model: default_model(),
        }
    }

    /// Check the run invariants before any browser is launched.
    pub fn validate(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(DigestError::Validation(
                "Research query must not be empty".to_string(),
            ));
        }
        if self.sources.is_empty() {
            return Err(DigestError::Validation(
                "At least one source must be selected".to_string(),
            ));
        }
        if !(1..=MAX_PAGES_TO_SEARCH).contains(&self.pages_to_search) {
            return Err(DigestError::Validation(format!(
                "pages_to_search must be between 1 and {}, got {}",
                MAX_PAGES_TO_SEARCH, self.pages_to_search
            )));
        }
        if !(1..=MAX_PAGE_DEPTH).contains(&self.page_depth) {
            return Err(DigestError::Validation(format!(
                "page_depth must be between 1 and {}, got {}",
                MAX_PAGE_DEPTH, self.page_depth
            )));
        }
        if self.model.trim().is_empty() {
            return Err(DigestError::Validation(
                "Model identifier must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
