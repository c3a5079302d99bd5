//! Pipeline driver: scrape, summarize, assemble.
//!
//! Each stage sees only the slice of run state it needs and hands back a new
//! slice; the driver folds those into the next [`RunState`]. The first error
//! that escapes a stage aborts the run, so no partial report is produced.

use crate::browser::{BrowserLauncher, ChromeLauncher};
use crate::config::RunConfig;
use crate::error::Result;
use crate::llm::{GeminiClient, LanguageModel};
use crate::progress::ProgressSink;
use crate::report::assemble_report;
use crate::scrape::{scrape_sources, ScrapeOptions};
use crate::state::RunState;
use crate::summarize::summarize_articles;
use chrono::Local;
use std::sync::Arc;
use tracing::info;

/// A configured pipeline with its browser and model collaborators
#[derive(Clone)]
pub struct Pipeline {
    launcher: Arc<dyn BrowserLauncher>,
    model: Arc<dyn LanguageModel>,
    scrape_options: ScrapeOptions,
}

impl Pipeline {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            launcher,
            model,
            scrape_options: ScrapeOptions::default(),
        }
    }

    pub fn with_scrape_options(mut self, options: ScrapeOptions) -> Self {
        self.scrape_options = options;
        self
    }

    /// Execute one run end to end
    pub async fn run(&self, config: RunConfig, sink: &dyn ProgressSink) -> Result<RunState> {
        config.validate()?;
        info!(
            query = %config.query,
            sources = ?config.sources,
            pages = config.pages_to_search,
            depth = config.page_depth,
            summarization = %config.summarization_depth,
            model = self.model.name(),
            "Starting research run"
        );

        let state = RunState::new(config);

        let scraped = scrape_sources(&state.config, self.launcher.as_ref(), &self.scrape_options, sink).await?;
        let state = state.with_scraped(scraped);

        let (summarized, usage) = summarize_articles(
            &state.scraped,
            state.config.summarization_depth,
            self.model.as_ref(),
            sink,
        )
        .await;
        let state = state.with_summaries(summarized, usage);

        let report = assemble_report(&state.summarized, &state.config.query, Local::now(), sink)?;
        let state = state.with_report(report);

        let (ok, failed) = state.summary_counts();
        info!(
            scraped = state.scraped_count(),
            summarized = ok,
            failed = failed,
            total_tokens = state.token_usage.total_tokens,
            "Research run complete"
        );
        Ok(state)
    }
}

/// Run with the default collaborators: headless Chromium and Gemini (`config.model`)
pub async fn run(config: RunConfig, sink: &dyn ProgressSink) -> Result<RunState> {
    let model = GeminiClient::new(config.model.clone())?;
    Pipeline::new(Arc::new(ChromeLauncher::default()), Arc::new(model))
        .run(config, sink)
        .await
}
