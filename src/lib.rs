//! # paperdigest
//!
//! Research digest pipeline: scrape open-access articles from academic
//! publishers, summarize each one with a language model, and assemble a Word
//! report.
//!
//! ## Modules
//!
//! - [`scrape`] - Browser-driven traversal of publisher search results
//! - [`sites`] - Per-publisher URLs and selectors (IEEE, Springer, MDPI)
//! - [`summarize`] - One structured model call per article
//! - [`report`] - Document outline and `.docx` rendering
//! - [`pipeline`] - Stage composition and the [`run`] entry point
//! - [`browser`] - Chromium session management
//! - [`llm`] - Gemini client
//! - [`progress`] - Progress events and sinks
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use paperdigest::{run, RunConfig, Source, TracingSink};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = RunConfig::new("graph neural networks", vec![Source::Ieee]);
//!     let state = run(config, &TracingSink).await?;
//!     println!("Report: {:?}", state.document_name());
//!     Ok(())
//! }
//! ```

pub mod browser;
pub mod config;
pub mod error;
pub mod llm;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod report;
pub mod scrape;
pub mod sites;
pub mod state;
pub mod summarize;

#[cfg(test)]
mod testing;

pub use config::{RunConfig, Source, SummarizationDepth};
pub use error::{DigestError, Result};
pub use pipeline::{run, Pipeline};
pub use progress::{ProgressEvent, ProgressSink, TracingSink};
pub use state::RunState;
