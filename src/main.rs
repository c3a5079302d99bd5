//! paperdigest - Publisher Scrape -> LLM Summary -> Word Report
//!
//! Scrapes open-access articles from IEEE Xplore, Springer and MDPI, summarizes
//! each with Gemini, and writes a `.docx` research report.
//!
//! ## Usage
//!
//! ### CLI Mode
//! ```bash
//! paperdigest research "graph neural networks" --source ieee --source mdpi --depth 3
//! ```
//!
//! ### HTTP Server Mode
//! ```bash
//! paperdigest serve --port 3000
//! ```

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use clap::{Parser, Subcommand};
use paperdigest::browser::{BrowserOptions, ChromeLauncher};
use paperdigest::config::{DEFAULT_MODEL, KNOWN_MODELS, MAX_PAGES_TO_SEARCH, MAX_PAGE_DEPTH};
use paperdigest::llm::GeminiClient;
use paperdigest::output::{save_report, save_summaries_csv};
use paperdigest::progress::ChannelSink;
use paperdigest::report::sanitize_query;
use paperdigest::scrape::ScrapeOptions;
use paperdigest::{DigestError, Pipeline, ProgressEvent, RunConfig, Source, SummarizationDepth};
use serde_json::json;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, EnvFilter};

/// MIME type of `.docx` files
const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

// ============================================================================
// CLI Definition
// ============================================================================

/// Research digest pipeline - scrape, summarize, report
#[derive(Parser)]
#[command(name = "paperdigest")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape, summarize and write a report for one query
    Research {
        /// Research query
        query: String,

        /// Publisher to search (repeatable)
        #[arg(long = "source", value_enum, default_values_t = [Source::Ieee])]
        sources: Vec<Source>,

        /// Search result pages per source
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=MAX_PAGES_TO_SEARCH as i64))]
        pages: u32,

        /// Articles visited per result page
        #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..=MAX_PAGE_DEPTH as i64))]
        depth: u32,

        /// How much article text the model sees:
        /// low (10k chars), moderate (15k), high (25k), max (everything)
        #[arg(long, value_enum, default_value_t = SummarizationDepth::Moderate)]
        summarization: SummarizationDepth,

        /// Gemini model (e.g. gemini-2.5-flash-lite, gemini-2.5-flash, gemini-2.5-pro)
        #[arg(long, default_value = DEFAULT_MODEL)]
        model: String,

        /// Output directory
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Show the browser window
        #[arg(long)]
        headful: bool,

        /// Chrome/Chromium executable
        #[arg(long, env = "CHROME_BIN")]
        chrome: Option<PathBuf>,

        /// Seconds to wait for a page to render
        #[arg(long, default_value_t = 20)]
        wait_secs: u64,

        /// Pause 0.5-2s at random before each search page
        #[arg(long)]
        polite: bool,
    },

    /// Run as HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
}

/// Research command arguments after parsing
struct ResearchArgs {
    config: RunConfig,
    output: PathBuf,
    browser: BrowserOptions,
    scrape: ScrapeOptions,
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    if cli.json_logs {
        fmt().json().with_env_filter(filter).with_target(true).init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .init();
    }

    match cli.command {
        Commands::Research {
            query,
            sources,
            pages,
            depth,
            summarization,
            model,
            output,
            headful,
            chrome,
            wait_secs,
            polite,
        } => {
            let config = RunConfig {
                query,
                sources,
                pages_to_search: pages,
                page_depth: depth,
                summarization_depth: summarization,
                model,
            };
            let browser = BrowserOptions {
                headless: !headful,
                executable: chrome,
                ..Default::default()
            };
            run_research(ResearchArgs {
                config,
                output,
                browser,
                scrape: ScrapeOptions {
                    wait_timeout: Duration::from_secs(wait_secs),
                    polite_delay: polite,
                    ..Default::default()
                },
            })
            .await
        }
        Commands::Serve { port, host } => run_server(host, port).await,
    }
}

// ============================================================================
// Research Command
// ============================================================================

async fn run_research(args: ResearchArgs) -> Result<()> {
    let ResearchArgs {
        config,
        output,
        browser,
        scrape,
    } = args;

    if !KNOWN_MODELS.contains(&config.model.as_str()) {
        info!(model = %config.model, "Using a model outside the known list");
    }

    // Create output folder
    let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let output_folder = output.join(format!("{}_{}", timestamp, sanitize_query(&config.query)));
    std::fs::create_dir_all(&output_folder).context("Failed to create output directory")?;
    println!("Output folder: {}", output_folder.display());

    let model = GeminiClient::new(config.model.clone()).context("Failed to create Gemini client")?;
    let pipeline = Pipeline::new(Arc::new(ChromeLauncher::new(browser)), Arc::new(model))
        .with_scrape_options(scrape);

    println!("Starting research process...");
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<ProgressEvent>();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            println!("{}", event);
        }
    });

    let sink = ChannelSink::new(tx);
    let result = pipeline.run(config, &sink).await;
    // Dropping the last sender ends the printer once queued events are out.
    drop(sink);
    printer.await.context("Progress printer failed")?;
    let state = result.context("Research run failed")?;

    let (ok, failed) = state.summary_counts();
    println!(
        "\nScraped {} articles: {} summarized, {} failed",
        state.scraped_count(),
        ok,
        failed
    );

    save_summaries_csv(&state.summarized, &output_folder.join("summaries.csv"))
        .context("Failed to save summaries")?;

    if let Some(report) = state.report.as_ref() {
        let path = save_report(report, &output_folder).context("Failed to save report")?;
        println!("Saved: {}", path.display());
    }

    println!(
        "Token usage: prompt={}, completion={}, total={}",
        state.token_usage.prompt_tokens,
        state.token_usage.completion_tokens,
        state.token_usage.total_tokens
    );
    println!("\n✓ Research complete. Results in: {}", output_folder.display());
    Ok(())
}

// ============================================================================
// HTTP Server
// ============================================================================

async fn run_server(host: String, port: u16) -> Result<()> {
    info!(host = %host, port = port, "Starting HTTP server");
    println!("Starting server at http://{}:{}", host, port);

    let app_state = Arc::new(AppState::default());

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/research", post(research_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("Invalid host:port")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}

#[derive(Default)]
struct AppState {
    browser: BrowserOptions,
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "OK"
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "status": "error", "error": message }))).into_response()
}

/// Research endpoint: JSON run configuration in, `.docx` attachment out
async fn research_handler(State(state): State<Arc<AppState>>, Json(config): Json<RunConfig>) -> Response {
    info!(query = %config.query, sources = ?config.sources, "Research request");

    if let Err(e) = config.validate() {
        return error_response(StatusCode::BAD_REQUEST, e.to_string());
    }

    let model = match GeminiClient::new(config.model.clone()) {
        Ok(model) => model,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    let pipeline = Pipeline::new(
        Arc::new(ChromeLauncher::new(state.browser.clone())),
        Arc::new(model),
    );

    match pipeline.run(config, &paperdigest::TracingSink).await {
        Ok(run) => match run.report {
            Some(report) => (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, DOCX_MIME.to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", report.name),
                    ),
                ],
                report.bytes,
            )
                .into_response(),
            None => error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Run finished without a report".to_string(),
            ),
        },
        Err(DigestError::Validation(message)) => error_response(StatusCode::BAD_REQUEST, message),
        Err(e) => {
            error!(error = %e, "Research run failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
