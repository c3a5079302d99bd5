//! Summarize stage: one structured model call per scraped article.

use crate::config::SummarizationDepth;
use crate::error::Result;
use crate::llm::{extract_json, LanguageModel};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::prompts::{build_summary_prompt, summary_schema, SummaryPayload};
use crate::state::{ScrapedArticle, ScrapedCollection, SummarizedCollection, SummaryEntry, TokenUsage};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// First `limit` characters of `text` (not bytes), or all of it when `limit` is `None`
pub fn truncate_chars(text: &str, limit: Option<usize>) -> &str {
    match limit {
        Some(limit) => match text.char_indices().nth(limit) {
            Some((idx, _)) => &text[..idx],
            None => text,
        },
        None => text,
    }
}

/// Summarize every scraped article, sequentially.
///
/// Per-article failures become [`SummaryEntry::Failed`]; this stage itself
/// never fails. Sources with nothing scraped are left out of the result.
pub async fn summarize_articles(
    scraped: &ScrapedCollection,
    depth: SummarizationDepth,
    model: &dyn LanguageModel,
    sink: &dyn ProgressSink,
) -> (SummarizedCollection, TokenUsage) {
    sink.emit(ProgressEvent::SummarizeStarted);
    info!(
        model = model.name(),
        depth = %depth,
        char_limit = ?depth.char_limit(),
        advertised_char_limit = ?depth.advertised_char_limit(),
        "Starting summarization"
    );

    let schema = summary_schema();
    let mut summarized = SummarizedCollection::new();
    let mut usage = TokenUsage::default();

    for (&source, articles) in scraped {
        if articles.is_empty() {
            continue;
        }
        sink.emit(ProgressEvent::SummarizingSource { source });

        let mut entries = BTreeMap::new();
        for (title, article) in articles {
            sink.emit(ProgressEvent::SummarizingArticle {
                source,
                title: title.clone(),
            });

            let entry = match summarize_one(article, depth, model, &schema, &mut usage).await {
                Ok(summary) => SummaryEntry::Summarized {
                    link: article.link.clone(),
                    summary,
                },
                Err(e) => {
                    warn!(source = %source, title = %title, error = %e, "Summarization failed");
                    SummaryEntry::Failed {
                        link: article.link.clone(),
                        message: format!("Could not summarize article. Error: {}", e),
                    }
                }
            };
            entries.insert(title.clone(), entry);
        }
        summarized.insert(source, entries);
    }

    info!(
        prompt_tokens = usage.prompt_tokens,
        completion_tokens = usage.completion_tokens,
        "Summarization complete"
    );
    sink.emit(ProgressEvent::SummarizeFinished);
    (summarized, usage)
}

async fn summarize_one(
    article: &ScrapedArticle,
    depth: SummarizationDepth,
    model: &dyn LanguageModel,
    schema: &Value,
    usage: &mut TokenUsage,
) -> Result<String> {
    let content = truncate_chars(&article.content, depth.char_limit());
    debug!(
        link = %article.link,
        chars = content.chars().count(),
        "Prompting for summary"
    );

    let completion = model
        .generate_structured(&build_summary_prompt(content), schema)
        .await?;
    usage.add(&completion.usage);

    let payload: SummaryPayload = serde_json::from_str(extract_json(&completion.body))?;
    Ok(payload.summary)
}
