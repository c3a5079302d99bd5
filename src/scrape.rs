//! Scrape stage: drive a browser through each publisher's search results and
//! collect article text.
//!
//! Traversal is shared by every source; what differs per publisher lives in a
//! [`SiteRecipe`]. Failures of a single search page or article are logged and
//! skipped. Failing to launch a browser at all aborts the stage.

use crate::browser::{BrowserLauncher, BrowserSession};
use crate::config::{RunConfig, Source};
use crate::error::{DigestError, Result};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::sites::{recipe_for, SiteRecipe};
use crate::state::{ScrapedArticle, ScrapedCollection};
use scraper::{Html, Selector};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Default bound on waiting for a selector to render
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(20);

/// Tunables for the scrape stage
#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    /// How long to wait for results or an article body to render
    pub wait_timeout: Duration,
    /// Honour per-site settle delays after page loads
    pub settle_delays: bool,
    /// Random 0.5-2s pause before each search page request
    pub polite_delay: bool,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            settle_delays: true,
            polite_delay: false,
        }
    }
}

impl ScrapeOptions {
    /// No pauses and a short wait, for scripted browsers
    pub fn immediate() -> Self {
        Self {
            wait_timeout: Duration::from_millis(10),
            settle_delays: false,
            polite_delay: false,
        }
    }
}

/// Parsed selectors for one recipe
struct RecipeSelectors {
    links: Selector,
    body: Selector,
    paragraphs: Selector,
}

impl RecipeSelectors {
    fn parse(recipe: &dyn SiteRecipe) -> Result<Self> {
        Ok(Self {
            links: parse_selector(recipe.result_link_selector())?,
            body: parse_selector(recipe.article_body_selector())?,
            paragraphs: parse_selector(recipe.paragraph_selector())?,
        })
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| DigestError::Parse(format!("Invalid selector '{}': {}", selector, e)))
}

/// Scrape every requested source, in request order, one browser session each.
///
/// Every requested source gets a key in the result, even when nothing was
/// collected for it.
pub async fn scrape_sources(
    config: &RunConfig,
    launcher: &dyn BrowserLauncher,
    options: &ScrapeOptions,
    sink: &dyn ProgressSink,
) -> Result<ScrapedCollection> {
    let mut collection = ScrapedCollection::new();

    for &source in &config.sources {
        if collection.contains_key(&source) {
            debug!(source = %source, "Skipping duplicate source");
            continue;
        }

        sink.emit(ProgressEvent::ScrapeStarted { source });

        let recipe = recipe_for(source);
        let selectors = RecipeSelectors::parse(recipe.as_ref())?;

        let mut session = launcher.launch().await?;
        let articles = scrape_source(
            session.as_mut(),
            recipe.as_ref(),
            &selectors,
            config,
            options,
            sink,
        )
        .await;
        if let Err(e) = session.close().await {
            warn!(source = %source, error = %e, "Failed to close browser session");
        }

        info!(source = %source, articles = articles.len(), "Scraping complete");
        sink.emit(ProgressEvent::ScrapeFinished {
            source,
            articles: articles.len(),
        });
        collection.insert(source, articles);
    }

    Ok(collection)
}

async fn scrape_source(
    session: &mut dyn BrowserSession,
    recipe: &dyn SiteRecipe,
    selectors: &RecipeSelectors,
    config: &RunConfig,
    options: &ScrapeOptions,
    sink: &dyn ProgressSink,
) -> BTreeMap<String, ScrapedArticle> {
    let source = recipe.source();
    let mut articles = BTreeMap::new();

    for page in 1..=config.pages_to_search {
        let links = match search_page_links(session, recipe, selectors, &config.query, page, options).await {
            Ok(links) => links,
            Err(e) => {
                warn!(source = %source, page = page, error = %e, "Skipping search page");
                continue;
            }
        };
        debug!(source = %source, page = page, links = links.len(), "Collected result links");

        let mut visited = 0;
        for link in links {
            if visited >= config.page_depth {
                break;
            }
            match scrape_article(session, recipe, selectors, source, &link, options, sink).await {
                Ok(Some((title, article))) => {
                    visited += 1;
                    articles.insert(title, article);
                }
                Ok(None) => {
                    visited += 1;
                    debug!(source = %source, link = %link, "Article had no text, not recorded");
                }
                Err(e) => {
                    warn!(source = %source, link = %link, error = %e, "Skipping article");
                }
            }
        }
    }

    articles
}

async fn search_page_links(
    session: &mut dyn BrowserSession,
    recipe: &dyn SiteRecipe,
    selectors: &RecipeSelectors,
    query: &str,
    page: u32,
    options: &ScrapeOptions,
) -> Result<Vec<String>> {
    let url = recipe.search_url(query, page)?;

    if options.polite_delay {
        let delay = rand::random::<u64>() % 1500 + 500;
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    session.goto(url.as_str()).await?;
    if options.settle_delays {
        if let Some(delay) = recipe.search_settle_delay() {
            tokio::time::sleep(delay).await;
        }
    }
    session
        .wait_for(recipe.results_ready_selector(), options.wait_timeout)
        .await?;

    let html = session.html().await?;
    Ok(extract_links(&html, &url, &selectors.links))
}

async fn scrape_article(
    session: &mut dyn BrowserSession,
    recipe: &dyn SiteRecipe,
    selectors: &RecipeSelectors,
    source: Source,
    link: &str,
    options: &ScrapeOptions,
    sink: &dyn ProgressSink,
) -> Result<Option<(String, ScrapedArticle)>> {
    session.goto(link).await?;
    if options.settle_delays {
        if let Some(delay) = recipe.article_settle_delay() {
            tokio::time::sleep(delay).await;
        }
    }
    session
        .wait_for(recipe.article_body_selector(), options.wait_timeout)
        .await?;

    let title = session.title().await?;
    let title = match title.trim() {
        "" => link.to_string(),
        t => t.to_string(),
    };
    sink.emit(ProgressEvent::ScrapingArticle {
        source,
        title: title.clone(),
    });

    let html = session.html().await?;
    let content = extract_article_text(&html, &selectors.body, &selectors.paragraphs);
    if content.is_empty() {
        return Ok(None);
    }

    Ok(Some((
        title,
        ScrapedArticle {
            link: link.to_string(),
            content,
        },
    )))
}

/// Absolute `href`s of every element matching `selector`, in document order
pub fn extract_links(html: &str, base: &Url, selector: &Selector) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(selector)
        .filter_map(|el| el.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .filter_map(|href| base.join(href).ok())
        .map(String::from)
        .collect()
}

/// Text of the paragraphs inside the first body element, each whitespace
/// normalized, joined with single spaces. Empty when there is no body.
pub fn extract_article_text(html: &str, body: &Selector, paragraphs: &Selector) -> String {
    let document = Html::parse_document(html);
    let Some(container) = document.select(body).next() else {
        return String::new();
    };

    container
        .select(paragraphs)
        .map(|p| p.text().collect::<Vec<_>>().join(" "))
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::CollectingSink;
    use crate::sites::{IeeeRecipe, MdpiRecipe};
    use crate::testing::{article, listing, FakeLauncher, FakePage};

    fn page(title: &str, html: String) -> FakePage {
        FakePage {
            title: title.to_string(),
            html,
        }
    }

    fn ieee_search(query: &str, page: u32) -> String {
        IeeeRecipe
            .search_url(query, page)
            .expect("Failed to build URL")
            .to_string()
    }

    fn ieee_anchor(id: u32, title: &str) -> String {
        format!(r#"<h3><a class="fw-bold" href="/document/{}/">{}</a></h3>"#, id, title)
    }

    fn ieee_doc(id: u32) -> String {
        format!("https://ieeexplore.ieee.org/document/{}/", id)
    }

    #[test]
    fn test_default_options() {
        let options = ScrapeOptions::default();
        assert_eq!(options.wait_timeout, DEFAULT_WAIT_TIMEOUT);
        assert!(options.settle_delays);
        assert!(!options.polite_delay);
    }

    #[test]
    fn test_extract_article_text_scoped_to_body() {
        let html = article("ArticlePage", &["  First   finding. ", "", "Second\nfinding."]);
        let body = Selector::parse(".ArticlePage").expect("selector");
        let p = Selector::parse("p").expect("selector");
        assert_eq!(extract_article_text(&html, &body, &p), "First finding. Second finding.");
    }

    #[test]
    fn test_extract_article_text_without_body() {
        let body = Selector::parse(".ArticlePage").expect("selector");
        let p = Selector::parse("p").expect("selector");
        assert_eq!(extract_article_text("<p>stray</p>", &body, &p), "");
    }

    #[test]
    fn test_extract_links_resolves_relative() {
        let base = Url::parse("https://www.mdpi.com/search?q=x&page_no=1").expect("url");
        let html = listing(
            r#"<a class="title-link" href="/2076-3417/14/1/1">A</a>
               <a class="title-link" href="">empty</a>
               <a class="title-link" href="https://www.mdpi.com/1424-8220/2/3/4">B</a>"#,
        );
        let selector = Selector::parse(MdpiRecipe.result_link_selector()).expect("selector");
        assert_eq!(
            extract_links(&html, &base, &selector),
            vec![
                "https://www.mdpi.com/2076-3417/14/1/1".to_string(),
                "https://www.mdpi.com/1424-8220/2/3/4".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_scrape_respects_depth_and_requested_sources() {
        let query = "graph neural networks";
        let anchors: String = (1..=3).map(|i| ieee_anchor(i, &format!("Paper {}", i))).collect();
        let mut pages = vec![(ieee_search(query, 1), page("Search", listing(&anchors)))];
        for i in 1..=3 {
            pages.push((
                ieee_doc(i),
                page(&format!("Paper {}", i), article("ArticlePage", &["Body text."])),
            ));
        }
        let launcher = FakeLauncher::new(pages);
        let sink = CollectingSink::new();

        let mut config = RunConfig::new(query, vec![Source::Ieee, Source::Ieee]);
        config.page_depth = 2;

        let scraped = scrape_sources(&config, &launcher, &ScrapeOptions::immediate(), &sink)
            .await
            .expect("Scrape failed");

        assert_eq!(scraped.keys().copied().collect::<Vec<_>>(), vec![Source::Ieee]);
        let ieee = &scraped[&Source::Ieee];
        assert_eq!(ieee.len(), 2);
        assert_eq!(ieee["Paper 1"].link, ieee_doc(1));
        assert_eq!(ieee["Paper 1"].content, "Body text.");
        assert!(!ieee.contains_key("Paper 3"));
        assert_eq!(launcher.launch_count(), 1);
        assert_eq!(launcher.close_count(), 1);
        assert_eq!(
            sink.events().last(),
            Some(&ProgressEvent::ScrapeFinished {
                source: Source::Ieee,
                articles: 2
            })
        );
    }

    #[tokio::test]
    async fn test_failed_links_do_not_count_toward_depth() {
        let query = "robotics";
        let anchors = format!("{}{}{}", ieee_anchor(1, "a"), ieee_anchor(2, "b"), ieee_anchor(3, "c"));
        let launcher = FakeLauncher::new(vec![
            (ieee_search(query, 1), page("Search", listing(&anchors))),
            // document 1 is unreachable, document 2 never renders its body
            (ieee_doc(2), page("Broken", "<html><body><p>loading</p></body></html>".to_string())),
            (ieee_doc(3), page("", article("ArticlePage", &["Recovered."]))),
        ]);

        let mut config = RunConfig::new(query, vec![Source::Ieee]);
        config.page_depth = 1;

        let scraped = scrape_sources(&config, &launcher, &ScrapeOptions::immediate(), &CollectingSink::new())
            .await
            .expect("Scrape failed");

        let ieee = &scraped[&Source::Ieee];
        assert_eq!(ieee.len(), 1);
        // untitled pages are keyed by their link
        assert_eq!(ieee[&ieee_doc(3)].content, "Recovered.");
    }

    #[tokio::test]
    async fn test_timed_out_search_page_yields_empty_partition() {
        let query = "quantum";
        let launcher = FakeLauncher::new(vec![(
            ieee_search(query, 1),
            page("Search", listing("<p>No results</p>")),
        )]);
        let mut config = RunConfig::new(query, vec![Source::Ieee, Source::Mdpi]);
        config.pages_to_search = 2;

        let scraped = scrape_sources(&config, &launcher, &ScrapeOptions::immediate(), &CollectingSink::new())
            .await
            .expect("Scrape failed");

        assert_eq!(scraped.len(), 2);
        assert!(scraped[&Source::Ieee].is_empty());
        assert!(scraped[&Source::Mdpi].is_empty());
        assert_eq!(launcher.launch_count(), 2);
        assert_eq!(launcher.close_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_article_not_recorded() {
        let query = "sensors";
        let launcher = FakeLauncher::new(vec![
            (ieee_search(query, 1), page("Search", listing(&ieee_anchor(1, "a")))),
            (ieee_doc(1), page("Empty", article("ArticlePage", &[]))),
        ]);
        let config = RunConfig::new(query, vec![Source::Ieee]);

        let scraped = scrape_sources(&config, &launcher, &ScrapeOptions::immediate(), &CollectingSink::new())
            .await
            .expect("Scrape failed");
        assert!(scraped[&Source::Ieee].is_empty());
    }

    #[tokio::test]
    async fn test_launch_failure_aborts() {
        let config = RunConfig::new("anything", vec![Source::Springer]);
        let result = scrape_sources(
            &config,
            &FakeLauncher::failing(),
            &ScrapeOptions::immediate(),
            &CollectingSink::new(),
        )
        .await;
        assert!(matches!(result, Err(DigestError::Browser(_))));
    }
}
