//! Springer Link search recipe.

use super::SiteRecipe;
use crate::config::Source;
use crate::error::{DigestError, Result};
use url::Url;

/// Springer Link search endpoint
const SEARCH_URL: &str = "https://link.springer.com/search";

#[derive(Debug, Clone, Copy, Default)]
pub struct SpringerRecipe;

impl SiteRecipe for SpringerRecipe {
    fn source(&self) -> Source {
        Source::Springer
    }

    fn search_url(&self, query: &str, page: u32) -> Result<Url> {
        let mut url = Url::parse(SEARCH_URL)
            .map_err(|e| DigestError::Config(format!("Invalid Springer URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("query", query)
            .append_pair("openAccess", "true")
            .append_pair("sortBy", "relevance")
            .append_pair("page", &page.to_string());
        Ok(url)
    }

    fn results_ready_selector(&self) -> &str {
        r#"li[data-test="search-result-item"]"#
    }

    fn result_link_selector(&self) -> &str {
        r#"h3[data-test="title"] a"#
    }

    fn article_body_selector(&self) -> &str {
        ".main-content"
    }

    fn paragraph_selector(&self) -> &str {
        "p"
    }
}
