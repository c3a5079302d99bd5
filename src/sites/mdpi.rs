//! MDPI search recipe.
//!
//! MDPI renders its listing and article bodies late, so this recipe asks for
//! short settle pauses on top of the selector waits.

use super::SiteRecipe;
use crate::config::Source;
use crate::error::{DigestError, Result};
use std::time::Duration;
use url::Url;

/// MDPI search endpoint
const SEARCH_URL: &str = "https://www.mdpi.com/search";

#[derive(Debug, Clone, Copy, Default)]
pub struct MdpiRecipe;

impl SiteRecipe for MdpiRecipe {
    fn source(&self) -> Source {
        Source::Mdpi
    }

    fn search_url(&self, query: &str, page: u32) -> Result<Url> {
        let mut url = Url::parse(SEARCH_URL)
            .map_err(|e| DigestError::Config(format!("Invalid MDPI URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("page_no", &page.to_string());
        Ok(url)
    }

    fn results_ready_selector(&self) -> &str {
        ".article-listing"
    }

    fn result_link_selector(&self) -> &str {
        ".title-link"
    }

    fn article_body_selector(&self) -> &str {
        ".html-article-content"
    }

    fn paragraph_selector(&self) -> &str {
        ".html-p"
    }

    fn search_settle_delay(&self) -> Option<Duration> {
        Some(Duration::from_secs(3))
    }

    fn article_settle_delay(&self) -> Option<Duration> {
        Some(Duration::from_secs(2))
    }
}
