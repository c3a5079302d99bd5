//! Per-publisher scraping recipes.
//!
//! A recipe only knows how to build a search URL and which selectors to use;
//! the traversal itself lives in [`crate::scrape`].

pub mod ieee;
pub mod mdpi;
pub mod springer;

use crate::config::Source;
use crate::error::Result;
use std::time::Duration;
use url::Url;

pub use ieee::IeeeRecipe;
pub use mdpi::MdpiRecipe;
pub use springer::SpringerRecipe;

/// How to search one publisher and where its article text lives
pub trait SiteRecipe: Send + Sync {
    fn source(&self) -> Source;

    /// Search URL for a 1-indexed result page
    fn search_url(&self, query: &str, page: u32) -> Result<Url>;

    /// Selector whose presence means the result list has rendered
    fn results_ready_selector(&self) -> &str;

    /// Selector for result anchors (their `href` is followed)
    fn result_link_selector(&self) -> &str;

    /// Selector for the article body container
    fn article_body_selector(&self) -> &str;

    /// Selector for paragraphs inside the article body
    fn paragraph_selector(&self) -> &str;

    /// Extra pause after a search page loads, if the site needs one
    fn search_settle_delay(&self) -> Option<Duration> {
        None
    }

    /// Extra pause after an article page loads, if the site needs one
    fn article_settle_delay(&self) -> Option<Duration> {
        None
    }
}

/// Recipe for a given source
pub fn recipe_for(source: Source) -> Box<dyn SiteRecipe> {
    match source {
        Source::Ieee => Box::new(IeeeRecipe),
        Source::Springer => Box::new(SpringerRecipe),
        Source::Mdpi => Box::new(MdpiRecipe),
    }
}
