//! IEEE Xplore search recipe.

use super::SiteRecipe;
use crate::config::Source;
use crate::error::{DigestError, Result};
use url::Url;

/// IEEE Xplore search endpoint
const SEARCH_URL: &str = "https://ieeexplore.ieee.org/search/searchresult.jsp";

#[derive(Debug, Clone, Copy, Default)]
pub struct IeeeRecipe;

impl SiteRecipe for IeeeRecipe {
    fn source(&self) -> Source {
        Source::Ieee
    }

    /// Xplore wants `%20` rather than `+` in `queryText`, so the query string
    /// is assembled by hand instead of through `query_pairs_mut`.
    fn search_url(&self, query: &str, page: u32) -> Result<Url> {
        let raw = format!(
            "{}?queryText={}&highlight=true&returnFacets=ALL&returnType=SEARCH&matchPubs=true&openAccess=true&pageNumber={}",
            SEARCH_URL,
            urlencoding::encode(query),
            page
        );
        Url::parse(&raw).map_err(|e| DigestError::Config(format!("Invalid IEEE search URL: {}", e)))
    }

    fn results_ready_selector(&self) -> &str {
        "h3 a.fw-bold"
    }

    fn result_link_selector(&self) -> &str {
        "h3 a.fw-bold"
    }

    fn article_body_selector(&self) -> &str {
        ".ArticlePage"
    }

    fn paragraph_selector(&self) -> &str {
        "p"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url() {
        let url = IeeeRecipe
            .search_url("graph neural networks", 2)
            .expect("Failed to build URL");
        assert!(url.as_str().contains("queryText=graph%20neural%20networks"));
        assert!(url.as_str().contains("openAccess=true"));
        assert!(url.as_str().ends_with("pageNumber=2"));
    }
}
