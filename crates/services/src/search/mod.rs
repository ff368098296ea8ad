//! Web-search augmentation
//!
//! Best-effort fan-out to the search provider plus optional
//! content-enrichment fetches, feeding either the `web_search` tool or
//! the request-level auto-search heuristic. Everything here degrades:
//! a missing API key or a provider failure yields an empty result set,
//! never an error the orchestrator has to handle.

pub mod client;

use crate::messages::SearchResult;
use std::sync::{Arc, OnceLock};

pub use client::{HttpSearchClient, PageFetcher, SearchClient, SearchError, SearchHit};

/// Patterns that auto-enable web search even when the model does not
/// request the tool: prompts that need current information or a web
/// page built from live content.
const AUTO_SEARCH_PATTERNS: &[&str] = &[
    r"\b(latest|current|today|tonight|this (week|month|year)|right now)\b",
    r"\b(news|headline|breaking)\b",
    r"\b(price of|stock price|exchange rate|how much (is|does|are))\b",
    r"\b(weather|forecast)\b",
    r"\bwho (won|is winning|was elected)\b",
    r"\bas of (20\d\d|now)\b",
    r"\b(recent|recently|up[- ]to[- ]date)\b",
];

/// Request-level heuristic for auto-enabling search
pub fn should_auto_search(prompt: &str) -> bool {
    let lowered = prompt.to_lowercase();
    auto_search_regexes().iter().any(|re| re.is_match(&lowered))
}

/// Heuristic patterns compiled once on first use
fn auto_search_regexes() -> &'static [regex::Regex] {
    static REGEXES: OnceLock<Vec<regex::Regex>> = OnceLock::new();
    REGEXES.get_or_init(|| {
        AUTO_SEARCH_PATTERNS
            .iter()
            .map(|pattern| {
                // Patterns are compile-time constants; construction cannot fail
                regex::Regex::new(pattern).expect("invalid auto-search pattern")
            })
            .collect()
    })
}

/// A search hit optionally enriched with fetched page content
#[derive(Debug, Clone)]
pub struct EnrichedHit {
    pub hit: SearchHit,
    pub page_content: Option<String>,
}

/// Gathers search results and enriches the top few with page content
pub struct SearchAugmentor {
    client: Arc<dyn SearchClient>,
    fetcher: PageFetcher,
    max_results: usize,
    enrich_top_n: usize,
}

impl SearchAugmentor {
    pub fn new(
        client: Arc<dyn SearchClient>,
        fetcher: PageFetcher,
        max_results: usize,
        enrich_top_n: usize,
    ) -> Self {
        Self {
            client,
            fetcher,
            max_results,
            enrich_top_n,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_enabled()
    }

    /// Run the search and enrich the top results. Best-effort: any
    /// failure along the way degrades to fewer (or zero) results.
    pub async fn gather(&self, query: &str) -> Vec<EnrichedHit> {
        let hits = match self.client.search(query, self.max_results).await {
            Ok(hits) => hits,
            Err(SearchError::Disabled) => {
                tracing::debug!("search provider disabled, skipping search");
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!(error = %e, query, "search provider call failed");
                return Vec::new();
            }
        };

        // Bounded fan-out: fetch page content for the top N hits
        let enrich_count = self.enrich_top_n.min(hits.len());
        let fetches = hits[..enrich_count]
            .iter()
            .map(|hit| self.fetcher.fetch(&hit.url));
        let mut pages = futures::future::join_all(fetches).await;
        pages.resize(hits.len(), None);

        hits.into_iter()
            .zip(pages)
            .map(|(hit, page_content)| EnrichedHit { hit, page_content })
            .collect()
    }

    /// Render the gathered results into a context block for a
    /// search-augmented prompt
    pub fn build_context(results: &[EnrichedHit]) -> String {
        let mut context = String::from("Web search results:\n");
        for (i, result) in results.iter().enumerate() {
            context.push_str(&format!(
                "\n[{}] {} ({})\n{}\n",
                i + 1,
                result.hit.title,
                result.hit.url,
                result.hit.content.as_deref().unwrap_or("")
            ));
            if let Some(page) = &result.page_content {
                context.push_str(&format!("Page excerpt: {page}\n"));
            }
        }
        context
    }
}

/// Convert hits into the message-attachable search result shape
pub fn to_search_results(results: &[EnrichedHit]) -> Vec<SearchResult> {
    results
        .iter()
        .map(|result| SearchResult {
            title: result.hit.title.clone(),
            link: result.hit.url.clone(),
            snippet: result.hit.content.clone().unwrap_or_default(),
            display_link: host_of(&result.hit.url),
        })
        .collect()
}

/// Host portion of a URL for compact rendering; falls back to the
/// whole string when it does not parse as a URL
fn host_of(url: &str) -> String {
    url.strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url)
        .split('/')
        .next()
        .unwrap_or(url)
        .to_string()
}
