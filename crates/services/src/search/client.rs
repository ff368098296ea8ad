//! Search provider client and page fetcher

use async_trait::async_trait;
use config::SearchConfig;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search provider is not configured")]
    Disabled,

    #[error("search request failed: {0}")]
    Http(String),

    #[error("invalid search response: {0}")]
    InvalidResponse(String),
}

/// One raw hit from the search provider
#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    /// Snippet or summary as returned by the provider
    #[serde(default)]
    pub content: Option<String>,
}

#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Whether a provider is configured at all
    fn is_enabled(&self) -> bool;

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

/// Tavily-style HTTP search client. Constructed from `SearchConfig`;
/// a missing API key yields a permanently disabled client.
pub struct HttpSearchClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpSearchClient {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl SearchClient for HttpSearchClient {
    fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        let api_key = self.api_key.as_ref().ok_or(SearchError::Disabled)?;

        let url = format!("{}/search", self.base_url);
        let body = serde_json::json!({
            "api_key": api_key,
            "query": query,
            "max_results": max_results,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SearchError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Http(format!("status {status}: {body}")));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::InvalidResponse(e.to_string()))?;

        Ok(parsed.results)
    }
}

/// Fetches page bodies for result enrichment, capped in size.
///
/// Failures are not errors: enrichment is optional and a hit without
/// page content is still usable.
#[derive(Clone)]
pub struct PageFetcher {
    client: Option<reqwest::Client>,
    max_bytes: usize,
}

impl PageFetcher {
    pub fn new(max_bytes: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .ok();
        Self { client, max_bytes }
    }

    /// Fetcher that never fetches; used where enrichment is unwanted
    pub fn disabled() -> Self {
        Self {
            client: None,
            max_bytes: 0,
        }
    }

    pub async fn fetch(&self, url: &str) -> Option<String> {
        let client = self.client.as_ref()?;
        let response = match client.get(url).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::debug!(url, status = %r.status(), "page fetch returned non-success");
                return None;
            }
            Err(e) => {
                tracing::debug!(url, error = %e, "page fetch failed");
                return None;
            }
        };

        let body = response.text().await.ok()?;
        let stripped = strip_markup(&body);
        if stripped.trim().is_empty() {
            return None;
        }
        Some(truncate_bytes(&stripped, self.max_bytes))
    }
}

/// Crude tag stripper, good enough for feeding a model excerpt
fn strip_markup(html: &str) -> String {
    let lowered = html.to_lowercase();
    let mut out = String::with_capacity(html.len() / 2);
    let mut in_tag = false;
    let mut in_script = false;

    for (i, c) in html.char_indices() {
        if in_script {
            // Re-enter tag parsing at the closing tag; its characters
            // are consumed as a normal tag below
            if lowered[i..].starts_with("</script>") || lowered[i..].starts_with("</style>") {
                in_script = false;
                in_tag = true;
            }
            continue;
        }
        match c {
            '<' => {
                if lowered[i..].starts_with("<script") || lowered[i..].starts_with("<style") {
                    in_script = true;
                } else {
                    in_tag = true;
                }
            }
            '>' => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }

    // Collapse whitespace runs left behind by removed tags
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to at most `max` bytes on a char boundary
fn truncate_bytes(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}
