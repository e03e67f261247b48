//! Tavily search API client for stock news and executive changes

use crate::error::{DebateError, Result};
use crate::research::NewsItem;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

const SEARCH_URL: &str = "https://api.tavily.com/search";

const DEFAULT_RATE_LIMIT: NonZeroU32 = match NonZeroU32::new(60) {
    Some(limit) => limit,
    None => NonZeroU32::MIN,
};

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Search request body
#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'a str,
    max_results: usize,
}

/// Search response body
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

/// A single search hit
#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    published_date: Option<String>,
}

impl From<SearchResult> for NewsItem {
    fn from(result: SearchResult) -> Self {
        Self {
            title: result.title.unwrap_or_else(|| "Untitled".to_string()),
            url: result.url.unwrap_or_default(),
            summary: result.content.unwrap_or_default(),
            date: result.published_date.filter(|d| !d.trim().is_empty()),
        }
    }
}

/// Query used for general stock news
pub fn news_query(ticker: &str) -> String {
    format!("{ticker} stock news")
}

/// Query used for leadership changes
pub fn executive_query(ticker: &str) -> String {
    format!("{ticker} CEO OR CTO OR CFO OR CRO joined OR left")
}

/// Tavily client for web news search
#[derive(Debug, Clone)]
pub struct TavilyClient {
    client: Client,
    api_key: String,
    rate_limiter: SharedRateLimiter,
}

impl TavilyClient {
    /// Create a new Tavily client with rate limiting
    ///
    /// # Arguments
    /// * `api_key` - Tavily API key
    /// * `rate_limit` - Requests per minute
    pub fn new(api_key: impl Into<String>, rate_limit: u32, timeout: Duration) -> Result<Self> {
        let quota = Quota::per_minute(NonZeroU32::new(rate_limit).unwrap_or(DEFAULT_RATE_LIMIT));

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DebateError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }

    /// Run a basic-depth search and map hits to news items
    #[tracing::instrument(skip(self))]
    pub async fn search(&self, ticker: &str, query: &str, max_results: usize) -> Result<Vec<NewsItem>> {
        self.rate_limiter.until_ready().await;

        let body = SearchRequest {
            api_key: &self.api_key,
            query,
            search_depth: "basic",
            max_results,
        };

        let response = self.client.post(SEARCH_URL).json(&body).send().await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(DebateError::RateLimitExceeded {
                provider: "Tavily".to_string(),
            });
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(DebateError::unavailable(
                ticker,
                format!("Tavily API error {status}: {text}"),
            ));
        }

        let parsed: SearchResponse = response.json().await?;
        Ok(parsed.results.into_iter().map(NewsItem::from).collect())
    }

    /// Recent news for a ticker
    pub async fn get_news(&self, ticker: &str, max_results: usize) -> Result<Vec<NewsItem>> {
        self.search(ticker, &news_query(ticker), max_results).await
    }

    /// Recent C-suite arrivals and departures for a ticker
    pub async fn get_executive_changes(&self, ticker: &str, max_results: usize) -> Result<Vec<NewsItem>> {
        self.search(ticker, &executive_query(ticker), max_results).await
    }
}
