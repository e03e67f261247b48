//! Alpha Vantage API client (company fundamentals)

use crate::error::{DebateError, Result};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

const BASE_URL: &str = "https://www.alphavantage.co/query";

/// Free tier allows 5 requests per minute
const DEFAULT_RATE_LIMIT: NonZeroU32 = match NonZeroU32::new(5) {
    Some(limit) => limit,
    None => NonZeroU32::MIN,
};

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Alpha Vantage API client
#[derive(Debug, Clone)]
pub struct AlphaVantageClient {
    client: Client,
    api_key: String,
    base_url: String,
    rate_limiter: SharedRateLimiter,
}

/// Company overview data
///
/// Alpha Vantage reports every number as a string, using `"None"` or `"-"`
/// when a value is missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyOverview {
    #[serde(rename = "Symbol")]
    pub symbol: String,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "Currency", default)]
    pub currency: Option<String>,
    #[serde(rename = "MarketCapitalization", default)]
    pub market_cap: Option<String>,
    #[serde(rename = "PERatio", default)]
    pub pe_ratio: Option<String>,
    #[serde(rename = "DividendYield", default)]
    pub dividend_yield: Option<String>,
    #[serde(rename = "Beta", default)]
    pub beta: Option<String>,
    #[serde(rename = "52WeekHigh", default)]
    pub week_52_high: Option<String>,
    #[serde(rename = "52WeekLow", default)]
    pub week_52_low: Option<String>,
}

impl CompanyOverview {
    /// Parse one of the string-encoded numeric fields
    pub fn number(field: Option<&String>) -> Option<f64> {
        field
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|value| value.is_finite())
    }
}

impl AlphaVantageClient {
    /// Create a new Alpha Vantage client with API key and rate limit
    ///
    /// # Arguments
    /// * `api_key` - Alpha Vantage API key
    /// * `rate_limit` - Maximum requests per minute (free tier: 5)
    pub fn new(api_key: impl Into<String>, rate_limit: u32, timeout: Duration) -> Result<Self> {
        let quota = Quota::per_minute(NonZeroU32::new(rate_limit).unwrap_or(DEFAULT_RATE_LIMIT));

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DebateError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }

    /// Get company overview and fundamental data
    #[tracing::instrument(skip(self))]
    pub async fn get_company_overview(&self, symbol: &str) -> Result<CompanyOverview> {
        self.rate_limiter.until_ready().await;

        let params = [
            ("function", "OVERVIEW"),
            ("symbol", symbol),
            ("apikey", self.api_key.as_str()),
        ];

        let response = self.client.get(&self.base_url).query(&params).send().await?;

        if !response.status().is_success() {
            return Err(DebateError::unavailable(
                symbol,
                format!("Alpha Vantage HTTP error: {}", response.status()),
            ));
        }

        let data: serde_json::Value = response.json().await?;
        parse_overview(symbol, data)
    }
}

fn parse_overview(symbol: &str, data: serde_json::Value) -> Result<CompanyOverview> {
    if let Some(error) = data.get("Error Message") {
        return Err(DebateError::unavailable(symbol, error.to_string()));
    }

    if data.get("Note").is_some() || data.get("Information").is_some() {
        return Err(DebateError::RateLimitExceeded {
            provider: "Alpha Vantage".to_string(),
        });
    }

    // Unknown symbols come back as an empty object
    if data.as_object().is_none_or(serde_json::Map::is_empty) {
        return Err(DebateError::unavailable(symbol, "Unknown symbol"));
    }

    Ok(serde_json::from_value(data)?)
}
