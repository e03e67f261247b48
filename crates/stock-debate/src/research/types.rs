//! Research data shared read-only by every debate turn

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Price and fundamental metrics for one ticker
///
/// Every numeric field is optional; `None` means the source did not report it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMetrics {
    pub current_price: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub market_cap: Option<f64>,
    pub week_52_high: Option<f64>,
    pub week_52_low: Option<f64>,
    /// Dividend yield in percent
    pub dividend_yield: Option<f64>,
    pub volume: Option<u64>,
    pub avg_volume: Option<u64>,
    pub beta: Option<f64>,
    /// ISO 4217 code
    pub currency: String,
}

impl StockMetrics {
    /// Metrics with nothing reported, priced in the ticker's home currency
    pub fn empty(ticker: &str) -> Self {
        Self {
            current_price: None,
            pe_ratio: None,
            market_cap: None,
            week_52_high: None,
            week_52_low: None,
            dividend_yield: None,
            volume: None,
            avg_volume: None,
            beta: None,
            currency: currency_for_ticker(ticker).to_string(),
        }
    }

    /// True when no numeric field was reported
    pub fn is_empty(&self) -> bool {
        self.current_price.is_none()
            && self.pe_ratio.is_none()
            && self.market_cap.is_none()
            && self.week_52_high.is_none()
            && self.week_52_low.is_none()
            && self.dividend_yield.is_none()
            && self.volume.is_none()
            && self.avg_volume.is_none()
            && self.beta.is_none()
    }

    /// Display symbol for the metrics currency
    pub fn currency_symbol(&self) -> &str {
        match self.currency.as_str() {
            "INR" => "₹",
            "USD" => "$",
            "EUR" => "€",
            "GBP" => "£",
            "JPY" => "¥",
            other => other,
        }
    }
}

/// Home currency implied by a Yahoo ticker suffix
pub fn currency_for_ticker(ticker: &str) -> &'static str {
    let upper = ticker.to_ascii_uppercase();
    if upper.ends_with(".NS") || upper.ends_with(".BO") {
        "INR"
    } else {
        "USD"
    }
}

/// A single news or search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub url: String,
    pub summary: String,
    pub date: Option<String>,
}

/// Everything the personas know about the ticker
///
/// Built once before the first turn and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchContext {
    pub ticker: String,
    pub metrics: StockMetrics,
    pub news_items: Vec<NewsItem>,
    pub executive_changes: Option<Vec<NewsItem>>,
    pub fetched_at: DateTime<Utc>,
}

impl ResearchContext {
    /// Context with metrics only
    pub fn new(ticker: impl Into<String>, metrics: StockMetrics) -> Self {
        Self {
            ticker: ticker.into(),
            metrics,
            news_items: Vec::new(),
            executive_changes: None,
            fetched_at: Utc::now(),
        }
    }

    /// Attach news items
    pub fn with_news(mut self, news: Vec<NewsItem>) -> Self {
        self.news_items = news;
        self
    }

    /// Attach executive-change items
    pub fn with_executive_changes(mut self, changes: Vec<NewsItem>) -> Self {
        self.executive_changes = Some(changes);
        self
    }
}
