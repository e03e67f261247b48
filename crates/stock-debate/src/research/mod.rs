//! Research gathering: metrics, news and executive changes for one ticker

mod service;
mod sources;
pub mod types;

pub use service::ResearchService;
pub use sources::{MarketMetricsSource, TavilyNewsSource};
pub use types::{NewsItem, ResearchContext, StockMetrics, currency_for_ticker};

use crate::error::Result;
use async_trait::async_trait;

/// Source of price and fundamental metrics
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Fetch metrics for a ticker
    async fn fetch_metrics(&self, ticker: &str) -> Result<StockMetrics>;
}

/// Source of news and executive-change items
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Recent news about the ticker
    async fn fetch_news(&self, ticker: &str) -> Result<Vec<NewsItem>>;

    /// Recent leadership changes at the company
    async fn fetch_executive_changes(&self, ticker: &str) -> Result<Vec<NewsItem>>;
}
