//! Network-backed implementations of the research source traits

use super::{MetricsSource, NewsItem, NewsSource, StockMetrics};
use crate::api::{AlphaVantageClient, CompanyOverview, TavilyClient, YahooFinanceClient, summarize_range};
use crate::error::{DebateError, Result};
use async_trait::async_trait;

/// Days of history used for the 52-week range and average volume
const RANGE_WINDOW_DAYS: i64 = 365;

/// Yahoo quotes and history, optionally enriched with Alpha Vantage fundamentals
#[derive(Debug, Clone, Default)]
pub struct MarketMetricsSource {
    yahoo: YahooFinanceClient,
    alpha_vantage: Option<AlphaVantageClient>,
}

impl MarketMetricsSource {
    /// Create a source backed by Yahoo only
    pub fn new() -> Self {
        Self::default()
    }

    /// Add Alpha Vantage fundamentals (P/E, market cap, dividend yield, beta)
    pub fn with_alpha_vantage(mut self, client: AlphaVantageClient) -> Self {
        self.alpha_vantage = Some(client);
        self
    }
}

#[async_trait]
impl MetricsSource for MarketMetricsSource {
    async fn fetch_metrics(&self, ticker: &str) -> Result<StockMetrics> {
        let (quote, history, overview) = tokio::join!(
            self.yahoo.get_quote(ticker),
            self.yahoo.get_history(ticker, RANGE_WINDOW_DAYS),
            async {
                match &self.alpha_vantage {
                    Some(client) => Some(client.get_company_overview(ticker).await),
                    None => None,
                }
            }
        );

        let mut metrics = StockMetrics::empty(ticker);

        match quote {
            Ok(quote) => {
                metrics.current_price = Some(quote.close);
                metrics.volume = Some(quote.volume);
            }
            Err(e) => tracing::warn!(ticker, error = %e, "Latest quote unavailable"),
        }

        match history {
            Ok(bars) => {
                if let Some(range) = summarize_range(&bars) {
                    metrics.week_52_high = Some(range.high);
                    metrics.week_52_low = Some(range.low);
                    metrics.avg_volume = Some(range.avg_volume);
                }
            }
            Err(e) => tracing::warn!(ticker, error = %e, "Price history unavailable"),
        }

        match overview {
            Some(Ok(overview)) => apply_overview(&mut metrics, &overview),
            Some(Err(e)) => tracing::warn!(ticker, error = %e, "Fundamentals unavailable"),
            None => tracing::debug!(ticker, "Alpha Vantage not configured, skipping fundamentals"),
        }

        if metrics.is_empty() {
            return Err(DebateError::unavailable(ticker, "No metrics returned by any source"));
        }

        Ok(metrics)
    }
}

/// Merge Alpha Vantage fundamentals into metrics, keeping the Yahoo 52-week range when present
fn apply_overview(metrics: &mut StockMetrics, overview: &CompanyOverview) {
    metrics.pe_ratio = CompanyOverview::number(overview.pe_ratio.as_ref());
    metrics.market_cap = CompanyOverview::number(overview.market_cap.as_ref());
    // reported as a fraction
    metrics.dividend_yield =
        CompanyOverview::number(overview.dividend_yield.as_ref()).map(|y| y * 100.0);
    metrics.beta = CompanyOverview::number(overview.beta.as_ref());

    if metrics.week_52_high.is_none() {
        metrics.week_52_high = CompanyOverview::number(overview.week_52_high.as_ref());
    }
    if metrics.week_52_low.is_none() {
        metrics.week_52_low = CompanyOverview::number(overview.week_52_low.as_ref());
    }
    if let Some(currency) = overview.currency.as_ref().filter(|c| !c.trim().is_empty()) {
        metrics.currency = currency.trim().to_ascii_uppercase();
    }
}

/// News and executive changes from Tavily search
#[derive(Debug, Clone)]
pub struct TavilyNewsSource {
    client: TavilyClient,
    news_max_results: usize,
    executive_max_results: usize,
}

impl TavilyNewsSource {
    /// Create a source with the given result limits
    pub fn new(client: TavilyClient, news_max_results: usize, executive_max_results: usize) -> Self {
        Self {
            client,
            news_max_results,
            executive_max_results,
        }
    }
}

#[async_trait]
impl NewsSource for TavilyNewsSource {
    async fn fetch_news(&self, ticker: &str) -> Result<Vec<NewsItem>> {
        self.client.get_news(ticker, self.news_max_results).await
    }

    async fn fetch_executive_changes(&self, ticker: &str) -> Result<Vec<NewsItem>> {
        self.client
            .get_executive_changes(ticker, self.executive_max_results)
            .await
    }
}
