//! Yahoo Finance API client

use crate::error::{DebateError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use yahoo_finance_api as yahoo;

/// Yahoo Finance API client
#[derive(Debug, Clone, Default)]
pub struct YahooFinanceClient {}

/// Daily bar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Range statistics over a window of daily bars
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeSummary {
    pub high: f64,
    pub low: f64,
    pub avg_volume: u64,
}

impl YahooFinanceClient {
    /// Create a new Yahoo Finance client
    pub fn new() -> Self {
        Self {}
    }

    fn connector(symbol: &str) -> Result<yahoo::YahooConnector> {
        yahoo::YahooConnector::new().map_err(|e| DebateError::unavailable(symbol, e.to_string()))
    }

    fn convert(symbol: &str, quote: &yahoo::Quote) -> Quote {
        Quote {
            symbol: symbol.to_string(),
            timestamp: DateTime::from_timestamp(quote.timestamp as i64, 0)
                .unwrap_or_else(Utc::now),
            open: quote.open,
            high: quote.high,
            low: quote.low,
            close: quote.close,
            volume: quote.volume,
        }
    }

    /// Get the latest quote for a symbol
    #[tracing::instrument(skip(self))]
    pub async fn get_quote(&self, symbol: &str) -> Result<Quote> {
        let provider = Self::connector(symbol)?;

        let response = provider
            .get_latest_quotes(symbol, "1d")
            .await
            .map_err(|e| DebateError::unavailable(symbol, e.to_string()))?;

        let quote = response
            .last_quote()
            .map_err(|e| DebateError::unavailable(symbol, e.to_string()))?;

        Ok(Self::convert(symbol, &quote))
    }

    /// Get daily bars covering the last `days` days
    #[tracing::instrument(skip(self))]
    pub async fn get_history(&self, symbol: &str, days: i64) -> Result<Vec<Quote>> {
        let provider = Self::connector(symbol)?;

        let end = Utc::now();
        let start = end - chrono::Duration::days(days);

        // Convert chrono DateTime to time OffsetDateTime
        let start_odt = OffsetDateTime::from_unix_timestamp(start.timestamp()).map_err(|e| {
            DebateError::unavailable(symbol, format!("Invalid start timestamp: {e}"))
        })?;
        let end_odt = OffsetDateTime::from_unix_timestamp(end.timestamp())
            .map_err(|e| DebateError::unavailable(symbol, format!("Invalid end timestamp: {e}")))?;

        let response = provider
            .get_quote_history(symbol, start_odt, end_odt)
            .await
            .map_err(|e| DebateError::unavailable(symbol, e.to_string()))?;

        let quotes = response
            .quotes()
            .map_err(|e| DebateError::unavailable(symbol, e.to_string()))?;

        Ok(quotes.iter().map(|q| Self::convert(symbol, q)).collect())
    }
}

/// High, low and average volume across the bars; `None` for an empty window
pub fn summarize_range(quotes: &[Quote]) -> Option<RangeSummary> {
    if quotes.is_empty() {
        return None;
    }

    let high = quotes.iter().map(|q| q.high).fold(f64::MIN, f64::max);
    let low = quotes.iter().map(|q| q.low).fold(f64::MAX, f64::min);
    let total_volume: u64 = quotes.iter().map(|q| q.volume).sum();

    Some(RangeSummary {
        high,
        low,
        avg_volume: total_volume / quotes.len() as u64,
    })
}
