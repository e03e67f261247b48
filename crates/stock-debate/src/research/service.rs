//! Concurrent research gathering with caching and degradation rules

use super::{MetricsSource, NewsSource, ResearchContext};
use crate::api::{AlphaVantageClient, TavilyClient};
use crate::cache::ResearchCache;
use crate::config::DebateConfig;
use crate::error::{DebateError, Result};
use crate::research::{MarketMetricsSource, TavilyNewsSource};
use std::sync::Arc;

/// Alpha Vantage free tier
const ALPHA_VANTAGE_RATE_LIMIT: u32 = 5;

/// Builds the immutable [`ResearchContext`] a debate runs on
///
/// Metrics are mandatory: a failure or an all-empty result aborts with
/// [`DebateError::DataUnavailable`]. News and executive changes are optional
/// and only logged when they fail.
#[derive(Clone)]
pub struct ResearchService {
    metrics: Arc<dyn MetricsSource>,
    news: Option<Arc<dyn NewsSource>>,
    cache: ResearchCache,
}

impl ResearchService {
    /// Create a service from explicit sources
    pub fn new(
        metrics: Arc<dyn MetricsSource>,
        news: Option<Arc<dyn NewsSource>>,
        cache: ResearchCache,
    ) -> Self {
        Self { metrics, news, cache }
    }

    /// Create the network-backed service described by the configuration
    ///
    /// Alpha Vantage enrichment and Tavily news are enabled only when their keys are set.
    pub fn from_config(config: &DebateConfig) -> Result<Self> {
        let mut metrics = MarketMetricsSource::new();
        if let Some(key) = &config.alpha_vantage_api_key {
            metrics = metrics.with_alpha_vantage(AlphaVantageClient::new(
                key.clone(),
                ALPHA_VANTAGE_RATE_LIMIT,
                config.request_timeout,
            )?);
        }

        let news: Option<Arc<dyn NewsSource>> = match &config.tavily_api_key {
            Some(key) => {
                let client =
                    TavilyClient::new(key.clone(), config.tavily_rate_limit, config.request_timeout)?;
                Some(Arc::new(TavilyNewsSource::new(
                    client,
                    config.news_max_results,
                    config.executive_max_results,
                )))
            }
            None => {
                tracing::warn!("TAVILY_API_KEY not set, debates will run without news");
                None
            }
        };

        let cache = ResearchCache::new(config.cache_ttl_metrics, config.cache_ttl_news);

        Ok(Self::new(Arc::new(metrics), news, cache))
    }

    /// Access the underlying caches
    pub fn cache(&self) -> &ResearchCache {
        &self.cache
    }

    /// Fetch metrics, news and executive changes concurrently
    #[tracing::instrument(skip(self))]
    pub async fn gather(&self, ticker: &str) -> Result<ResearchContext> {
        let ticker = ticker.trim().to_ascii_uppercase();
        if ticker.is_empty() {
            return Err(DebateError::unavailable(ticker, "Ticker is empty"));
        }

        let metrics_fut = self
            .cache
            .metrics
            .get_or_fetch(&ticker, || self.metrics.fetch_metrics(&ticker));

        let news_fut = async {
            match &self.news {
                Some(source) => Some(
                    self.cache
                        .news
                        .get_or_fetch(&ticker, || source.fetch_news(&ticker))
                        .await,
                ),
                None => None,
            }
        };

        let executive_fut = async {
            match &self.news {
                Some(source) => Some(
                    self.cache
                        .executive
                        .get_or_fetch(&ticker, || source.fetch_executive_changes(&ticker))
                        .await,
                ),
                None => None,
            }
        };

        let (metrics, news, executive) = tokio::join!(metrics_fut, news_fut, executive_fut);

        let metrics = match metrics {
            Ok(metrics) => metrics,
            Err(e @ DebateError::DataUnavailable { .. }) => return Err(e),
            Err(e) => return Err(DebateError::unavailable(&ticker, e.to_string())),
        };

        if metrics.is_empty() {
            return Err(DebateError::unavailable(&ticker, "No metrics available"));
        }

        let mut context = ResearchContext::new(ticker.clone(), metrics);

        match news {
            Some(Ok(items)) => context = context.with_news(items),
            Some(Err(e)) => tracing::warn!(ticker = %ticker, error = %e, "News unavailable, continuing without it"),
            None => {}
        }

        match executive {
            Some(Ok(items)) => context = context.with_executive_changes(items),
            Some(Err(e)) => {
                tracing::warn!(ticker = %ticker, error = %e, "Executive changes unavailable");
            }
            None => {}
        }

        tracing::info!(
            ticker = %context.ticker,
            news = context.news_items.len(),
            executive_changes = context.executive_changes.as_ref().map_or(0, Vec::len),
            "Research gathered"
        );

        Ok(context)
    }
}
