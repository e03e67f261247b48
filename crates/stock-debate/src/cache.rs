//! Per-ticker caching of research results to reduce API calls

use crate::research::{NewsItem, StockMetrics};
use cached::{Cached, TimedCache};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Thread-safe TTL cache keyed by normalized ticker
pub struct TickerCache<V> {
    cache: Arc<RwLock<TimedCache<String, V>>>,
}

impl<V: Clone> TickerCache<V> {
    /// Create a new cache with specified TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Arc::new(RwLock::new(TimedCache::with_lifespan(ttl))),
        }
    }

    fn key(ticker: &str) -> String {
        ticker.trim().to_ascii_uppercase()
    }

    /// Get a value from the cache
    pub async fn get(&self, ticker: &str) -> Option<V> {
        // cache_get needs &mut for expiry
        let mut cache = self.cache.write().await;
        cache.cache_get(&Self::key(ticker)).cloned()
    }

    /// Insert a value into the cache
    pub async fn insert(&self, ticker: &str, value: V) {
        let mut cache = self.cache.write().await;
        let _ = cache.cache_set(Self::key(ticker), value);
    }

    /// Get or fetch a value using the provided fetcher function
    ///
    /// Failed fetches are not cached.
    pub async fn get_or_fetch<F, Fut, E>(&self, ticker: &str, fetcher: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(ticker).await {
            tracing::debug!(ticker, "Cache hit");
            return Ok(value);
        }

        tracing::debug!(ticker, "Cache miss");

        let value = fetcher().await?;
        self.insert(ticker, value.clone()).await;

        Ok(value)
    }

    /// Invalidate the entry for a ticker
    pub async fn invalidate(&self, ticker: &str) {
        let mut cache = self.cache.write().await;
        let _ = cache.cache_remove(&Self::key(ticker));
    }

    /// Clear all cached entries
    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        cache.cache_clear();
    }

    /// Get the number of cached entries
    pub async fn len(&self) -> usize {
        let cache = self.cache.read().await;
        cache.cache_size()
    }

    /// Check if the cache is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl<V> Clone for TickerCache<V> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
        }
    }
}

/// Caches for each kind of research data
#[derive(Clone)]
pub struct ResearchCache {
    /// Price and fundamentals, short TTL
    pub metrics: TickerCache<StockMetrics>,
    /// News search results
    pub news: TickerCache<Vec<NewsItem>>,
    /// Executive-change search results, shares the news TTL
    pub executive: TickerCache<Vec<NewsItem>>,
}

impl ResearchCache {
    /// Create caches with the given TTLs
    pub fn new(metrics_ttl: Duration, news_ttl: Duration) -> Self {
        Self {
            metrics: TickerCache::new(metrics_ttl),
            news: TickerCache::new(news_ttl),
            executive: TickerCache::new(news_ttl),
        }
    }

    /// Clear all caches
    pub async fn clear_all(&self) {
        self.metrics.clear().await;
        self.news.clear().await;
        self.executive.clear().await;
    }
}

impl Default for ResearchCache {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(60),  // 1 minute for metrics
            Duration::from_secs(300), // 5 minutes for news
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_key_normalization() {
        let cache: TickerCache<u32> = TickerCache::new(Duration::from_secs(60));
        cache.insert(" aapl ", 7).await;
        assert_eq!(cache.get("AAPL").await, Some(7));
    }

    #[tokio::test]
    async fn test_get_or_fetch_caches_success() {
        let cache: TickerCache<u32> = TickerCache::new(Duration::from_secs(60));

        let mut call_count = 0;
        let result = cache
            .get_or_fetch("AAPL", || {
                call_count += 1;
                async { Ok::<_, String>(1) }
            })
            .await
            .unwrap();
        assert_eq!(result, 1);

        let result = cache
            .get_or_fetch("AAPL", || {
                call_count += 1;
                async { Ok::<_, String>(2) }
            })
            .await
            .unwrap();
        assert_eq!(result, 1);
        assert_eq!(call_count, 1);
    }

    #[tokio::test]
    async fn test_get_or_fetch_skips_errors() {
        let cache: TickerCache<u32> = TickerCache::new(Duration::from_secs(60));

        let result = cache
            .get_or_fetch("AAPL", || async { Err::<u32, _>("down".to_string()) })
            .await;
        assert!(result.is_err());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_research_cache_clear_all() {
        let cache = ResearchCache::default();
        cache.metrics.insert("AAPL", StockMetrics::empty("AAPL")).await;
        cache.news.insert("AAPL", Vec::new()).await;
        cache.metrics.invalidate("aapl").await;
        assert!(cache.metrics.is_empty().await);

        cache.clear_all().await;
        assert!(cache.news.is_empty().await);
    }
}
