use crate::core::cache::Cache;
use crate::core::price::{AssetId, HistorySource, PriceHistoryProvider, PricePoint, StandardAsset};
use crate::providers::fallback::{FALLBACK_DAYS, synthetic_history};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

/// Cached, fallback-protected price histories for any [`AssetId`].
///
/// Bitcoin goes to the crypto source, everything else to the chart source.
/// Fresh cache entries short-circuit the network entirely. Concurrent
/// fetches of the same asset are not coalesced; the last one to finish owns
/// the cache slot.
#[derive(Clone)]
pub struct HistoryProvider {
    crypto: Arc<dyn HistorySource>,
    chart: Arc<dyn HistorySource>,
    cache: Arc<dyn Cache<AssetId, Vec<PricePoint>>>,
    fallback: bool,
}

impl HistoryProvider {
    pub fn new(
        crypto: Arc<dyn HistorySource>,
        chart: Arc<dyn HistorySource>,
        cache: Arc<dyn Cache<AssetId, Vec<PricePoint>>>,
    ) -> Self {
        Self {
            crypto,
            chart,
            cache,
            fallback: true,
        }
    }

    /// When disabled, upstream failures are returned instead of synthetic data.
    pub fn with_fallback(mut self, enabled: bool) -> Self {
        self.fallback = enabled;
        self
    }

    fn route<'a>(&'a self, asset: &'a AssetId) -> (&'a dyn HistorySource, &'a str) {
        match asset {
            AssetId::Standard(StandardAsset::Bitcoin) => {
                (self.crypto.as_ref(), StandardAsset::Bitcoin.upstream_symbol())
            }
            AssetId::Standard(other) => (self.chart.as_ref(), other.upstream_symbol()),
            AssetId::ExternalSymbol(ticker) => (self.chart.as_ref(), ticker.as_str()),
        }
    }

    async fn fetch_upstream(&self, asset: &AssetId) -> Result<Vec<PricePoint>> {
        let (source, symbol) = self.route(asset);
        let points = source.fetch_closes(symbol).await?;
        if points.is_empty() {
            return Err(anyhow!("Upstream returned no prices for {}", asset));
        }
        Ok(points)
    }
}

#[async_trait]
impl PriceHistoryProvider for HistoryProvider {
    async fn fetch_history(&self, asset: &AssetId) -> Result<Vec<PricePoint>> {
        if let Some(cached) = self.cache.get(asset).await {
            debug!("Cache hit for history: {}", asset);
            return Ok(cached);
        }
        debug!("Cache miss for history: {}", asset);

        match self.fetch_upstream(asset).await {
            Ok(points) => {
                self.cache.set(asset.clone(), points.clone()).await;
                Ok(points)
            }
            Err(e) if self.fallback => {
                warn!(asset = %asset, error = %e, "History fetch failed, using synthetic data");
                Ok(synthetic_history(asset, Utc::now().date_naive(), FALLBACK_DAYS))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryCache;
    use chrono::NaiveDate;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct MockSource {
        call_count: AtomicUsize,
        symbols: Mutex<Vec<String>>,
        fail: bool,
    }

    impl MockSource {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                call_count: AtomicUsize::new(0),
                symbols: Mutex::new(Vec::new()),
                fail,
            })
        }

        fn calls(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HistorySource for MockSource {
        async fn fetch_closes(&self, symbol: &str) -> Result<Vec<PricePoint>> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            self.symbols.lock().unwrap().push(symbol.to_string());
            if self.fail {
                return Err(anyhow!("Connection refused"));
            }
            Ok(vec![PricePoint::new(
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                42.0,
            )])
        }
    }

    fn provider(crypto: Arc<MockSource>, chart: Arc<MockSource>, ttl: Duration) -> HistoryProvider {
        HistoryProvider::new(
            crypto,
            chart,
            Arc::new(MemoryCache::<AssetId, Vec<PricePoint>>::new(ttl)),
        )
    }

    #[tokio::test]
    async fn test_routes_assets_to_sources() {
        let crypto = MockSource::new(false);
        let chart = MockSource::new(false);
        let provider = provider(crypto.clone(), chart.clone(), Duration::from_secs(60));

        provider.fetch_history(&AssetId::Standard(StandardAsset::Bitcoin)).await.unwrap();
        provider.fetch_history(&AssetId::Standard(StandardAsset::Silver)).await.unwrap();
        provider.fetch_history(&AssetId::external("fpt.vn")).await.unwrap();

        assert_eq!(*crypto.symbols.lock().unwrap(), vec!["BTCUSDT"]);
        assert_eq!(*chart.symbols.lock().unwrap(), vec!["SI=F", "FPT.VN"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_hit_within_ttl_and_refetch_after_expiry() {
        let crypto = MockSource::new(false);
        let chart = MockSource::new(false);
        let provider = provider(crypto.clone(), chart, Duration::from_secs(3600));
        let btc = AssetId::Standard(StandardAsset::Bitcoin);

        let first = provider.fetch_history(&btc).await.unwrap();
        tokio::time::advance(Duration::from_secs(3599)).await;
        let second = provider.fetch_history(&btc).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(crypto.calls(), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        provider.fetch_history(&btc).await.unwrap();
        provider.fetch_history(&btc).await.unwrap();
        assert_eq!(crypto.calls(), 2);
    }

    #[tokio::test]
    async fn test_failure_returns_fallback_and_is_not_cached() {
        let crypto = MockSource::new(true);
        let chart = MockSource::new(false);
        let provider = provider(crypto.clone(), chart, Duration::from_secs(3600));
        let btc = AssetId::Standard(StandardAsset::Bitcoin);

        let points = provider.fetch_history(&btc).await.unwrap();
        assert_eq!(points.len(), FALLBACK_DAYS as usize);
        assert!(points.windows(2).all(|w| w[0].day < w[1].day));

        // next call tries the network again
        provider.fetch_history(&btc).await.unwrap();
        assert_eq!(crypto.calls(), 2);
    }

    #[tokio::test]
    async fn test_failure_without_fallback_is_an_error() {
        let chart = MockSource::new(true);
        let provider = provider(MockSource::new(false), chart, Duration::from_secs(3600))
            .with_fallback(false);

        let result = provider.fetch_history(&AssetId::external("AAPL")).await;
        assert_eq!(result.unwrap_err().to_string(), "Connection refused");
    }

    #[tokio::test]
    async fn test_cache_invalidation_forces_refetch() {
        let chart = MockSource::new(false);
        let cache = Arc::new(MemoryCache::<AssetId, Vec<PricePoint>>::new(Duration::from_secs(3600)));
        let provider = HistoryProvider::new(MockSource::new(false), chart.clone(), cache.clone());
        let gold = AssetId::Standard(StandardAsset::Gold);

        provider.fetch_history(&gold).await.unwrap();
        cache.invalidate(&gold).await;
        provider.fetch_history(&gold).await.unwrap();
        assert_eq!(chart.calls(), 2);
    }
}
