use crate::{FredClient, YahooClient};
use async_trait::async_trait;
use chrono::NaiveDate;
use futures_util::future::join_all;
use index_core::{
    DailySeries, IndexError, RateKind, RateObservation, RateProvider, SeriesBundle,
};
use std::sync::Arc;

/// Seam for price/volume series so tests can inject fixtures.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn daily_series(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DailySeries, IndexError>;
}

/// Seam for the official rate feed.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn latest(&self, series_id: &str) -> Result<f64, IndexError>;
}

#[async_trait]
impl PriceSource for YahooClient {
    async fn daily_series(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DailySeries, IndexError> {
        YahooClient::daily_series(self, symbol, start, end).await
    }
}

#[async_trait]
impl RateSource for FredClient {
    async fn latest(&self, series_id: &str) -> Result<f64, IndexError> {
        FredClient::latest(self, series_id).await
    }
}

/// Assembles the per-run [`SeriesBundle`]: prices fan out concurrently to
/// the market feed; rate series go official-source-first with the market
/// proxy as fallback. A series both sources fail to produce is left out of
/// the bundle — never replaced by a neutral constant — so the engine can
/// apply its own degradation policy per component.
pub struct SeriesFetcher {
    prices: Arc<dyn PriceSource>,
    rates: Option<Arc<dyn RateSource>>,
}

impl SeriesFetcher {
    pub fn new(prices: Arc<dyn PriceSource>, rates: Option<Arc<dyn RateSource>>) -> Self {
        Self { prices, rates }
    }

    pub async fn fetch_bundle(
        &self,
        symbols: &[&str],
        rate_kinds: &[RateKind],
        start: NaiveDate,
        end: NaiveDate,
    ) -> SeriesBundle {
        let mut bundle = SeriesBundle::default();

        let fetches = symbols
            .iter()
            .map(|&symbol| async move {
                (symbol, self.prices.daily_series(symbol, start, end).await)
            });
        for (symbol, result) in join_all(fetches).await {
            match result {
                Ok(series) => {
                    tracing::debug!("{}: {} days", symbol, series.len());
                    bundle.insert_price(symbol, series);
                }
                Err(e) => tracing::warn!("price series {} unavailable: {}", symbol, e),
            }
        }

        for &kind in rate_kinds {
            match self.fetch_rate(kind, start, end, &bundle).await {
                Ok(obs) => bundle.insert_rate(kind, obs),
                Err(e) => tracing::warn!("rate series {:?} unavailable from all sources: {}", kind, e),
            }
        }

        bundle
    }

    /// Official feed first; on any failure, derive the value from market
    /// proxy series instead.
    async fn fetch_rate(
        &self,
        kind: RateKind,
        start: NaiveDate,
        end: NaiveDate,
        bundle: &SeriesBundle,
    ) -> Result<RateObservation, IndexError> {
        if let Some(rates) = &self.rates {
            match self.official_value(rates.as_ref(), kind).await {
                Ok(value) => {
                    return Ok(RateObservation { value, provider: RateProvider::Official })
                }
                Err(e) => {
                    tracing::warn!("official source failed for {:?} ({}), using proxy", kind, e)
                }
            }
        } else {
            tracing::warn!("no FRED API key, {:?} falls back to market proxy", kind);
        }

        let value = self.proxy_value(kind, start, end, bundle).await?;
        Ok(RateObservation { value, provider: RateProvider::Proxy })
    }

    async fn official_value(&self, rates: &dyn RateSource, kind: RateKind) -> Result<f64, IndexError> {
        match kind.fred_series() {
            [series_id] => rates.latest(series_id).await,
            [long_id, short_id] => {
                let (long, short) =
                    tokio::try_join!(rates.latest(long_id), rates.latest(short_id))?;
                Ok(long - short)
            }
            _ => Err(IndexError::ConfigError(format!("bad rate mapping for {:?}", kind))),
        }
    }

    async fn proxy_value(
        &self,
        kind: RateKind,
        start: NaiveDate,
        end: NaiveDate,
        bundle: &SeriesBundle,
    ) -> Result<f64, IndexError> {
        let mut values = Vec::with_capacity(2);
        for &symbol in kind.proxy_symbols() {
            // Reuse an already-fetched proxy series before going back out.
            let close = match bundle.price(symbol).and_then(|s| s.last_close()) {
                Some(close) => close,
                None => self
                    .prices
                    .daily_series(symbol, start, end)
                    .await?
                    .last_close()
                    .ok_or_else(|| IndexError::SourceUnavailable(symbol.to_string()))?,
            };
            values.push(close);
        }
        match values.as_slice() {
            [level] => Ok(*level),
            [long, short] => Ok(long - short),
            _ => Err(IndexError::SourceUnavailable(format!("{:?}", kind))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    struct FixturePrices {
        series: BTreeMap<String, DailySeries>,
    }

    #[async_trait]
    impl PriceSource for FixturePrices {
        async fn daily_series(
            &self,
            symbol: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<DailySeries, IndexError> {
            self.series
                .get(symbol)
                .cloned()
                .ok_or_else(|| IndexError::ApiError(format!("no fixture for {}", symbol)))
        }
    }

    struct FailingRates {
        calls: Mutex<u32>,
    }

    #[async_trait]
    impl RateSource for FailingRates {
        async fn latest(&self, _series_id: &str) -> Result<f64, IndexError> {
            *self.calls.lock().unwrap() += 1;
            Err(IndexError::ApiError("FRED down".to_string()))
        }
    }

    struct FixedRates;

    #[async_trait]
    impl RateSource for FixedRates {
        async fn latest(&self, series_id: &str) -> Result<f64, IndexError> {
            match series_id {
                "DFII10" => Ok(1.8),
                "DGS10" => Ok(4.2),
                "DGS2" => Ok(3.9),
                _ => Err(IndexError::ApiError(format!("unknown series {}", series_id))),
            }
        }
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn prices_with(symbols: &[(&str, &[f64])]) -> Arc<FixturePrices> {
        let mut series = BTreeMap::new();
        for (symbol, closes) in symbols {
            series.insert(
                symbol.to_string(),
                DailySeries::from_closes(day("2026-05-01"), closes),
            );
        }
        Arc::new(FixturePrices { series })
    }

    #[tokio::test]
    async fn official_rate_wins_when_available() {
        let fetcher = SeriesFetcher::new(prices_with(&[]), Some(Arc::new(FixedRates)));
        let bundle = fetcher
            .fetch_bundle(&[], &[RateKind::RealYield10Y, RateKind::YieldCurveSpread], day("2026-05-01"), day("2026-08-01"))
            .await;

        let tips = bundle.rate(RateKind::RealYield10Y).unwrap();
        assert_eq!(tips.provider, RateProvider::Official);
        assert_eq!(tips.value, 1.8);

        let curve = bundle.rate(RateKind::YieldCurveSpread).unwrap();
        assert!((curve.value - 0.3).abs() < 1e-9);
    }

    #[tokio::test]
    async fn falls_back_to_proxy_when_official_fails() {
        let rates = Arc::new(FailingRates { calls: Mutex::new(0) });
        let prices = prices_with(&[("^TNX", &[4.0, 4.1, 4.25])]);
        let fetcher = SeriesFetcher::new(prices, Some(rates.clone()));

        let bundle = fetcher
            .fetch_bundle(&[], &[RateKind::RealYield10Y], day("2026-05-01"), day("2026-08-01"))
            .await;

        let tips = bundle.rate(RateKind::RealYield10Y).unwrap();
        assert_eq!(tips.provider, RateProvider::Proxy);
        assert_eq!(tips.value, 4.25);
        assert!(*rates.calls.lock().unwrap() >= 1);
    }

    #[tokio::test]
    async fn curve_proxy_is_tnx_minus_irx() {
        let prices = prices_with(&[("^TNX", &[4.25]), ("^IRX", &[4.05])]);
        let fetcher = SeriesFetcher::new(prices, None);

        let bundle = fetcher
            .fetch_bundle(&[], &[RateKind::YieldCurveSpread], day("2026-05-01"), day("2026-08-01"))
            .await;

        let curve = bundle.rate(RateKind::YieldCurveSpread).unwrap();
        assert_eq!(curve.provider, RateProvider::Proxy);
        assert!((curve.value - 0.2).abs() < 1e-9);
    }

    #[tokio::test]
    async fn missing_everywhere_leaves_rate_out_of_bundle() {
        let fetcher = SeriesFetcher::new(prices_with(&[]), None);
        let bundle = fetcher
            .fetch_bundle(&[], &[RateKind::RealYield10Y], day("2026-05-01"), day("2026-08-01"))
            .await;
        // Absent, not a silent neutral value.
        assert!(bundle.rate(RateKind::RealYield10Y).is_none());
    }

    #[tokio::test]
    async fn failed_price_series_is_omitted_not_faked() {
        let prices = prices_with(&[("SPY", &[500.0, 502.0])]);
        let fetcher = SeriesFetcher::new(prices, None);
        let bundle = fetcher
            .fetch_bundle(&["SPY", "RSP"], &[], day("2026-05-01"), day("2026-08-01"))
            .await;
        assert!(bundle.price("SPY").is_some());
        assert!(bundle.price("RSP").is_none());
    }
}
