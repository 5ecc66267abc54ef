use crate::error::IndexError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One trading day of a single instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub close: f64,
    #[serde(default)]
    pub volume: Option<f64>,
}

/// Ordered daily closes for a single instrument (price, yield or volatility
/// index). Dates are strictly increasing; missing trading days are simply
/// absent, never zero-filled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailySeries {
    points: Vec<DailyPoint>,
}

impl DailySeries {
    /// Build a series, enforcing the strictly-increasing date invariant.
    pub fn new(points: Vec<DailyPoint>) -> Result<Self, IndexError> {
        for pair in points.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(IndexError::InvalidSeries(format!(
                    "dates not strictly increasing: {} then {}",
                    pair[0].date, pair[1].date
                )));
            }
        }
        Ok(Self { points })
    }

    pub fn from_closes(start: NaiveDate, closes: &[f64]) -> Self {
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| DailyPoint {
                date: start + chrono::Duration::days(i as i64),
                close,
                volume: None,
            })
            .collect();
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[DailyPoint] {
        &self.points
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.points.iter().filter_map(|p| p.volume).collect()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.points.last().map(|p| p.close)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Close as of `date`: the last point on or before that day.
    pub fn close_on(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .iter()
            .rev()
            .find(|p| p.date <= date)
            .map(|p| p.close)
    }

    /// View of the series up to and including `date`, for historical replay.
    pub fn truncated(&self, date: NaiveDate) -> DailySeries {
        let points = self
            .points
            .iter()
            .filter(|p| p.date <= date)
            .copied()
            .collect();
        DailySeries { points }
    }
}

/// Rate series the engine consumes from the official economic-data feed,
/// with a market-data proxy used when the official feed is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RateKind {
    /// 10-year TIPS real yield (FRED DFII10; proxy ^TNX nominal 10Y).
    RealYield10Y,
    /// 10Y minus 2Y Treasury spread (FRED DGS10/DGS2; proxy ^TNX - ^IRX).
    YieldCurveSpread,
}

impl RateKind {
    pub fn fred_series(&self) -> &'static [&'static str] {
        match self {
            RateKind::RealYield10Y => &["DFII10"],
            RateKind::YieldCurveSpread => &["DGS10", "DGS2"],
        }
    }

    pub fn proxy_symbols(&self) -> &'static [&'static str] {
        match self {
            RateKind::RealYield10Y => &["^TNX"],
            RateKind::YieldCurveSpread => &["^TNX", "^IRX"],
        }
    }
}

/// Which provider ultimately produced a rate observation. The scoring
/// formulas apply different empirical constants per provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateProvider {
    Official,
    Proxy,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateObservation {
    pub value: f64,
    pub provider: RateProvider,
}

/// Everything the scoring engine needs for one asset class run, fetched up
/// front so aggregation never blocks on the network. Series that could not
/// be fetched from any source are simply absent; the engine decides whether
/// that degrades a single component or fails the run.
#[derive(Debug, Clone, Default)]
pub struct SeriesBundle {
    pub prices: BTreeMap<String, DailySeries>,
    pub rates: BTreeMap<RateKind, RateObservation>,
}

impl SeriesBundle {
    pub fn price(&self, symbol: &str) -> Option<&DailySeries> {
        self.prices.get(symbol)
    }

    pub fn rate(&self, kind: RateKind) -> Option<RateObservation> {
        self.rates.get(&kind).copied()
    }

    pub fn insert_price(&mut self, symbol: &str, series: DailySeries) {
        self.prices.insert(symbol.to_string(), series);
    }

    pub fn insert_rate(&mut self, kind: RateKind, obs: RateObservation) {
        self.rates.insert(kind, obs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn rejects_non_increasing_dates() {
        let points = vec![
            DailyPoint { date: d("2024-03-04"), close: 10.0, volume: None },
            DailyPoint { date: d("2024-03-04"), close: 11.0, volume: None },
        ];
        assert!(DailySeries::new(points).is_err());
    }

    #[test]
    fn truncated_keeps_points_up_to_date() {
        let series = DailySeries::from_closes(d("2024-01-01"), &[1.0, 2.0, 3.0, 4.0]);
        let cut = series.truncated(d("2024-01-02"));
        assert_eq!(cut.len(), 2);
        assert_eq!(cut.last_close(), Some(2.0));
    }

    #[test]
    fn close_on_skips_missing_days() {
        let points = vec![
            DailyPoint { date: d("2024-01-01"), close: 1.0, volume: None },
            DailyPoint { date: d("2024-01-04"), close: 4.0, volume: None },
        ];
        let series = DailySeries::new(points).unwrap();
        // Jan 2-3 absent: resolves to the last traded close before the gap.
        assert_eq!(series.close_on(d("2024-01-03")), Some(1.0));
        assert_eq!(series.close_on(d("2024-01-04")), Some(4.0));
    }
}
