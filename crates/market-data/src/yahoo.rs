use chrono::{DateTime, NaiveDate, Utc};
use index_core::{DailyPoint, DailySeries, IndexError};
use std::time::Duration;

const CHART_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

/// Client for the Yahoo Finance chart API, used for all price, volume and
/// volatility-index series and as the proxy source for rate series.
#[derive(Clone)]
pub struct YahooClient {
    client: reqwest::Client,
}

impl YahooClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }

    /// Daily closes (and volume where published) for `symbol` over
    /// `[start, end]` inclusive.
    pub async fn daily_series(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DailySeries, IndexError> {
        let period1 = start
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or(0);
        let period2 = end
            .and_hms_opt(23, 59, 59)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or(0);
        let url = format!(
            "{}/{}?period1={}&period2={}&interval=1d",
            CHART_URL, symbol, period1, period2
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| IndexError::ApiError(format!("Yahoo {}: {}", symbol, e)))?;

        if !response.status().is_success() {
            return Err(IndexError::ApiError(format!(
                "Yahoo {}: HTTP {}",
                symbol,
                response.status()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| IndexError::ApiError(format!("Yahoo {}: {}", symbol, e)))?;

        parse_chart(symbol, &body)
    }
}

impl Default for YahooClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a chart payload into a daily series. Days where the close is
/// null are dropped (absent, not zero-filled); duplicate timestamps on the
/// same calendar day keep the last print.
pub(crate) fn parse_chart(symbol: &str, body: &serde_json::Value) -> Result<DailySeries, IndexError> {
    let result = body
        .get("chart")
        .and_then(|v| v.get("result"))
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| IndexError::ApiError(format!("Yahoo {}: no chart result", symbol)))?;

    let timestamps = result
        .get("timestamp")
        .and_then(|v| v.as_array())
        .ok_or_else(|| IndexError::ApiError(format!("Yahoo {}: no timestamps", symbol)))?;

    let quote = result
        .get("indicators")
        .and_then(|v| v.get("quote"))
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| IndexError::ApiError(format!("Yahoo {}: no quote data", symbol)))?;

    let closes = quote
        .get("close")
        .and_then(|v| v.as_array())
        .ok_or_else(|| IndexError::ApiError(format!("Yahoo {}: no close prices", symbol)))?;
    let volumes = quote.get("volume").and_then(|v| v.as_array());

    let mut points: Vec<DailyPoint> = Vec::with_capacity(timestamps.len());
    for i in 0..timestamps.len() {
        let (Some(ts), Some(close)) = (timestamps[i].as_i64(), closes.get(i).and_then(|v| v.as_f64()))
        else {
            continue;
        };
        let date = DateTime::<Utc>::from_timestamp(ts, 0)
            .map(|dt| dt.date_naive())
            .ok_or_else(|| IndexError::ApiError(format!("Yahoo {}: bad timestamp {}", symbol, ts)))?;
        let volume = volumes
            .and_then(|v| v.get(i))
            .and_then(|v| v.as_f64())
            .filter(|&v| v > 0.0);

        match points.last_mut() {
            Some(last) if last.date == date => {
                last.close = close;
                last.volume = volume.or(last.volume);
            }
            _ => points.push(DailyPoint { date, close, volume }),
        }
    }

    if points.is_empty() {
        return Err(IndexError::ApiError(format!("Yahoo {}: empty series", symbol)));
    }
    DailySeries::new(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart_body(timestamps: &[i64], closes: &[Option<f64>]) -> serde_json::Value {
        serde_json::json!({
            "chart": {
                "result": [{
                    "timestamp": timestamps,
                    "indicators": {
                        "quote": [{
                            "close": closes,
                            "volume": closes.iter().map(|_| 1_000_000).collect::<Vec<_>>(),
                        }]
                    }
                }]
            }
        })
    }

    #[test]
    fn parses_chart_closes_and_dates() {
        // Two consecutive UTC trading days
        let body = chart_body(&[1787990400, 1788076800], &[Some(101.5), Some(102.25)]);
        let series = parse_chart("SPY", &body).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.last_close(), Some(102.25));
        assert_eq!(series.points()[0].volume, Some(1_000_000.0));
    }

    #[test]
    fn null_closes_become_gaps() {
        let body = chart_body(
            &[1787990400, 1788076800, 1788163200],
            &[Some(101.5), None, Some(103.0)],
        );
        let series = parse_chart("SPY", &body).unwrap();
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn same_day_duplicate_keeps_last_print() {
        let body = chart_body(&[1787990400, 1787994000], &[Some(101.5), Some(101.9)]);
        let series = parse_chart("GC=F", &body).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.last_close(), Some(101.9));
    }

    #[test]
    fn empty_payload_is_an_error() {
        let body = serde_json::json!({"chart": {"result": []}});
        assert!(parse_chart("SPY", &body).is_err());
    }
}
