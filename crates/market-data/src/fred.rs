use chrono::NaiveDate;
use index_core::{DailyPoint, DailySeries, IndexError};
use std::time::Duration;

const BASE_URL: &str = "https://api.stlouisfed.org/fred/series/observations";

/// Client for the FRED observations endpoint. Observations with the `.`
/// placeholder value (weekends, unpublished days) are skipped, never
/// treated as zero.
#[derive(Clone)]
pub struct FredClient {
    api_key: String,
    client: reqwest::Client,
}

impl FredClient {
    pub fn new(api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { api_key, client }
    }

    /// Latest published value of a series, scanning back over recent
    /// observations until a non-null one is found.
    pub async fn latest(&self, series_id: &str) -> Result<f64, IndexError> {
        let response = self
            .client
            .get(BASE_URL)
            .query(&[
                ("series_id", series_id),
                ("api_key", &self.api_key),
                ("file_type", "json"),
                ("sort_order", "desc"),
                ("limit", "30"),
            ])
            .send()
            .await
            .map_err(|e| IndexError::ApiError(format!("FRED {}: {}", series_id, e)))?;

        if !response.status().is_success() {
            return Err(IndexError::ApiError(format!(
                "FRED {}: HTTP {}",
                series_id,
                response.status()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| IndexError::ApiError(format!("FRED {}: {}", series_id, e)))?;

        if let Some(msg) = body.get("error_message").and_then(|v| v.as_str()) {
            return Err(IndexError::ApiError(format!("FRED {}: {}", series_id, msg)));
        }

        let observations = parse_observations(&body)?;
        observations
            .last()
            .map(|p| p.close)
            .ok_or_else(|| IndexError::ApiError(format!("FRED {}: all observations null", series_id)))
    }

    /// Full observation series over a date range, ascending by date.
    pub async fn series(
        &self,
        series_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DailySeries, IndexError> {
        let response = self
            .client
            .get(BASE_URL)
            .query(&[
                ("series_id", series_id),
                ("api_key", &self.api_key),
                ("file_type", "json"),
                ("observation_start", &start.to_string()),
                ("observation_end", &end.to_string()),
            ])
            .send()
            .await
            .map_err(|e| IndexError::ApiError(format!("FRED {}: {}", series_id, e)))?;

        if !response.status().is_success() {
            return Err(IndexError::ApiError(format!(
                "FRED {}: HTTP {}",
                series_id,
                response.status()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| IndexError::ApiError(format!("FRED {}: {}", series_id, e)))?;

        let points = parse_observations(&body)?;
        DailySeries::new(points)
    }
}

/// Decode a FRED observations payload into ascending daily points,
/// skipping null (`.`) values.
pub(crate) fn parse_observations(body: &serde_json::Value) -> Result<Vec<DailyPoint>, IndexError> {
    let observations = body
        .get("observations")
        .and_then(|v| v.as_array())
        .ok_or_else(|| IndexError::ApiError("FRED: no observations in response".to_string()))?;

    let mut points: Vec<DailyPoint> = Vec::with_capacity(observations.len());
    for obs in observations {
        let raw = obs.get("value").and_then(|v| v.as_str()).unwrap_or(".");
        if raw == "." {
            continue;
        }
        let value: f64 = raw
            .parse()
            .map_err(|_| IndexError::ApiError(format!("FRED: bad value {:?}", raw)))?;
        let date: NaiveDate = obs
            .get("date")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| IndexError::ApiError("FRED: bad observation date".to_string()))?;
        points.push(DailyPoint { date, close: value, volume: None });
    }
    points.sort_by_key(|p| p.date);
    points.dedup_by_key(|p| p.date);
    Ok(points)
}
