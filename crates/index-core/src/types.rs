use crate::stats::round1;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The four asset classes the index covers. Each owns exactly one
/// persisted artifact; runs for different asset classes never share state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Gold,
    Stocks,
    Crypto,
    Bonds,
}

impl AssetClass {
    pub const ALL: [AssetClass; 4] = [
        AssetClass::Gold,
        AssetClass::Stocks,
        AssetClass::Crypto,
        AssetClass::Bonds,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Gold => "gold",
            AssetClass::Stocks => "stocks",
            AssetClass::Crypto => "crypto",
            AssetClass::Bonds => "bonds",
        }
    }

    pub fn parse(s: &str) -> Option<AssetClass> {
        match s {
            "gold" => Some(AssetClass::Gold),
            "stocks" => Some(AssetClass::Stocks),
            "crypto" => Some(AssetClass::Crypto),
            "bonds" => Some(AssetClass::Bonds),
            _ => None,
        }
    }

    /// File name of the per-asset artifact, e.g. `gold-fear-greed.json`.
    pub fn artifact_file(&self) -> String {
        format!("{}-fear-greed.json", self.as_str())
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discrete sentiment label derived from the aggregate score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    #[serde(rename = "Extreme Fear")]
    ExtremeFear,
    #[serde(rename = "Fear")]
    Fear,
    #[serde(rename = "Neutral")]
    Neutral,
    #[serde(rename = "Greed")]
    Greed,
    #[serde(rename = "Extreme Greed")]
    ExtremeGreed,
}

impl Label {
    /// Threshold table with inclusive upper bounds: a score of exactly 25
    /// is Extreme Fear, exactly 55 is Neutral, exactly 75 is Greed.
    /// Applied to the display-rounded score so the label always matches
    /// the published number.
    pub fn for_score(score: f64) -> Label {
        let s = round1(score);
        if s <= 25.0 {
            Label::ExtremeFear
        } else if s <= 45.0 {
            Label::Fear
        } else if s <= 55.0 {
            Label::Neutral
        } else if s <= 75.0 {
            Label::Greed
        } else {
            Label::ExtremeGreed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::ExtremeFear => "Extreme Fear",
            Label::Fear => "Fear",
            Label::Neutral => "Neutral",
            Label::Greed => "Greed",
            Label::ExtremeGreed => "Extreme Greed",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named, weighted sub-indicator of an asset-class index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentScore {
    pub score: f64,
    pub weight: f64,
    pub detail: String,
}

/// The result of one full index computation for one calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSnapshot {
    pub date: NaiveDate,
    /// Full-precision aggregate; display fields round to 0.1.
    pub score: f64,
    pub label: Label,
    pub components: BTreeMap<String, ComponentScore>,
    /// ISO-8601 instant of computation, e.g. `2026-08-27T06:00:00Z`.
    pub timestamp: String,
}

/// One row of the rolling score history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: NaiveDate,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

/// Summary statistics attached to rebuild artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

impl ScoreStats {
    pub fn from_history(history: &[HistoryEntry]) -> Option<ScoreStats> {
        if history.is_empty() {
            return None;
        }
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for entry in history {
            min = min.min(entry.score);
            max = max.max(entry.score);
            sum += entry.score;
        }
        Some(ScoreStats {
            min: round1(min),
            max: round1(max),
            avg: round1(sum / history.len() as f64),
        })
    }
}

/// First and last dates covered by a rebuilt history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// The sole persisted state per asset class: the latest snapshot fields
/// plus the rolling history, rewritten atomically once per run. The
/// optional summary fields are populated by rebuild runs only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedArtifact {
    pub score: f64,
    pub label: Label,
    pub timestamp: String,
    pub components: BTreeMap<String, ComponentScore>,
    /// Ascending by date, one entry per calendar day.
    pub history: Vec<HistoryEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_stats: Option<ScoreStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_days: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
}
