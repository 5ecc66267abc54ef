use crate::aggregate::weighted_total;
use crate::formula::Outcome;
use crate::profile::AssetProfile;
use chrono::{Duration, NaiveDate};
use index_core::stats::{clamp_score, round1};
use index_core::{
    ComponentScore, HistoryEntry, IndexError, IndexSnapshot, Label, PersistedArtifact,
    SeriesBundle,
};
use std::collections::BTreeMap;

/// Evaluates one asset-class profile against a series bundle. The engine
/// is profile-driven end to end: the same code path scores all four asset
/// classes.
pub struct ScoringEngine {
    profile: AssetProfile,
}

impl ScoringEngine {
    pub fn new(profile: AssetProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &AssetProfile {
        &self.profile
    }

    /// Score today's index. Degradation policy per component:
    /// insufficient history scores the neutral baseline; a series missing
    /// from every source carries the previous artifact's component score
    /// forward with a flagged detail, and fails the run if there is no
    /// previous value to carry.
    pub fn compute_snapshot(
        &self,
        bundle: &SeriesBundle,
        previous: Option<&PersistedArtifact>,
        date: NaiveDate,
        timestamp: String,
    ) -> Result<IndexSnapshot, IndexError> {
        self.snapshot_at(bundle, previous, date, timestamp, None)
    }

    /// Snapshot with full component breakdown for a past date, used by
    /// rebuild to head the artifact with the final replayed day.
    pub fn replay_snapshot(
        &self,
        bundle: &SeriesBundle,
        date: NaiveDate,
        timestamp: String,
    ) -> Result<IndexSnapshot, IndexError> {
        self.snapshot_at(bundle, None, date, timestamp, Some(date))
    }

    fn snapshot_at(
        &self,
        bundle: &SeriesBundle,
        previous: Option<&PersistedArtifact>,
        date: NaiveDate,
        timestamp: String,
        as_of: Option<NaiveDate>,
    ) -> Result<IndexSnapshot, IndexError> {
        let mut components = BTreeMap::new();
        for spec in &self.profile.components {
            let (score, detail) = match spec.formula.evaluate(bundle, as_of) {
                Outcome::Scored { score, detail } => (score, detail),
                Outcome::Insufficient => {
                    tracing::warn!(
                        "{} {}: insufficient history, scoring neutral",
                        self.profile.asset,
                        spec.name
                    );
                    (self.profile.neutral, "insufficient data".to_string())
                }
                Outcome::Unavailable { source } => {
                    let Some(prev) = previous.and_then(|p| p.components.get(spec.name)) else {
                        return Err(IndexError::SourceUnavailable(format!(
                            "{} (component {})",
                            source, spec.name
                        )));
                    };
                    tracing::warn!(
                        "{} {}: {} unavailable from all sources, carrying forward {}",
                        self.profile.asset,
                        spec.name,
                        source,
                        prev.score
                    );
                    (
                        prev.score,
                        format!("{} unavailable, previous value retained", source),
                    )
                }
            };
            tracing::info!(
                "  {:<16} {:>5.1} (wt {:.2}) {}",
                spec.name,
                score,
                spec.weight,
                detail
            );
            components.insert(
                spec.name.to_string(),
                ComponentScore { score: round1(score), weight: spec.weight, detail },
            );
        }

        let total = weighted_total(&components);
        Ok(IndexSnapshot {
            date,
            score: total,
            label: Label::for_score(total),
            components,
            timestamp,
        })
    }

    /// Replay the full formula set over each of the anchor's trading days
    /// in the window, series truncated at the target date. Days where any
    /// component lacks inputs are skipped, never interpolated, so the
    /// result is deterministic for a given bundle.
    pub fn rebuild_history(
        &self,
        bundle: &SeriesBundle,
        today: NaiveDate,
        window_days: i64,
    ) -> Vec<HistoryEntry> {
        let Some(anchor) = bundle.price(self.profile.anchor) else {
            tracing::warn!(
                "{}: anchor series {} missing, nothing to rebuild",
                self.profile.asset,
                self.profile.anchor
            );
            return Vec::new();
        };
        let cutoff = today - Duration::days(window_days);

        let mut entries = Vec::new();
        let mut skipped = 0usize;
        for point in anchor.points() {
            if point.date < cutoff || point.date > today {
                continue;
            }
            match self.replay_day(bundle, point.date) {
                Some(score) => entries.push(HistoryEntry {
                    date: point.date,
                    score: round1(score),
                    price: Some(point.close),
                }),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            tracing::warn!(
                "{}: skipped {} of {} days with incomplete inputs",
                self.profile.asset,
                skipped,
                skipped + entries.len()
            );
        }
        entries
    }

    fn replay_day(&self, bundle: &SeriesBundle, date: NaiveDate) -> Option<f64> {
        let mut total = 0.0;
        for spec in &self.profile.components {
            match spec.formula.evaluate(bundle, Some(date)) {
                Outcome::Scored { score, .. } => total += round1(score) * spec.weight,
                Outcome::Insufficient | Outcome::Unavailable { .. } => return None,
            }
        }
        Some(clamp_score(total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::Formula;
    use crate::profile::ComponentSpec;
    use index_core::{AssetClass, DailySeries};

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn momentum_profile() -> AssetProfile {
        AssetProfile {
            asset: AssetClass::Gold,
            anchor: "GLD",
            neutral: 50.0,
            components: vec![
                ComponentSpec {
                    name: "gld_price",
                    weight: 0.6,
                    formula: Formula::Momentum {
                        symbol: "GLD",
                        lookback: 14,
                        baseline: 50.0,
                        multiplier: 5.0,
                        cap: None,
                    },
                },
                ComponentSpec {
                    name: "dollar_index",
                    weight: 0.4,
                    formula: Formula::Momentum {
                        symbol: "DX-Y.NYB",
                        lookback: 14,
                        baseline: 50.0,
                        multiplier: -15.0,
                        cap: None,
                    },
                },
            ],
        }
    }

    fn bundle_with(pairs: &[(&str, &[f64])]) -> SeriesBundle {
        let mut bundle = SeriesBundle::default();
        for &(symbol, closes) in pairs {
            bundle.insert_price(symbol, DailySeries::from_closes(d("2025-01-01"), closes));
        }
        bundle
    }

    fn step_series(flat: f64, last: f64) -> Vec<f64> {
        let mut closes = vec![flat; 13];
        closes.push(last);
        closes
    }

    fn previous_with(name: &str, score: f64) -> PersistedArtifact {
        let mut components = BTreeMap::new();
        components.insert(
            name.to_string(),
            ComponentScore { score, weight: 0.4, detail: "old".to_string() },
        );
        PersistedArtifact {
            score,
            label: Label::Neutral,
            timestamp: "2025-01-13T06:00:00Z".to_string(),
            components,
            history: vec![],
            score_stats: None,
            total_days: None,
            date_range: None,
        }
    }

    #[test]
    fn snapshot_aggregates_weighted_components() {
        let bundle = bundle_with(&[
            ("GLD", &step_series(100.0, 105.0)),
            ("DX-Y.NYB", &step_series(100.0, 102.0)),
        ]);
        let engine = ScoringEngine::new(momentum_profile());
        let snapshot = engine
            .compute_snapshot(&bundle, None, d("2025-01-14"), "2025-01-14T06:00:00Z".to_string())
            .unwrap();
        // GLD +5% -> 75, DXY +2% -> 20; 75*0.6 + 20*0.4 = 53.
        assert!((snapshot.score - 53.0).abs() < 1e-9);
        assert_eq!(snapshot.label, Label::Neutral);
        assert_eq!(snapshot.components["gld_price"].score, 75.0);
        assert_eq!(snapshot.timestamp, "2025-01-14T06:00:00Z");
    }

    #[test]
    fn insufficient_history_scores_neutral_for_that_component_only() {
        let bundle = bundle_with(&[
            ("GLD", &step_series(100.0, 105.0)),
            ("DX-Y.NYB", &[100.0, 101.0]),
        ]);
        let engine = ScoringEngine::new(momentum_profile());
        let snapshot = engine
            .compute_snapshot(&bundle, None, d("2025-01-14"), String::new())
            .unwrap();
        assert_eq!(snapshot.components["dollar_index"].score, 50.0);
        assert_eq!(snapshot.components["dollar_index"].detail, "insufficient data");
        // The other component still scored from real data.
        assert_eq!(snapshot.components["gld_price"].score, 75.0);
    }

    #[test]
    fn missing_source_carries_forward_previous_component() {
        let bundle = bundle_with(&[("GLD", &step_series(100.0, 105.0))]);
        let previous = previous_with("dollar_index", 38.0);
        let engine = ScoringEngine::new(momentum_profile());
        let snapshot = engine
            .compute_snapshot(&bundle, Some(&previous), d("2025-01-14"), String::new())
            .unwrap();
        let carried = &snapshot.components["dollar_index"];
        assert_eq!(carried.score, 38.0);
        assert!(carried.detail.contains("previous value retained"));
    }

    #[test]
    fn missing_source_without_previous_fails_the_run() {
        let bundle = bundle_with(&[("GLD", &step_series(100.0, 105.0))]);
        let engine = ScoringEngine::new(momentum_profile());
        let err = engine
            .compute_snapshot(&bundle, None, d("2025-01-14"), String::new())
            .unwrap_err();
        assert!(matches!(err, IndexError::SourceUnavailable(_)));
    }

    #[test]
    fn rebuild_skips_days_without_enough_history() {
        let gld: Vec<f64> = (0..30).map(|i| 100.0 + i as f64 * 0.5).collect();
        let dxy = vec![100.0; 30];
        let bundle = bundle_with(&[("GLD", &gld), ("DX-Y.NYB", &dxy)]);
        let engine = ScoringEngine::new(momentum_profile());

        let history = engine.rebuild_history(&bundle, d("2025-01-30"), 365);
        // Days 1-13 lack a 14-point lookback; days 14-30 score.
        assert_eq!(history.len(), 17);
        assert_eq!(history[0].date, d("2025-01-14"));
        assert_eq!(history.last().unwrap().date, d("2025-01-30"));
        // Anchor close recorded alongside each entry.
        assert_eq!(history[0].price, Some(100.0 + 13.0 * 0.5));
    }

    #[test]
    fn rebuild_is_deterministic() {
        let gld: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64 * 0.7).sin() * 3.0).collect();
        let dxy: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64 * 0.3).cos()).collect();
        let bundle = bundle_with(&[("GLD", &gld), ("DX-Y.NYB", &dxy)]);
        let engine = ScoringEngine::new(momentum_profile());

        let first = engine.rebuild_history(&bundle, d("2025-02-09"), 365);
        let second = engine.rebuild_history(&bundle, d("2025-02-09"), 365);
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn replay_snapshot_agrees_with_the_rebuilt_final_entry() {
        let gld: Vec<f64> = (0..30).map(|i| 100.0 + (i as f64 * 0.9).sin() * 4.0).collect();
        let dxy: Vec<f64> = (0..30).map(|i| 100.0 - (i as f64 * 0.4).sin()).collect();
        let bundle = bundle_with(&[("GLD", &gld), ("DX-Y.NYB", &dxy)]);
        let engine = ScoringEngine::new(momentum_profile());

        let history = engine.rebuild_history(&bundle, d("2025-01-30"), 365);
        let last = history.last().unwrap();
        let snapshot = engine
            .replay_snapshot(&bundle, last.date, String::new())
            .unwrap();
        assert_eq!(round1(snapshot.score), last.score);
        assert_eq!(snapshot.components.len(), 2);
    }

    #[test]
    fn rebuild_window_cutoff_excludes_old_days() {
        let gld: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let dxy = vec![100.0; 40];
        let bundle = bundle_with(&[("GLD", &gld), ("DX-Y.NYB", &dxy)]);
        let engine = ScoringEngine::new(momentum_profile());

        let history = engine.rebuild_history(&bundle, d("2025-02-09"), 10);
        assert_eq!(history.first().unwrap().date, d("2025-01-30"));
    }
}
