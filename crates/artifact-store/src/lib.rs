//! Persistence for the per-asset JSON artifacts: load, merge the day's
//! snapshot into the rolling history, trim, and save atomically. The
//! artifact file is the sole persisted state per asset class.

use chrono::Duration;
use index_core::stats::round1;
use index_core::{
    AssetClass, DateRange, HistoryEntry, IndexError, IndexSnapshot, PersistedArtifact,
    ScoreStats,
};
use std::fs;
use std::path::PathBuf;

/// Rolling window kept by daily runs, in calendar days.
pub const DAILY_WINDOW_DAYS: i64 = 365;

pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn artifact_path(&self, asset: AssetClass) -> PathBuf {
        self.dir.join(asset.artifact_file())
    }

    /// Previous artifact, or None on first run. A malformed file is an
    /// error, not a silent fresh start.
    pub fn load(&self, asset: AssetClass) -> Result<Option<PersistedArtifact>, IndexError> {
        let path = self.artifact_path(asset);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)?;
        let artifact = serde_json::from_str(&raw)?;
        Ok(Some(artifact))
    }

    /// Replace the artifact atomically: serialize to a sibling temp file,
    /// then rename over the target. A crash mid-write leaves the old
    /// artifact intact.
    pub fn save(&self, asset: AssetClass, artifact: &PersistedArtifact) -> Result<(), IndexError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.artifact_path(asset);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(artifact)?)?;
        fs::rename(&tmp, &path)?;
        tracing::info!("wrote {}", path.display());
        Ok(())
    }
}

/// Insert or replace the entry for its date, keeping the history ascending
/// and deduplicated by date. Re-running the same day replaces in place.
pub fn upsert_entry(history: &mut Vec<HistoryEntry>, entry: HistoryEntry) {
    match history.binary_search_by_key(&entry.date, |e| e.date) {
        Ok(i) => history[i] = entry,
        Err(i) => history.insert(i, entry),
    }
}

/// Drop entries older than the rolling window, measured back from the
/// newest entry's date (calendar days, not row count).
pub fn trim_to_window(history: &mut Vec<HistoryEntry>, window_days: i64) {
    let Some(latest) = history.last().map(|e| e.date) else {
        return;
    };
    let cutoff = latest - Duration::days(window_days - 1);
    history.retain(|e| e.date >= cutoff);
}

/// Fold a daily snapshot into the previous artifact: upsert today's row,
/// trim to the rolling window, and refresh the summary fields if the
/// previous artifact carried them (a rebuild's summary must not go stale
/// under later daily runs).
pub fn merge_daily(
    previous: Option<PersistedArtifact>,
    snapshot: &IndexSnapshot,
    anchor_price: Option<f64>,
) -> PersistedArtifact {
    let (mut history, had_summary) = match previous {
        Some(prev) => (prev.history, prev.score_stats.is_some()),
        None => (Vec::new(), false),
    };
    upsert_entry(
        &mut history,
        HistoryEntry {
            date: snapshot.date,
            score: round1(snapshot.score),
            price: anchor_price.map(round1),
        },
    );
    trim_to_window(&mut history, DAILY_WINDOW_DAYS);

    let (score_stats, total_days, date_range) = if had_summary {
        (
            ScoreStats::from_history(&history),
            Some(history.len()),
            history_range(&history),
        )
    } else {
        (None, None, None)
    };
    PersistedArtifact {
        score: round1(snapshot.score),
        label: snapshot.label,
        timestamp: snapshot.timestamp.clone(),
        components: snapshot.components.clone(),
        history,
        score_stats,
        total_days,
        date_range,
    }
}

fn history_range(history: &[HistoryEntry]) -> Option<DateRange> {
    match (history.first(), history.last()) {
        (Some(first), Some(last)) => Some(DateRange { start: first.date, end: last.date }),
        _ => None,
    }
}

/// Build a rebuild artifact: replayed history (today's snapshot upserted
/// as the final row) plus the summary fields rebuilds carry.
pub fn rebuild_artifact(
    snapshot: &IndexSnapshot,
    mut history: Vec<HistoryEntry>,
    anchor_price: Option<f64>,
) -> PersistedArtifact {
    upsert_entry(
        &mut history,
        HistoryEntry {
            date: snapshot.date,
            score: round1(snapshot.score),
            price: anchor_price.map(round1),
        },
    );
    let date_range = history_range(&history);
    PersistedArtifact {
        score: round1(snapshot.score),
        label: snapshot.label,
        timestamp: snapshot.timestamp.clone(),
        components: snapshot.components.clone(),
        score_stats: ScoreStats::from_history(&history),
        total_days: Some(history.len()),
        date_range,
        history,
    }
}
