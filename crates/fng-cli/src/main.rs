//! fng: compute and persist the daily Fear & Greed index per asset class.
//!
//! Daily mode scores today from ~14 months of market data and folds the
//! result into the rolling artifact. Force-rebuild replays the full
//! formula set over five years of history and rewrites the artifact.
//!
//! Usage:
//!   cargo run -p fng-cli -- --assets gold crypto
//!   cargo run -p fng-cli --                      # all four asset classes
//!   cargo run -p fng-cli -- --force-rebuild
//!   cargo run -p fng-cli -- --output site/data

use artifact_store::ArtifactStore;
use chrono::{Duration, NaiveDate, Utc};
use index_core::stats::round1;
use index_core::AssetClass;
use market_data::{FredClient, SeriesFetcher, YahooClient};
use scoring::{AssetProfile, ScoringEngine};
use std::sync::Arc;

/// Calendar days fetched for a daily run: enough for the 200-day MA over
/// trading days, with slack for holidays.
const DAILY_SPAN_DAYS: i64 = 420;
/// Replay window for force-rebuild, per the published history contract.
const REBUILD_WINDOW_DAYS: i64 = 1825;
/// Calendar days fetched for a rebuild: the replay window plus the MA200
/// warm-up before its first day.
const REBUILD_SPAN_DAYS: i64 = REBUILD_WINDOW_DAYS + 395;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fng=info,market_data=warn".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let force_rebuild = args.iter().any(|a| a == "--force-rebuild");

    let output_dir = args
        .iter()
        .position(|a| a == "--output")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
        .unwrap_or("data");

    let assets: Vec<AssetClass> = if let Some(idx) = args.iter().position(|a| a == "--assets") {
        let names: Vec<&String> = args[idx + 1..]
            .iter()
            .take_while(|a| !a.starts_with("--"))
            .collect();
        if names.is_empty() {
            anyhow::bail!("--assets needs at least one of: gold, stocks, crypto, bonds");
        }
        names
            .into_iter()
            .map(|name| {
                AssetClass::parse(name)
                    .ok_or_else(|| anyhow::anyhow!("unknown asset class: {}", name))
            })
            .collect::<Result<_, _>>()?
    } else {
        AssetClass::ALL.to_vec()
    };

    let rates = match std::env::var("FRED_API_KEY") {
        Ok(key) if !key.is_empty() => {
            Some(Arc::new(FredClient::new(key)) as Arc<dyn market_data::RateSource>)
        }
        _ => {
            tracing::warn!("FRED_API_KEY not set, rate series fall back to market proxies");
            None
        }
    };
    let fetcher = SeriesFetcher::new(Arc::new(YahooClient::new()), rates);
    let store = ArtifactStore::new(output_dir);

    let now = Utc::now();
    let today = now.date_naive();
    let timestamp = now.format("%Y-%m-%dT%H:%M:%SZ").to_string();

    let mut failures = 0usize;
    for asset in assets {
        let result = if force_rebuild {
            rebuild(&fetcher, &store, asset, today, &timestamp).await
        } else {
            run_daily(&fetcher, &store, asset, today, &timestamp).await
        };
        if let Err(e) = result {
            tracing::error!("{}: {:#}", asset, e);
            failures += 1;
        }
    }

    if failures > 0 {
        anyhow::bail!("{} asset class run(s) failed", failures);
    }
    Ok(())
}

async fn run_daily(
    fetcher: &SeriesFetcher,
    store: &ArtifactStore,
    asset: AssetClass,
    today: NaiveDate,
    timestamp: &str,
) -> anyhow::Result<()> {
    let profile = AssetProfile::for_asset(asset)?;
    tracing::info!("{}: scoring {} ({} components)", asset, today, profile.components.len());

    let bundle = fetcher
        .fetch_bundle(
            &profile.required_symbols(false),
            &profile.required_rates(),
            today - Duration::days(DAILY_SPAN_DAYS),
            today,
        )
        .await;

    let previous = store.load(asset)?;
    let anchor_price = bundle.price(profile.anchor).and_then(|s| s.last_close());
    let engine = ScoringEngine::new(profile);
    let snapshot = engine.compute_snapshot(&bundle, previous.as_ref(), today, timestamp.to_string())?;

    tracing::info!("{}: {} ({})", asset, round1(snapshot.score), snapshot.label);
    let artifact = artifact_store::merge_daily(previous, &snapshot, anchor_price);
    store.save(asset, &artifact)?;
    Ok(())
}

async fn rebuild(
    fetcher: &SeriesFetcher,
    store: &ArtifactStore,
    asset: AssetClass,
    today: NaiveDate,
    timestamp: &str,
) -> anyhow::Result<()> {
    let profile = AssetProfile::for_asset(asset)?;
    tracing::info!("{}: rebuilding {} days of history", asset, REBUILD_WINDOW_DAYS);

    // Rate proxies are fetched as plain price series: replay scores them
    // per day instead of using a single live observation.
    let bundle = fetcher
        .fetch_bundle(
            &profile.required_symbols(true),
            &[],
            today - Duration::days(REBUILD_SPAN_DAYS),
            today,
        )
        .await;

    let engine = ScoringEngine::new(profile);
    let history = engine.rebuild_history(&bundle, today, REBUILD_WINDOW_DAYS);
    let Some(last) = history.last() else {
        anyhow::bail!("rebuild produced no scoreable days");
    };

    let snapshot = engine.replay_snapshot(&bundle, last.date, timestamp.to_string())?;
    let anchor_price = bundle
        .price(engine.profile().anchor)
        .and_then(|s| s.close_on(last.date));

    tracing::info!(
        "{}: rebuilt {} days, latest {} = {} ({})",
        asset,
        history.len(),
        last.date,
        round1(snapshot.score),
        snapshot.label
    );
    let artifact = artifact_store::rebuild_artifact(&snapshot, history, anchor_price);
    store.save(asset, &artifact)?;
    Ok(())
}
