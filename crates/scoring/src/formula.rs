use chrono::NaiveDate;
use index_core::stats::{clamp_score, mean, z_score_of};
use index_core::{DailySeries, RateKind, RateProvider, SeriesBundle};
use indicators::{pct_change_over, realized_vol, rsi_last, short_long_ratio, sma_last};

/// Result of evaluating one formula against the day's series bundle.
/// `Insufficient` and `Unavailable` are distinct on purpose: a short series
/// degrades to the asset's neutral baseline, a series missing from every
/// source triggers the carry-forward policy instead.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Scored { score: f64, detail: String },
    Insufficient,
    Unavailable { source: String },
}

/// How the RSI term enters an [`Formula::RsiMaBuckets`] blend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RsiTerm {
    /// RSI used directly (already 0-100).
    Raw,
    /// `(RSI - 50) * 2`, clamped. Doubles sensitivity around the midpoint.
    CenteredDouble,
}

/// Regime scores for the four price-vs-MA50/MA200 states.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaBuckets {
    pub both: f64,
    pub ma50_only: f64,
    pub ma200_only: f64,
    pub neither: f64,
}

/// Maps a rate level (or spread) in percent to a 0-100 sub-score. The
/// piecewise curves carry the empirical calibration constants; callers
/// clamp the result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateCurve {
    Linear { intercept: f64, slope: f64 },
    /// Real-yield appetite: higher real yield means bonds actually pay,
    /// scored in graduated bands.
    TipsAppetite,
    /// 10Y-2Y curve shape: steep is healthy, inverted is fear.
    CurveShape,
}

impl RateCurve {
    pub fn apply(&self, x: f64) -> f64 {
        match *self {
            RateCurve::Linear { intercept, slope } => intercept + slope * x,
            RateCurve::TipsAppetite => {
                if x >= 2.0 {
                    85.0 + (10.0 * (x - 2.0)).min(15.0)
                } else if x >= 1.0 {
                    65.0 + (x - 1.0) * 20.0
                } else if x >= 0.0 {
                    45.0 + x * 20.0
                } else if x >= -1.0 {
                    25.0 + (x + 1.0) * 20.0
                } else {
                    (25.0 + (x + 1.0) * 25.0).max(0.0)
                }
            }
            RateCurve::CurveShape => {
                if x >= 2.5 {
                    90.0 + (10.0 * (x - 2.5)).min(10.0)
                } else if x >= 1.5 {
                    70.0 + (x - 1.5) * 20.0
                } else if x >= 0.5 {
                    50.0 + (x - 0.5) * 20.0
                } else if x >= 0.0 {
                    30.0 + x * 40.0
                } else {
                    (30.0 + x * 60.0).max(0.0)
                }
            }
        }
    }
}

/// The closed set of sub-indicator formulas. Every asset-class profile is
/// a weighted list of these; the engine never special-cases an asset.
#[derive(Debug, Clone, PartialEq)]
pub enum Formula {
    /// `baseline + pct_change * multiplier`, contribution optionally capped.
    /// A negative multiplier inverts the signal (dollar index, safe haven).
    Momentum {
        symbol: &'static str,
        lookback: usize,
        baseline: f64,
        multiplier: f64,
        cap: Option<f64>,
    },
    /// Bounded distance-from-MA contributions plus an RSI term around a
    /// base of 50. Needs 200 closes for the MA200 leg.
    RsiMaDistance { symbol: &'static str },
    /// RSI blended 60/40 with an MA-regime bucket score.
    RsiMaBuckets {
        symbol: &'static str,
        rsi_term: RsiTerm,
        buckets: MaBuckets,
    },
    /// Spread of two instruments' returns over the same lookback.
    RelativeReturn {
        a: &'static str,
        b: &'static str,
        lookback: usize,
        baseline: f64,
        multiplier: f64,
    },
    /// Z-score of the latest value against a trailing window.
    VolZScore { symbol: &'static str, window: usize },
    /// Stepwise mapping of the latest volatility-index level.
    VixBuckets { symbol: &'static str, window: usize },
    /// Linear band mapping of annualized realized volatility.
    VolatilityBand {
        symbol: &'static str,
        window: usize,
        periods_per_year: f64,
        low: f64,
        high: f64,
        scale: f64,
    },
    /// 60/40 blend of price momentum and a volume-trend score. The volume
    /// leg stays neutral without a full baseline window.
    MomentumVolumeBlend {
        symbol: &'static str,
        lookback: usize,
        multiplier: f64,
        short_window: usize,
        long_window: usize,
    },
    /// Official rate observation scored by the provider-specific curve.
    /// Historical replay always goes through the proxy curve, evaluated
    /// over the proxy symbols' price series.
    RateSignal {
        kind: RateKind,
        official: RateCurve,
        proxy: RateCurve,
    },
}

impl Formula {
    /// Price symbols this formula reads from the bundle. Rate formulas
    /// list their proxy symbols only when `include_rate_proxies` is set
    /// (daily runs resolve rates up front; replay needs the raw series).
    pub fn symbols(&self, include_rate_proxies: bool) -> Vec<&'static str> {
        match *self {
            Formula::Momentum { symbol, .. }
            | Formula::RsiMaDistance { symbol }
            | Formula::RsiMaBuckets { symbol, .. }
            | Formula::VolZScore { symbol, .. }
            | Formula::VixBuckets { symbol, .. }
            | Formula::VolatilityBand { symbol, .. }
            | Formula::MomentumVolumeBlend { symbol, .. } => vec![symbol],
            Formula::RelativeReturn { a, b, .. } => vec![a, b],
            Formula::RateSignal { kind, .. } => {
                if include_rate_proxies {
                    kind.proxy_symbols().to_vec()
                } else {
                    vec![]
                }
            }
        }
    }

    pub fn rate_kind(&self) -> Option<RateKind> {
        match self {
            Formula::RateSignal { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Evaluate against the bundle. `as_of` switches to replay mode:
    /// series are truncated at that date and rate signals run their proxy
    /// curve over the proxy price series instead of the live observation.
    pub fn evaluate(&self, bundle: &SeriesBundle, as_of: Option<NaiveDate>) -> Outcome {
        match *self {
            Formula::Momentum { symbol, lookback, baseline, multiplier, cap } => {
                let closes = match closes_for(bundle, symbol, as_of) {
                    Some(c) => c,
                    None => return unavailable(symbol),
                };
                let Some(change) = pct_change_over(&closes, lookback) else {
                    return Outcome::Insufficient;
                };
                let mut contrib = change * multiplier;
                if let Some(cap) = cap {
                    contrib = contrib.clamp(-cap, cap);
                }
                Outcome::Scored {
                    score: clamp_score(baseline + contrib),
                    detail: format!("{} {:+.1}% {}d", symbol, change, lookback),
                }
            }
            Formula::RsiMaDistance { symbol } => {
                let closes = match closes_for(bundle, symbol, as_of) {
                    Some(c) => c,
                    None => return unavailable(symbol),
                };
                let (Some(ma50), Some(ma200), Some(rsi)) = (
                    sma_last(&closes, 50),
                    sma_last(&closes, 200),
                    rsi_last(&closes, 14),
                ) else {
                    return Outcome::Insufficient;
                };
                let price = closes[closes.len() - 1];
                let ma50_contrib = (((price - ma50) / ma50) * 100.0 * 1.5).clamp(-15.0, 15.0);
                let ma200_contrib = (((price - ma200) / ma200) * 100.0 * 0.5).clamp(-10.0, 10.0);
                let rsi_contrib = ((rsi - 50.0) * 0.5).clamp(-25.0, 25.0);
                Outcome::Scored {
                    score: clamp_score(50.0 + ma50_contrib + ma200_contrib + rsi_contrib),
                    detail: format!(
                        "RSI: {:.0}, Price {} MA50",
                        rsi,
                        if price > ma50 { ">" } else { "<" }
                    ),
                }
            }
            Formula::RsiMaBuckets { symbol, rsi_term, buckets } => {
                let closes = match closes_for(bundle, symbol, as_of) {
                    Some(c) => c,
                    None => return unavailable(symbol),
                };
                let (Some(ma50), Some(ma200), Some(rsi)) = (
                    sma_last(&closes, 50),
                    sma_last(&closes, 200),
                    rsi_last(&closes, 14),
                ) else {
                    return Outcome::Insufficient;
                };
                let price = closes[closes.len() - 1];
                let rsi_score = match rsi_term {
                    RsiTerm::Raw => rsi,
                    RsiTerm::CenteredDouble => clamp_score((rsi - 50.0) * 2.0),
                };
                let ma_score = if price > ma200 {
                    if price > ma50 { buckets.both } else { buckets.ma200_only }
                } else if price > ma50 {
                    buckets.ma50_only
                } else {
                    buckets.neither
                };
                Outcome::Scored {
                    score: clamp_score(rsi_score * 0.6 + ma_score * 0.4),
                    detail: format!(
                        "RSI: {:.0}, Price {} MA50",
                        rsi,
                        if price > ma50 { ">" } else { "<" }
                    ),
                }
            }
            Formula::RelativeReturn { a, b, lookback, baseline, multiplier } => {
                let closes_a = match closes_for(bundle, a, as_of) {
                    Some(c) => c,
                    None => return unavailable(a),
                };
                let closes_b = match closes_for(bundle, b, as_of) {
                    Some(c) => c,
                    None => return unavailable(b),
                };
                let (Some(ret_a), Some(ret_b)) = (
                    pct_change_over(&closes_a, lookback),
                    pct_change_over(&closes_b, lookback),
                ) else {
                    return Outcome::Insufficient;
                };
                let spread = ret_a - ret_b;
                Outcome::Scored {
                    score: clamp_score(baseline + spread * multiplier),
                    detail: format!("{} {:+.1}% vs {} {:+.1}%", a, ret_a, b, ret_b),
                }
            }
            Formula::VolZScore { symbol, window } => {
                let closes = match closes_for(bundle, symbol, as_of) {
                    Some(c) => c,
                    None => return unavailable(symbol),
                };
                if closes.len() < 10 {
                    return Outcome::Insufficient;
                }
                let tail = &closes[closes.len().saturating_sub(window)..];
                let current = closes[closes.len() - 1];
                let z = z_score_of(current, tail);
                Outcome::Scored {
                    score: clamp_score(50.0 + z * 25.0),
                    detail: format!(
                        "VIX: {:.1} (avg: {:.1}, z: {:+.1})",
                        current,
                        mean(tail),
                        z
                    ),
                }
            }
            Formula::VixBuckets { symbol, window } => {
                let closes = match closes_for(bundle, symbol, as_of) {
                    Some(c) => c,
                    None => return unavailable(symbol),
                };
                let Some(&current) = closes.last() else {
                    return Outcome::Insufficient;
                };
                let tail = &closes[closes.len().saturating_sub(window)..];
                let score = if current < 12.0 {
                    85.0
                } else if current < 15.0 {
                    70.0
                } else if current < 20.0 {
                    55.0
                } else if current < 25.0 {
                    40.0
                } else if current < 30.0 {
                    25.0
                } else {
                    10.0
                };
                Outcome::Scored {
                    score,
                    detail: format!("VIX: {:.1} vs avg: {:.1}", current, mean(tail)),
                }
            }
            Formula::VolatilityBand { symbol, window, periods_per_year, low, high, scale } => {
                let closes = match closes_for(bundle, symbol, as_of) {
                    Some(c) => c,
                    None => return unavailable(symbol),
                };
                let Some(vol) = realized_vol(&closes, window, periods_per_year) else {
                    return Outcome::Insufficient;
                };
                let band = if vol >= high {
                    0.0
                } else if vol <= low {
                    100.0
                } else {
                    100.0 - ((vol - low) / (high - low)) * 100.0
                };
                Outcome::Scored {
                    score: clamp_score(band * scale),
                    detail: format!("Vol {}d: {:.1}% annualized", window, vol),
                }
            }
            Formula::MomentumVolumeBlend { symbol, lookback, multiplier, short_window, long_window } => {
                let series = match series_for(bundle, symbol, as_of) {
                    Some(s) => s,
                    None => return unavailable(symbol),
                };
                let closes = series.closes();
                let Some(change) = pct_change_over(&closes, lookback) else {
                    return Outcome::Insufficient;
                };
                let momentum_score = clamp_score(50.0 + change * multiplier);
                let volumes = series.volumes();
                let (volume_score, volume_note) =
                    match short_long_ratio(&volumes, short_window, long_window) {
                        Some(ratio) => {
                            // Heavy volume confirms the price move: buying
                            // pressure on the way up, liquidation on the way
                            // down.
                            let shift = ((ratio - 1.0) * 50.0).min(50.0);
                            let score = if change > 0.0 { 50.0 + shift } else { 50.0 - shift };
                            (
                                clamp_score(score),
                                format!(
                                    ", volume {}d/{}d: {:.2}x",
                                    short_window, long_window, ratio
                                ),
                            )
                        }
                        None => (50.0, String::new()),
                    };
                Outcome::Scored {
                    score: clamp_score(momentum_score * 0.6 + volume_score * 0.4),
                    detail: format!("{} {:+.1}% {}d{}", symbol, change, lookback, volume_note),
                }
            }
            Formula::RateSignal { kind, official, proxy } => match as_of {
                None => {
                    let Some(obs) = bundle.rate(kind) else {
                        return unavailable(&rate_name(kind));
                    };
                    let curve = match obs.provider {
                        RateProvider::Official => official,
                        RateProvider::Proxy => proxy,
                    };
                    Outcome::Scored {
                        score: clamp_score(curve.apply(obs.value)),
                        detail: rate_detail(kind, obs.provider, obs.value),
                    }
                }
                Some(date) => {
                    let Some(value) = proxy_rate_value(bundle, kind, date) else {
                        return unavailable(&rate_name(kind));
                    };
                    Outcome::Scored {
                        score: clamp_score(proxy.apply(value)),
                        detail: rate_detail(kind, RateProvider::Proxy, value),
                    }
                }
            },
        }
    }
}

fn unavailable(source: &str) -> Outcome {
    Outcome::Unavailable { source: source.to_string() }
}

fn series_for(bundle: &SeriesBundle, symbol: &str, as_of: Option<NaiveDate>) -> Option<DailySeries> {
    let series = bundle.price(symbol)?;
    let series = match as_of {
        Some(date) => series.truncated(date),
        None => series.clone(),
    };
    if series.is_empty() {
        None
    } else {
        Some(series)
    }
}

fn closes_for(bundle: &SeriesBundle, symbol: &str, as_of: Option<NaiveDate>) -> Option<Vec<f64>> {
    series_for(bundle, symbol, as_of).map(|s| s.closes())
}

/// Derive the rate level from proxy price series as of a replay date:
/// a single symbol is the level itself, a pair is long minus short.
fn proxy_rate_value(bundle: &SeriesBundle, kind: RateKind, date: NaiveDate) -> Option<f64> {
    let mut values = kind
        .proxy_symbols()
        .iter()
        .map(|&symbol| bundle.price(symbol).and_then(|s| s.close_on(date)));
    match kind.proxy_symbols().len() {
        1 => values.next()?,
        2 => {
            let long = values.next()??;
            let short = values.next()??;
            Some(long - short)
        }
        _ => None,
    }
}

fn rate_name(kind: RateKind) -> String {
    kind.fred_series().join("-")
}

fn rate_detail(kind: RateKind, provider: RateProvider, value: f64) -> String {
    match (kind, provider) {
        (RateKind::RealYield10Y, RateProvider::Official) => {
            format!("TIPS 10Y: {:.2}%", value)
        }
        (RateKind::RealYield10Y, RateProvider::Proxy) => {
            format!("10Y yield: {:.2}% (proxy)", value)
        }
        (RateKind::YieldCurveSpread, RateProvider::Official) => {
            format!("Spread 10Y-2Y: {:+.2}%", value)
        }
        (RateKind::YieldCurveSpread, RateProvider::Proxy) => {
            format!("Spread ^TNX-^IRX: {:+.2}% (proxy)", value)
        }
    }
}
