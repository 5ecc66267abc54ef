//! Pure indicator math over daily close slices. Every function is
//! deterministic and allocation is bounded by input length; callers decide
//! how sub-scores are derived from these raw values.

use index_core::stats::{mean, std_dev};


/// Simple Moving Average
pub fn sma(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return vec![];
    }

    let mut result = Vec::with_capacity(data.len() - period + 1);
    for i in period - 1..data.len() {
        let sum: f64 = data[i + 1 - period..=i].iter().sum();
        result.push(sum / period as f64);
    }
    result
}

/// Latest value of the `period`-day simple moving average.
pub fn sma_last(data: &[f64], period: usize) -> Option<f64> {
    if period == 0 || data.len() < period {
        return None;
    }
    let sum: f64 = data[data.len() - period..].iter().sum();
    Some(sum / period as f64)
}

/// Relative Strength Index using rolling simple averages of gains and
/// losses (not Wilder smoothing): each value averages exactly the last
/// `period` one-day changes. Returns one value per complete window.
pub fn rsi(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period + 1 {
        return vec![];
    }

    let mut gains = Vec::with_capacity(data.len() - 1);
    let mut losses = Vec::with_capacity(data.len() - 1);
    for i in 1..data.len() {
        let change = data[i] - data[i - 1];
        if change > 0.0 {
            gains.push(change);
            losses.push(0.0);
        } else {
            gains.push(0.0);
            losses.push(change.abs());
        }
    }

    let mut result = Vec::with_capacity(gains.len() - period + 1);
    for i in period - 1..gains.len() {
        let window = i + 1 - period..=i;
        let avg_gain: f64 = gains[window.clone()].iter().sum::<f64>() / period as f64;
        let avg_loss: f64 = losses[window].iter().sum::<f64>() / period as f64;

        let value = if avg_loss == 0.0 {
            100.0
        } else {
            let rs = avg_gain / avg_loss;
            100.0 - (100.0 / (1.0 + rs))
        };
        result.push(value);
    }
    result
}

/// Latest RSI value, or None when the series is too short.
pub fn rsi_last(data: &[f64], period: usize) -> Option<f64> {
    rsi(data, period).last().copied()
}

/// Percentage change between the latest close and the close `lookback`
/// points back (inclusive indexing: lookback 14 spans 13 trading days,
/// matching a `-14` positional offset from the end).
pub fn pct_change_over(data: &[f64], lookback: usize) -> Option<f64> {
    if lookback < 2 || data.len() < lookback {
        return None;
    }
    let past = data[data.len() - lookback];
    let last = data[data.len() - 1];
    if past == 0.0 {
        return None;
    }
    Some((last / past - 1.0) * 100.0)
}

/// Day-over-day simple returns.
pub fn daily_returns(data: &[f64]) -> Vec<f64> {
    data.windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .collect()
}

/// Annualized realized volatility (percent) of the last `window` daily
/// returns, using sample standard deviation. `periods_per_year` is 252 for
/// markets with trading days, 365 for continuously-traded assets.
pub fn realized_vol(data: &[f64], window: usize, periods_per_year: f64) -> Option<f64> {
    let returns = daily_returns(data);
    if returns.len() < window || window < 2 {
        return None;
    }
    let tail = &returns[returns.len() - window..];
    Some(std_dev(tail) * periods_per_year.sqrt() * 100.0)
}

/// Ratio of the mean of the last `short` values to the mean of the last
/// `long` values. Used for volume-trend signals. None if the series is
/// shorter than `long` or the baseline mean is zero.
pub fn short_long_ratio(data: &[f64], short: usize, long: usize) -> Option<f64> {
    if short == 0 || long < short || data.len() < long {
        return None;
    }
    let short_avg = mean(&data[data.len() - short..]);
    let long_avg = mean(&data[data.len() - long..]);
    if long_avg <= 0.0 {
        return None;
    }
    Some(short_avg / long_avg)
}
