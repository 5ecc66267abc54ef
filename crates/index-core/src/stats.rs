/// Small statistics helpers shared by the indicator calculators.

/// Mean of a data slice.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Sample standard deviation (n-1 denominator).
pub fn std_dev(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let m = mean(data);
    let variance = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (data.len() - 1) as f64;
    variance.sqrt()
}

/// Z-score of `value` relative to `data`; 0.0 on insufficient variance.
pub fn z_score_of(value: f64, data: &[f64]) -> f64 {
    let sd = std_dev(data);
    if sd < f64::EPSILON {
        return 0.0;
    }
    (value - mean(data)) / sd
}

/// Clamp a sub-score or aggregate into the index range.
pub fn clamp_score(score: f64) -> f64 {
    score.clamp(0.0, 100.0)
}

/// Round to one decimal for display fields, matching the published artifact.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn std_dev_is_sample_variance() {
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        // Sample std of this set is ~2.138 (population would be 2.0).
        assert!((std_dev(&data) - 2.138).abs() < 0.001);
    }

    #[test]
    fn z_score_of_constant_series_is_zero() {
        assert_eq!(z_score_of(5.0, &[3.0, 3.0, 3.0]), 0.0);
    }

    #[test]
    fn clamp_score_bounds() {
        assert_eq!(clamp_score(-4.2), 0.0);
        assert_eq!(clamp_score(112.0), 100.0);
        assert_eq!(clamp_score(59.5), 59.5);
    }

    #[test]
    fn round1_half_up() {
        assert_eq!(round1(59.45), 59.5);
        assert_eq!(round1(24.949), 24.9);
    }
}
