use index_core::stats::clamp_score;
use index_core::ComponentScore;
use std::collections::BTreeMap;

/// Weighted sum of component scores, clamped into the index range. The
/// stored (display-rounded) component scores are what get aggregated, so
/// a consumer can reproduce the published total from the artifact alone.
pub fn weighted_total(components: &BTreeMap<String, ComponentScore>) -> f64 {
    clamp_score(components.values().map(|c| c.score * c.weight).sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use index_core::Label;

    fn components(pairs: &[(&str, f64, f64)]) -> BTreeMap<String, ComponentScore> {
        pairs
            .iter()
            .map(|&(name, score, weight)| {
                (
                    name.to_string(),
                    ComponentScore { score, weight, detail: String::new() },
                )
            })
            .collect()
    }

    #[test]
    fn worked_example_aggregates_to_greed() {
        let components = components(&[
            ("a", 80.0, 0.30),
            ("b", 40.0, 0.20),
            ("c", 60.0, 0.20),
            ("d", 55.0, 0.20),
            ("e", 45.0, 0.10),
        ]);
        let total = weighted_total(&components);
        assert!((total - 59.5).abs() < 1e-9);
        assert_eq!(Label::for_score(total), Label::Greed);
    }

    #[test]
    fn total_stays_in_index_range() {
        let maxed = components(&[("a", 100.0, 0.6), ("b", 100.0, 0.4)]);
        assert_eq!(weighted_total(&maxed), 100.0);
        let floored = components(&[("a", 0.0, 0.6), ("b", 0.0, 0.4)]);
        assert_eq!(weighted_total(&floored), 0.0);
    }
}
