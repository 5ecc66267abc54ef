use crate::formula::{Formula, MaBuckets, RateCurve, RsiTerm};
use index_core::{AssetClass, IndexError, RateKind};

/// One weighted sub-indicator of a profile.
#[derive(Debug, Clone)]
pub struct ComponentSpec {
    pub name: &'static str,
    pub weight: f64,
    pub formula: Formula,
}

/// Per-asset-class configuration: the anchor instrument, the neutral
/// baseline used for insufficient data, and the weighted component list.
/// Construction validates the weights so a misconfigured profile aborts
/// before any artifact is touched.
#[derive(Debug, Clone)]
pub struct AssetProfile {
    pub asset: AssetClass,
    /// Instrument whose close is recorded next to each history entry and
    /// whose trading calendar drives rebuild replay.
    pub anchor: &'static str,
    /// Score assigned when a single component lacks history. 50 except
    /// for crypto, which is calibrated around 30.
    pub neutral: f64,
    pub components: Vec<ComponentSpec>,
}

impl AssetProfile {
    pub fn for_asset(asset: AssetClass) -> Result<AssetProfile, IndexError> {
        match asset {
            AssetClass::Gold => Self::gold(),
            AssetClass::Stocks => Self::stocks(),
            AssetClass::Crypto => Self::crypto(),
            AssetClass::Bonds => Self::bonds(),
        }
    }

    pub fn gold() -> Result<AssetProfile, IndexError> {
        Self::validated(AssetProfile {
            asset: AssetClass::Gold,
            anchor: "GLD",
            neutral: 50.0,
            components: vec![
                ComponentSpec {
                    name: "gld_price",
                    weight: 0.30,
                    formula: Formula::Momentum {
                        symbol: "GLD",
                        lookback: 14,
                        baseline: 50.0,
                        multiplier: 5.0,
                        cap: None,
                    },
                },
                ComponentSpec {
                    name: "momentum",
                    weight: 0.25,
                    formula: Formula::RsiMaDistance { symbol: "GC=F" },
                },
                ComponentSpec {
                    name: "dollar_index",
                    weight: 0.20,
                    formula: Formula::Momentum {
                        symbol: "DX-Y.NYB",
                        lookback: 14,
                        baseline: 50.0,
                        multiplier: -15.0,
                        cap: None,
                    },
                },
                ComponentSpec {
                    name: "real_rates",
                    weight: 0.15,
                    formula: Formula::RateSignal {
                        kind: RateKind::RealYield10Y,
                        official: RateCurve::Linear { intercept: 75.0, slope: -18.75 },
                        proxy: RateCurve::Linear { intercept: 150.0, slope: -25.0 },
                    },
                },
                ComponentSpec {
                    name: "vix",
                    weight: 0.10,
                    formula: Formula::VolZScore { symbol: "^VIX", window: 63 },
                },
            ],
        })
    }

    pub fn stocks() -> Result<AssetProfile, IndexError> {
        Self::validated(AssetProfile {
            asset: AssetClass::Stocks,
            anchor: "SPY",
            neutral: 50.0,
            components: vec![
                ComponentSpec {
                    name: "momentum",
                    weight: 0.25,
                    formula: Formula::RsiMaBuckets {
                        symbol: "SPY",
                        rsi_term: RsiTerm::Raw,
                        buckets: MaBuckets {
                            both: 75.0,
                            ma50_only: 60.0,
                            ma200_only: 40.0,
                            neither: 25.0,
                        },
                    },
                },
                ComponentSpec {
                    name: "vix",
                    weight: 0.20,
                    formula: Formula::VixBuckets { symbol: "^VIX", window: 63 },
                },
                ComponentSpec {
                    name: "market_breadth",
                    weight: 0.15,
                    formula: Formula::RelativeReturn {
                        a: "RSP",
                        b: "SPY",
                        lookback: 14,
                        baseline: 50.0,
                        multiplier: 20.0,
                    },
                },
                ComponentSpec {
                    name: "junk_bonds",
                    weight: 0.15,
                    formula: Formula::RelativeReturn {
                        a: "HYG",
                        b: "TLT",
                        lookback: 14,
                        baseline: 50.0,
                        multiplier: 10.0,
                    },
                },
                ComponentSpec {
                    name: "safe_haven",
                    weight: 0.15,
                    formula: Formula::Momentum {
                        symbol: "TLT",
                        lookback: 14,
                        baseline: 50.0,
                        multiplier: -5.0,
                        cap: None,
                    },
                },
                ComponentSpec {
                    name: "price_strength",
                    weight: 0.10,
                    formula: Formula::Momentum {
                        symbol: "SPY",
                        lookback: 14,
                        baseline: 50.0,
                        multiplier: 5.0,
                        cap: None,
                    },
                },
            ],
        })
    }

    pub fn crypto() -> Result<AssetProfile, IndexError> {
        Self::validated(AssetProfile {
            asset: AssetClass::Crypto,
            anchor: "BTC-USD",
            neutral: 30.0,
            components: vec![
                ComponentSpec {
                    name: "momentum",
                    weight: 0.10,
                    formula: Formula::RsiMaBuckets {
                        symbol: "BTC-USD",
                        rsi_term: RsiTerm::CenteredDouble,
                        buckets: MaBuckets {
                            both: 40.0,
                            ma50_only: 20.0,
                            ma200_only: 30.0,
                            neither: 10.0,
                        },
                    },
                },
                ComponentSpec {
                    name: "context",
                    weight: 0.35,
                    formula: Formula::Momentum {
                        symbol: "BTC-USD",
                        lookback: 14,
                        baseline: 30.0,
                        multiplier: 1.6,
                        cap: Some(30.0),
                    },
                },
                ComponentSpec {
                    name: "volatility",
                    weight: 0.15,
                    formula: Formula::VolatilityBand {
                        symbol: "BTC-USD",
                        window: 14,
                        periods_per_year: 365.0,
                        low: 20.0,
                        high: 40.0,
                        scale: 0.6,
                    },
                },
                ComponentSpec {
                    name: "dominance",
                    weight: 0.25,
                    formula: Formula::RelativeReturn {
                        a: "BTC-USD",
                        b: "ETH-USD",
                        lookback: 14,
                        baseline: 30.0,
                        multiplier: -2.0,
                    },
                },
                ComponentSpec {
                    name: "price_momentum",
                    weight: 0.15,
                    formula: Formula::Momentum {
                        symbol: "BTC-USD",
                        lookback: 14,
                        baseline: 30.0,
                        multiplier: 0.6,
                        cap: Some(30.0),
                    },
                },
            ],
        })
    }

    pub fn bonds() -> Result<AssetProfile, IndexError> {
        Self::validated(AssetProfile {
            asset: AssetClass::Bonds,
            anchor: "TLT",
            neutral: 50.0,
            components: vec![
                ComponentSpec {
                    name: "yield_curve",
                    weight: 0.30,
                    formula: Formula::RateSignal {
                        kind: RateKind::YieldCurveSpread,
                        official: RateCurve::CurveShape,
                        proxy: RateCurve::Linear { intercept: 40.0, slope: 20.0 },
                    },
                },
                ComponentSpec {
                    name: "duration_risk",
                    weight: 0.25,
                    formula: Formula::MomentumVolumeBlend {
                        symbol: "TLT",
                        lookback: 14,
                        multiplier: 4.0,
                        short_window: 5,
                        long_window: 60,
                    },
                },
                ComponentSpec {
                    name: "real_yields",
                    weight: 0.20,
                    formula: Formula::RateSignal {
                        kind: RateKind::RealYield10Y,
                        official: RateCurve::TipsAppetite,
                        proxy: RateCurve::Linear { intercept: 75.0, slope: -10.0 },
                    },
                },
                ComponentSpec {
                    name: "credit_quality",
                    weight: 0.15,
                    formula: Formula::RelativeReturn {
                        a: "LQD",
                        b: "TLT",
                        lookback: 14,
                        baseline: 50.0,
                        multiplier: 16.67,
                    },
                },
                ComponentSpec {
                    name: "term_premium",
                    weight: 0.10,
                    formula: Formula::RelativeReturn {
                        a: "TLT",
                        b: "SHY",
                        lookback: 14,
                        baseline: 50.0,
                        multiplier: 10.0,
                    },
                },
            ],
        })
    }

    fn validated(profile: AssetProfile) -> Result<AssetProfile, IndexError> {
        let sum: f64 = profile.components.iter().map(|c| c.weight).sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(IndexError::ConfigError(format!(
                "{} component weights sum to {}, expected 1.0",
                profile.asset, sum
            )));
        }
        for component in &profile.components {
            if component.weight <= 0.0 || component.weight > 1.0 {
                return Err(IndexError::ConfigError(format!(
                    "{} weight {} out of range for {}",
                    profile.asset, component.weight, component.name
                )));
            }
        }
        Ok(profile)
    }

    /// Deduplicated price symbols the fetcher must provide, anchor
    /// included. Rebuild runs pass `include_rate_proxies` so the proxy
    /// yield series are fetched as plain price series for replay.
    pub fn required_symbols(&self, include_rate_proxies: bool) -> Vec<&'static str> {
        let mut symbols = vec![self.anchor];
        for component in &self.components {
            for symbol in component.formula.symbols(include_rate_proxies) {
                if !symbols.contains(&symbol) {
                    symbols.push(symbol);
                }
            }
        }
        symbols
    }

    pub fn required_rates(&self) -> Vec<RateKind> {
        let mut kinds = Vec::new();
        for component in &self.components {
            if let Some(kind) = component.formula.rate_kind() {
                if !kinds.contains(&kind) {
                    kinds.push(kind);
                }
            }
        }
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_profiles_construct_with_unit_weight_sums() {
        for asset in AssetClass::ALL {
            let profile = AssetProfile::for_asset(asset).unwrap();
            let sum: f64 = profile.components.iter().map(|c| c.weight).sum();
            assert!((sum - 1.0).abs() < 1e-9, "{}", asset);
        }
    }

    #[test]
    fn bad_weight_sum_is_a_config_error() {
        let mut profile = AssetProfile::gold().unwrap();
        profile.components[0].weight = 0.5;
        assert!(matches!(
            AssetProfile::validated(profile),
            Err(IndexError::ConfigError(_))
        ));
    }

    #[test]
    fn gold_requires_its_market_series_and_the_tips_rate() {
        let profile = AssetProfile::gold().unwrap();
        let symbols = profile.required_symbols(false);
        for expected in ["GLD", "GC=F", "DX-Y.NYB", "^VIX"] {
            assert!(symbols.contains(&expected), "missing {}", expected);
        }
        assert!(!symbols.contains(&"^TNX"));
        assert_eq!(profile.required_rates(), vec![RateKind::RealYield10Y]);
    }

    #[test]
    fn rebuild_symbol_set_includes_rate_proxies() {
        let profile = AssetProfile::bonds().unwrap();
        let symbols = profile.required_symbols(true);
        for expected in ["TLT", "LQD", "SHY", "^TNX", "^IRX"] {
            assert!(symbols.contains(&expected), "missing {}", expected);
        }
    }

    #[test]
    fn crypto_neutral_baseline_is_calibrated_low() {
        let profile = AssetProfile::crypto().unwrap();
        assert_eq!(profile.neutral, 30.0);
        assert_eq!(profile.anchor, "BTC-USD");
    }
}
