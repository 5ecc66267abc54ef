//! Config-driven scoring: a closed set of formula kinds, four asset-class
//! profiles built from them, and one engine that evaluates any profile
//! against a series bundle for daily scoring or historical replay.

pub mod aggregate;
pub mod engine;
pub mod formula;
pub mod profile;

pub use engine::ScoringEngine;
pub use formula::{Formula, MaBuckets, Outcome, RateCurve, RsiTerm};
pub use profile::{AssetProfile, ComponentSpec};
