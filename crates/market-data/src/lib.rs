//! Data providers for the index: the official economic-data feed (FRED)
//! and the general market-data feed (Yahoo Finance chart API), plus the
//! fallback-ordered fetcher that assembles a [`SeriesBundle`] per run.

pub mod fetcher;
pub mod fred;
pub mod yahoo;

pub use fetcher::{PriceSource, RateSource, SeriesFetcher};
pub use fred::FredClient;
pub use yahoo::YahooClient;
