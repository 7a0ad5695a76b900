//! DVF Comps - comparable-sales lookup for French property transactions
//!
//! Geocodes an address, fetches nearby sales from the DVF transactions store,
//! summarises price per m² and ranks the sales most comparable to a target.

pub mod config;
pub mod core;
pub mod models;
pub mod render;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use self::core::{Analyzer, AnalyzerConfig, MarketAnalysis, distance::haversine_distance, stats::percentile};
pub use models::{Coordinate, MarketSummary, ScoredComparable, ScoringConfig, SearchProfile, Transaction};
