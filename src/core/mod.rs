// Core algorithm exports
pub mod analyzer;
pub mod distance;
pub mod filters;
pub mod market;
pub mod scoring;
pub mod stats;

pub use analyzer::{AnalysisError, Analyzer, AnalyzerConfig, MarketAnalysis};
pub use distance::{calculate_bounding_box, distance_m, haversine_distance, is_within_bounding_box};
pub use filters::{is_usable, is_within_radius, matches_property_type, matches_query_constraints};
pub use market::{compare_to_market, estimate, summarize};
pub use scoring::score_comparable;
pub use stats::{dispersion, percentile, quartiles};
