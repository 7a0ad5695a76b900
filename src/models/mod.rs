// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    BoundingBox, CandidateQuery, Coordinate, CoordinateError, DistanceDecay, Estimate, Homogeneity,
    MarketSummary, MarketThresholds, PropertyType, Reliability, ScoredComparable, ScoringConfig,
    ScoringWeights, SearchProfile, TargetComparison, Tension, Transaction, TransactionRow,
    TransactionRowError, Verdict, VerdictBands,
};
pub use requests::ComparablesQuery;
pub use responses::{ComparablesResponse, ErrorResponse, HealthResponse};
