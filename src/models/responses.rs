use serde::{Deserialize, Serialize};
use crate::models::domain::{Estimate, MarketSummary, ScoredComparable, TargetComparison};

/// JSON body of the comparables endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ComparablesResponse {
    pub request_id: String,
    pub adresse_normalisee: String,
    pub code_postal: String,
    pub latitude: f64,
    pub longitude: f64,
    pub stats: MarketSummary,
    pub estimation: Option<Estimate>,
    pub analyse: Option<TargetComparison>,
    pub transactions: Vec<ScoredComparable>,
    pub total_candidates: usize,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
