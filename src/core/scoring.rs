use crate::models::{DistanceDecay, ScoringConfig, SearchProfile, Transaction};

const UNRESOLVED_RADIUS_M: f64 = 500.0;

/// Per-factor contributions to a comparable's score, in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub distance: f64,
    pub area: f64,
    pub rooms: f64,
    pub discount: f64,
}

impl ScoreBreakdown {
    /// Rounded sum, clamped to 0..=100
    pub fn total(&self) -> u8 {
        let sum = self.distance + self.area + self.rooms + self.discount;
        sum.round().clamp(0.0, 100.0) as u8
    }
}

/// Similarity score (0-100) of a sold property against a search profile
///
/// score = distance (≤40) + area (≤25) + rooms (≤20) + discount (≤15)
/// with the default weights. Factors without a target get their full weight.
/// `reference_price_m2` is the local median the discount is measured against.
pub fn score_comparable(
    transaction: &Transaction,
    distance_km: f64,
    profile: Option<&SearchProfile>,
    reference_price_m2: Option<f64>,
    config: &ScoringConfig,
) -> u8 {
    score_breakdown(transaction, distance_km, profile, reference_price_m2, config).total()
}

pub fn score_breakdown(
    transaction: &Transaction,
    distance_km: f64,
    profile: Option<&SearchProfile>,
    reference_price_m2: Option<f64>,
    config: &ScoringConfig,
) -> ScoreBreakdown {
    let weights = &config.weights;

    ScoreBreakdown {
        distance: distance_score(distance_km * 1000.0, weights.distance, &config.decay),
        area: area_score(
            transaction.surface_m2,
            profile.and_then(|p| p.area_m2),
            weights.area,
            config.area_sensitivity,
        ),
        rooms: rooms_score(
            transaction.rooms,
            profile.and_then(|p| p.rooms),
            weights.rooms,
            config.room_penalty,
        ),
        discount: discount_score(
            transaction.price_per_m2,
            reference_price_m2,
            weights.discount,
            config.discount_sensitivity,
        ),
    }
}

#[inline]
fn distance_score(distance_m: f64, weight: f64, decay: &DistanceDecay) -> f64 {
    let factor = match *decay {
        DistanceDecay::Linear { cutoff_m } => {
            if cutoff_m <= 0.0 {
                0.0
            } else {
                1.0 - distance_m / cutoff_m
            }
        }
        DistanceDecay::Exponential { characteristic_m } => {
            if characteristic_m <= 0.0 {
                0.0
            } else {
                (-distance_m / characteristic_m).exp()
            }
        }
        // Unresolved (see `ScoringConfig::for_radius`): default perimeter
        DistanceDecay::SearchRadius => 1.0 - distance_m / UNRESOLVED_RADIUS_M,
    };

    (weight * factor).max(0.0)
}

#[inline]
fn area_score(surface_m2: f64, target_m2: Option<f64>, weight: f64, sensitivity: f64) -> f64 {
    match target_m2 {
        Some(target) if target > 0.0 => {
            let deviation = (surface_m2 - target).abs() / target;
            weight * (1.0 - sensitivity * deviation).max(0.0)
        }
        _ => weight,
    }
}

#[inline]
fn rooms_score(rooms: Option<u32>, target: Option<u32>, weight: f64, penalty: f64) -> f64 {
    match (rooms, target) {
        (Some(rooms), Some(target)) => {
            let delta = rooms.abs_diff(target) as f64;
            (weight - penalty * delta).max(0.0)
        }
        _ => weight,
    }
}

#[inline]
fn discount_score(price_m2: f64, reference_m2: Option<f64>, weight: f64, sensitivity: f64) -> f64 {
    match reference_m2 {
        Some(reference) if reference > 0.0 => {
            let discount = (reference - price_m2) / reference;
            if discount > 0.0 {
                weight * (sensitivity * discount).min(1.0)
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}
