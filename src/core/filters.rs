use crate::models::{CandidateQuery, PropertyType, Transaction};

/// A row can enter the market sample only with a positive price per m²
#[inline]
pub fn is_usable(transaction: &Transaction) -> bool {
    transaction.price_per_m2.is_finite() && transaction.price_per_m2 > 0.0
}

/// No filter accepts every property type
#[inline]
pub fn matches_property_type(transaction: &Transaction, filter: Option<PropertyType>) -> bool {
    filter.map_or(true, |wanted| transaction.property_type == wanted)
}

/// Inclusive radius check on a rounded distance
#[inline]
pub fn is_within_radius(distance_m: u32, radius_m: f64) -> bool {
    distance_m as f64 <= radius_m
}

/// Check a row against the constraints sent to the store
///
/// The store applies the same filters server-side; this guards against
/// stores that ignore some of them.
#[inline]
pub fn matches_query_constraints(transaction: &Transaction, query: &CandidateQuery) -> bool {
    super::distance::is_within_bounding_box(
        transaction.location.latitude(),
        transaction.location.longitude(),
        &query.bounding_box,
    ) && matches_property_type(transaction, query.property_type)
}
