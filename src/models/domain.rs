use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised when a latitude/longitude pair cannot be used
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinateError {
    #[error("non-finite coordinate ({latitude}, {longitude})")]
    NonFinite { latitude: f64, longitude: f64 },

    #[error("latitude {0} outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} outside [-180, 180]")]
    LongitudeOutOfRange(f64),
}

/// WGS84 position in decimal degrees
///
/// Only constructible through [`Coordinate::new`], so every value held by the
/// rest of the crate is finite and in range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(CoordinateError::NonFinite { latitude, longitude });
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::LongitudeOutOfRange(longitude));
        }
        Ok(Self { latitude, longitude })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Great-circle distance to `other` in kilometers
    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        crate::core::distance::haversine_distance(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }
}

/// Property category as labelled in the DVF dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    #[serde(rename = "Maison")]
    House,
    #[serde(rename = "Appartement")]
    Apartment,
    #[serde(other, rename = "Autre")]
    Other,
}

impl PropertyType {
    /// Label used by the store's `type_bien` column
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::House => "Maison",
            PropertyType::Apartment => "Appartement",
            PropertyType::Other => "Autre",
        }
    }

    /// Parse a user supplied filter, accepting the DVF labels case-insensitively
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "maison" | "house" => Some(PropertyType::House),
            "appartement" | "apartment" => Some(PropertyType::Apartment),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw row as returned by the transactions store
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionRow {
    #[serde(default)]
    pub type_bien: Option<PropertyType>,
    #[serde(default)]
    pub surface: Option<f64>,
    #[serde(default)]
    pub valeur_fonciere: Option<f64>,
    #[serde(default)]
    pub prix_m2: Option<f64>,
    #[serde(default)]
    pub nb_pieces: Option<u32>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub date_mutation: Option<NaiveDate>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub prix_m2_median_section: Option<f64>,
}

/// Reasons a store row is rejected at ingestion
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransactionRowError {
    #[error("row has no location")]
    MissingLocation,

    #[error("invalid location: {0}")]
    InvalidCoordinate(#[from] CoordinateError),

    #[error("non-positive or missing {0}")]
    NonPositive(&'static str),
}

/// A validated property sale
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    #[serde(rename = "type_bien")]
    pub property_type: PropertyType,
    #[serde(rename = "surface")]
    pub surface_m2: f64,
    #[serde(rename = "valeur_fonciere")]
    pub price: f64,
    #[serde(rename = "prix_m2")]
    pub price_per_m2: f64,
    #[serde(rename = "nb_pieces")]
    pub rooms: Option<u32>,
    #[serde(rename = "date_mutation")]
    pub sale_date: Option<NaiveDate>,
    #[serde(flatten)]
    pub location: Coordinate,
    pub section: Option<String>,
    #[serde(rename = "prix_m2_median_section", skip_serializing_if = "Option::is_none")]
    pub section_median_price_m2: Option<f64>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = TransactionRowError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let (latitude, longitude) = match (row.latitude, row.longitude) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => return Err(TransactionRowError::MissingLocation),
        };
        let location = Coordinate::new(latitude, longitude)?;

        let surface_m2 = row
            .surface
            .filter(|s| *s > 0.0)
            .ok_or(TransactionRowError::NonPositive("surface"))?;
        let price = row
            .valeur_fonciere
            .filter(|p| *p > 0.0)
            .ok_or(TransactionRowError::NonPositive("valeur_fonciere"))?;

        // The store rounds prix_m2 on import; fall back to the raw ratio
        let price_per_m2 = row
            .prix_m2
            .filter(|p| *p > 0.0)
            .unwrap_or(price / surface_m2);

        Ok(Self {
            property_type: row.type_bien.unwrap_or(PropertyType::Other),
            surface_m2,
            price,
            price_per_m2,
            rooms: row.nb_pieces,
            sale_date: row.date_mutation,
            location,
            section: row.section.filter(|s| !s.is_empty()),
            section_median_price_m2: row.prix_m2_median_section.filter(|p| *p > 0.0),
        })
    }
}

/// Target property and search parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SearchProfile {
    pub location: Coordinate,
    pub area_m2: Option<f64>,
    pub rooms: Option<u32>,
    pub price: Option<f64>,
    pub radius_m: Option<f64>,
    pub property_type: Option<PropertyType>,
}

impl SearchProfile {
    pub fn at(location: Coordinate) -> Self {
        Self {
            location,
            area_m2: None,
            rooms: None,
            price: None,
            radius_m: None,
            property_type: None,
        }
    }
}

/// Transaction ranked against a search profile
#[derive(Debug, Clone, Serialize)]
pub struct ScoredComparable {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub distance_m: u32,
    pub score: u8,
    #[serde(rename = "ecart_marche_pct")]
    pub market_deviation_pct: Option<f64>,
}

/// Three-tier confidence derived from the sample size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reliability {
    High,
    Medium,
    Low,
}

impl Reliability {
    pub fn label(&self) -> &'static str {
        match self {
            Reliability::High => "Forte",
            Reliability::Medium => "Moyenne",
            Reliability::Low => "Faible",
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            Reliability::High => "f-haute",
            Reliability::Medium => "f-moyenne",
            Reliability::Low => "f-faible",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Reliability::High => "🟢",
            Reliability::Medium => "🟡",
            Reliability::Low => "🔴",
        }
    }
}

/// Sales velocity over the trailing twelve months
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tension {
    High,
    Balanced,
    Low,
}

impl Tension {
    pub fn label(&self) -> &'static str {
        match self {
            Tension::High => "Marché tendu",
            Tension::Balanced => "Marché équilibré",
            Tension::Low => "Marché détendu",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Homogeneity {
    Homogeneous,
    Heterogeneous,
}

impl Homogeneity {
    pub fn label(&self) -> &'static str {
        match self {
            Homogeneity::Homogeneous => "Prix homogènes",
            Homogeneity::Heterogeneous => "Prix dispersés",
        }
    }
}

/// Qualitative position of a target price against the market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    GoodDeal,
    Fair,
    SlightlyExpensive,
    Overpriced,
}

impl Verdict {
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::GoodDeal => "Bonne affaire",
            Verdict::Fair => "Prix cohérent",
            Verdict::SlightlyExpensive => "Légèrement cher",
            Verdict::Overpriced => "Surévalué",
        }
    }
}

/// Aggregate price-per-area statistics over the market sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSummary {
    pub sample_size: usize,
    pub p25: f64,
    #[serde(rename = "mediane")]
    pub median: f64,
    pub p75: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub dispersion_pct: Option<f64>,
    pub homogeneity: Option<Homogeneity>,
    pub reliability: Reliability,
    pub recent_sales: usize,
    pub tension: Tension,
}

/// Value range for the target area at market prices
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Estimate {
    #[serde(rename = "prix")]
    pub price: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TargetComparison {
    #[serde(rename = "prix_m2")]
    pub price_per_m2: f64,
    #[serde(rename = "ecart")]
    pub deviation_pct: f64,
    pub verdict: Verdict,
}

/// Geospatial bounding box
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

/// Parameters of a store query for candidate rows
#[derive(Debug, Clone)]
pub struct CandidateQuery {
    pub postcode: String,
    pub property_type: Option<PropertyType>,
    pub bounding_box: BoundingBox,
    pub limit: usize,
}

/// Sub-score weights; their sum is the maximum attainable score
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub distance: f64,
    pub area: f64,
    pub rooms: f64,
    pub discount: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            distance: 40.0,
            area: 25.0,
            rooms: 20.0,
            discount: 15.0,
        }
    }
}

/// How the distance sub-score decays
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum DistanceDecay {
    /// Falls linearly to zero at `cutoff_m`
    Linear { cutoff_m: f64 },
    /// `exp(-d / characteristic_m)`
    Exponential { characteristic_m: f64 },
    /// Linear, reaching zero at the effective search radius
    SearchRadius,
}

impl Default for DistanceDecay {
    fn default() -> Self {
        DistanceDecay::Linear { cutoff_m: 500.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: ScoringWeights,
    pub decay: DistanceDecay,
    /// Relative area deviation multiplier; 2.0 zeroes the area score at 50% off
    pub area_sensitivity: f64,
    /// Points lost per room of difference
    pub room_penalty: f64,
    /// Discount multiplier; 5.0 gives the full discount score at 20% below reference
    pub discount_sensitivity: f64,
}

impl ScoringConfig {
    /// Resolve a radius-relative decay against the radius actually searched
    pub fn for_radius(&self, radius_m: f64) -> ScoringConfig {
        let mut config = *self;
        if config.decay == DistanceDecay::SearchRadius {
            config.decay = DistanceDecay::Linear { cutoff_m: radius_m };
        }
        config
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            decay: DistanceDecay::default(),
            area_sensitivity: 2.0,
            room_penalty: 5.0,
            discount_sensitivity: 5.0,
        }
    }
}

/// Classification thresholds, all inclusive on the upper tier
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct MarketThresholds {
    pub reliability_high: usize,
    pub reliability_medium: usize,
    pub tension_high: usize,
    pub tension_balanced: usize,
    /// Dispersion percentage below which prices count as homogeneous
    pub homogeneous_below_pct: f64,
    pub tension_window_months: u32,
}

impl Default for MarketThresholds {
    fn default() -> Self {
        Self {
            reliability_high: 15,
            reliability_medium: 5,
            tension_high: 10,
            tension_balanced: 4,
            homogeneous_below_pct: 8.0,
            tension_window_months: 12,
        }
    }
}

/// Upper bounds (inclusive, in percent) of each verdict band
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct VerdictBands {
    pub good_deal_max: f64,
    pub fair_max: f64,
    pub slightly_expensive_max: f64,
}

impl Default for VerdictBands {
    fn default() -> Self {
        Self {
            good_deal_max: -8.0,
            fair_max: 5.0,
            slightly_expensive_max: 12.0,
        }
    }
}
