use chrono::NaiveDate;
use std::sync::Arc;
use thiserror::Error;

use crate::core::{calculate_bounding_box, AnalysisError, Analyzer, MarketAnalysis};
use crate::models::{CandidateQuery, ComparablesQuery, PropertyType, SearchProfile};
use crate::services::geocoder::{GeocodedAddress, Geocoder, GeocoderError};
use crate::services::transactions::{StoreError, TransactionStore};

/// Errors surfaced by a comparables lookup
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Adresse introuvable: {0}")]
    AddressNotFound(String),

    #[error("Geocoding failed: {0}")]
    Geocoder(GeocoderError),

    #[error("Transactions store failed: {0}")]
    Store(#[from] StoreError),

    #[error("Aucune vente trouvée dans ce périmètre.")]
    NoComparables(#[from] AnalysisError),
}

impl From<GeocoderError> for LookupError {
    fn from(err: GeocoderError) -> Self {
        match err {
            GeocoderError::NotFound(address) => LookupError::AddressNotFound(address),
            other => LookupError::Geocoder(other),
        }
    }
}

/// Outcome of a full lookup, ready for presentation
#[derive(Debug, Clone)]
pub struct Lookup {
    pub address: GeocodedAddress,
    pub profile: SearchProfile,
    pub analysis: MarketAnalysis,
}

/// Runs geocode -> fetch -> analyze for one address
pub struct ComparablesService {
    geocoder: Arc<dyn Geocoder>,
    store: Arc<dyn TransactionStore>,
    analyzer: Analyzer,
    max_rows: usize,
}

impl ComparablesService {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        store: Arc<dyn TransactionStore>,
        analyzer: Analyzer,
        max_rows: usize,
    ) -> Self {
        Self {
            geocoder,
            store,
            analyzer,
            max_rows,
        }
    }

    pub async fn lookup(&self, query: &ComparablesQuery) -> Result<Lookup, LookupError> {
        self.lookup_as_of(query, chrono::Utc::now().date_naive()).await
    }

    /// Lookup with an explicit reference date for the trailing-year counts
    pub async fn lookup_as_of(
        &self,
        query: &ComparablesQuery,
        as_of: NaiveDate,
    ) -> Result<Lookup, LookupError> {
        let address = self.geocoder.geocode(query.adresse.trim()).await?;

        tracing::info!(
            "Geocoded {:?} to {} ({}, {})",
            query.adresse,
            address.label,
            address.location.latitude(),
            address.location.longitude()
        );

        let profile = SearchProfile {
            location: address.location,
            area_m2: query.surface,
            rooms: query.pieces,
            price: query.prix,
            radius_m: query.rayon,
            property_type: query.type_bien.as_deref().and_then(PropertyType::parse),
        };

        let radius_m = self.analyzer.effective_radius_m(&profile);
        let candidate_query = CandidateQuery {
            postcode: address.postcode.clone(),
            property_type: profile.property_type,
            bounding_box: calculate_bounding_box(
                address.location.latitude(),
                address.location.longitude(),
                radius_m / 1000.0,
            ),
            limit: self.max_rows,
        };

        let candidates = self.store.fetch_candidates(&candidate_query).await?;
        tracing::debug!(
            "Found {} candidates in {} for {}",
            candidates.len(),
            address.postcode,
            address.label
        );

        let analysis = self.analyzer.analyze(&profile, candidates, as_of)?;

        tracing::info!(
            "Analysed {} comparables within {} m of {} (median {:.0} €/m², reliability {:?})",
            analysis.comparables.len(),
            analysis.radius_m,
            address.label,
            analysis.summary.median,
            analysis.summary.reliability
        );

        Ok(Lookup {
            address,
            profile,
            analysis,
        })
    }
}
