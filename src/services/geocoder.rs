use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::models::Coordinate;

/// Errors that can occur when geocoding an address
#[derive(Debug, Error)]
pub enum GeocoderError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Address not found: {0}")]
    NotFound(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Best match for a free-text address
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedAddress {
    pub label: String,
    pub postcode: String,
    pub location: Coordinate,
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<GeocodedAddress, GeocoderError>;
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Geometry,
    properties: FeatureProperties,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    coordinates: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct FeatureProperties {
    label: String,
    #[serde(default)]
    postcode: Option<String>,
}

/// Client for the IGN Géoplateforme geocoding API
pub struct GeoplateformeClient {
    endpoint: String,
    client: Client,
}

impl GeoplateformeClient {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, GeocoderError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { endpoint, client })
    }

    fn search_url(&self, address: &str) -> String {
        format!(
            "{}?q={}&limit=1",
            self.endpoint.trim_end_matches('/'),
            urlencoding::encode(address)
        )
    }
}

#[async_trait]
impl Geocoder for GeoplateformeClient {
    async fn geocode(&self, address: &str) -> Result<GeocodedAddress, GeocoderError> {
        let url = self.search_url(address);
        tracing::debug!("Geocoding address via: {}", url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read body".to_string());
            tracing::error!("Geocoder returned {} for {:?}: {}", status, address, body);
            return Err(GeocoderError::ApiError(format!("Geocoding failed: {}", status)));
        }

        let collection: FeatureCollection = response
            .json()
            .await
            .map_err(|e| GeocoderError::InvalidResponse(e.to_string()))?;

        let feature = collection
            .features
            .into_iter()
            .next()
            .ok_or_else(|| GeocoderError::NotFound(address.to_string()))?;

        // GeoJSON positions are [longitude, latitude]
        let (lon, lat) = match feature.geometry.coordinates.as_slice() {
            [lon, lat, ..] => (*lon, *lat),
            _ => {
                return Err(GeocoderError::InvalidResponse(
                    "geometry has fewer than two coordinates".into(),
                ))
            }
        };
        let location = Coordinate::new(lat, lon)
            .map_err(|e| GeocoderError::InvalidResponse(e.to_string()))?;

        let postcode = feature.properties.postcode.ok_or_else(|| {
            GeocoderError::InvalidResponse(format!("no postcode for {}", feature.properties.label))
        })?;

        Ok(GeocodedAddress {
            label: feature.properties.label,
            postcode,
            location,
        })
    }
}
