use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::core::filters::matches_query_constraints;
use crate::models::{CandidateQuery, Transaction, TransactionRow};

/// Columns requested from the store; keeping the list short avoids timeouts
pub const SELECTED_COLUMNS: &str =
    "type_bien,surface,valeur_fonciere,prix_m2,nb_pieces,latitude,longitude,date_mutation,section";

/// Precomputed section median, only present on tables imported with it
pub const SECTION_MEDIAN_COLUMN: &str = "prix_m2_median_section";

/// Errors that can occur when querying the transactions store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Fetch candidate sales; rows failing validation are skipped
    async fn fetch_candidates(&self, query: &CandidateQuery)
        -> Result<Vec<Transaction>, StoreError>;
}

/// PostgREST client for the Supabase `transactions` table
pub struct SupabaseClient {
    base_url: String,
    api_key: String,
    table: String,
    section_median: bool,
    client: Client,
}

impl SupabaseClient {
    pub fn new(
        base_url: String,
        api_key: String,
        table: String,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            api_key,
            table,
            section_median: false,
            client,
        })
    }

    /// Also select the precomputed section median column
    pub fn with_section_median(mut self, enabled: bool) -> Self {
        self.section_median = enabled;
        self
    }

    fn select_columns(&self) -> String {
        if self.section_median {
            format!("{},{}", SELECTED_COLUMNS, SECTION_MEDIAN_COLUMN)
        } else {
            SELECTED_COLUMNS.to_string()
        }
    }

    fn query_url(&self, query: &CandidateQuery) -> String {
        let bbox = &query.bounding_box;
        let mut url = format!(
            "{}/rest/v1/{}?code_postal=eq.{}&select={}&prix_m2=gt.0",
            self.base_url.trim_end_matches('/'),
            self.table,
            urlencoding::encode(&query.postcode),
            self.select_columns(),
        );

        if let Some(property_type) = query.property_type {
            url.push_str(&format!(
                "&type_bien=eq.{}",
                urlencoding::encode(property_type.as_str())
            ));
        }

        url.push_str(&format!(
            "&latitude=gte.{}&latitude=lte.{}&longitude=gte.{}&longitude=lte.{}",
            bbox.min_lat, bbox.max_lat, bbox.min_lon, bbox.max_lon
        ));

        url
    }
}

#[async_trait]
impl TransactionStore for SupabaseClient {
    async fn fetch_candidates(
        &self,
        query: &CandidateQuery,
    ) -> Result<Vec<Transaction>, StoreError> {
        let url = self.query_url(query);
        let range = format!("0-{}", query.limit.saturating_sub(1));

        tracing::debug!("Querying transactions: {} (range {})", url, range);

        let response = self
            .client
            .get(&url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Range", range)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!("Transactions store returned {}: {}", status, body);
            return Err(StoreError::ApiError(format!("{}: {}", status, body)));
        }

        let json: Value = serde_json::from_str(&body)
            .map_err(|e| StoreError::InvalidResponse(format!("Failed to parse body: {}", e)))?;

        // PostgREST reports errors as an object even on some 2xx paths
        let rows = match json {
            Value::Array(rows) => rows,
            other => return Err(StoreError::ApiError(other.to_string())),
        };

        let fetched = rows.len();
        let transactions: Vec<Transaction> = rows
            .into_iter()
            .filter_map(|row| match serde_json::from_value::<TransactionRow>(row) {
                Ok(row) => Transaction::try_from(row)
                    .map_err(|e| tracing::debug!("Skipping transaction row: {}", e))
                    .ok(),
                Err(e) => {
                    tracing::debug!("Skipping malformed transaction row: {}", e);
                    None
                }
            })
            .filter(|t| matches_query_constraints(t, query))
            .collect();

        tracing::debug!(
            "Fetched {} rows for {}, kept {}",
            fetched,
            query.postcode,
            transactions.len()
        );

        Ok(transactions)
    }
}
