use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::core::AnalyzerConfig;
use crate::models::{MarketThresholds, ScoringConfig, VerdictBands};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    #[serde(default)]
    pub geocoder: GeocoderSettings,
    pub datastore: DatastoreSettings,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub market: MarketSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocoderSettings {
    #[serde(default = "default_geocoder_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeocoderSettings {
    fn default() -> Self {
        Self {
            endpoint: default_geocoder_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatastoreSettings {
    pub url: String,
    pub api_key: String,
    #[serde(default = "default_table")]
    pub table: String,
    /// Upper bound on rows fetched per lookup
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Table carries `prix_m2_median_section`
    #[serde(default)]
    pub section_median: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettings {
    #[serde(default = "default_radius_m")]
    pub radius_m: f64,
    #[serde(default = "default_max_radius_m")]
    pub max_radius_m: f64,
    #[serde(default = "default_max_comparables")]
    pub max_comparables: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            radius_m: default_radius_m(),
            max_radius_m: default_max_radius_m(),
            max_comparables: default_max_comparables(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarketSettings {
    #[serde(default)]
    pub thresholds: MarketThresholds,
    #[serde(default)]
    pub verdict_bands: VerdictBands,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_geocoder_endpoint() -> String { "https://data.geopf.fr/geocodage/search".to_string() }
fn default_timeout_secs() -> u64 { 10 }
fn default_table() -> String { "transactions".to_string() }
fn default_max_rows() -> usize { 500 }
fn default_radius_m() -> f64 { 500.0 }
fn default_max_radius_m() -> f64 { 5000.0 }
fn default_max_comparables() -> usize { 25 }
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with DVF_)
    /// 5. SUPABASE_URL / SUPABASE_KEY for the datastore
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., DVF__SEARCH__RADIUS_M -> search.radius_m
            .add_source(
                Environment::with_prefix("DVF")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        apply_datastore_env(settings)?.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("DVF")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Analyzer tunables assembled from the search, scoring and market sections
    pub fn analyzer_config(&self) -> AnalyzerConfig {
        AnalyzerConfig {
            default_radius_m: self.search.radius_m,
            max_radius_m: self.search.max_radius_m,
            max_comparables: self.search.max_comparables,
            scoring: self.scoring,
            thresholds: self.market.thresholds,
            verdict_bands: self.market.verdict_bands,
        }
    }
}

/// Let the deployment-wide SUPABASE_URL / SUPABASE_KEY variables win
fn apply_datastore_env(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    if let Ok(url) = env::var("SUPABASE_URL") {
        builder = builder.set_override("datastore.url", url)?;
    }
    if let Ok(key) = env::var("SUPABASE_KEY") {
        builder = builder.set_override("datastore.api_key", key)?;
    }

    builder.build()
}
