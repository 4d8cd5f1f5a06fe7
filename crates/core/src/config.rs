//! Runtime settings for the store, schema, readiness gate and ingestion.
//!
//! Every field has a default matching the stock Vespa `airbnb` application, so
//! an empty TOML file (or none at all) is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::embeddings::DEFAULT_EMBEDDING_DIMENSIONS;
use crate::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Settings {
    pub store: StoreConfig,
    pub schema: SchemaConfig,
    pub readiness: ReadinessConfig,
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    pub endpoint: String,
    pub namespace: String,
    pub document_type: String,
    pub request_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080".to_string(),
            namespace: "airbnb".to_string(),
            document_type: "airbnb".to_string(),
            request_timeout_ms: 5_000,
        }
    }
}

impl StoreConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Server-side search budget, kept below the client timeout.
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.saturating_mul(4) / 5)
    }
}

/// Names the store-side schema elements a query is compiled against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchemaConfig {
    pub source: String,
    pub embedding_field: String,
    pub query_input: String,
    pub ranking_profile: String,
    pub dimensions: usize,
    pub summary_fields: Vec<String>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            source: "airbnb".to_string(),
            embedding_field: "text_embeddings".to_string(),
            query_input: "q_vec".to_string(),
            ranking_profile: "vector_similarity".to_string(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            summary_fields: ["id", "name", "space", "amenities", "price"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReadinessConfig {
    pub max_attempts: u32,
    pub interval_secs: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval_secs: 10,
        }
    }
}

impl ReadinessConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IngestConfig {
    pub concurrency: usize,
    pub progress_every: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            progress_every: 100,
        }
    }
}

impl Settings {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        base_url(&self.store.endpoint)?;
        if self.schema.dimensions == 0 {
            return Err(ConfigError::Invalid("schema.dimensions must be positive".to_string()));
        }
        if self.readiness.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "readiness.max_attempts must be positive".to_string(),
            ));
        }
        if self.ingest.concurrency == 0 {
            return Err(ConfigError::Invalid("ingest.concurrency must be positive".to_string()));
        }
        if self.store.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "store.request_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parses `raw` and guarantees a trailing slash so relative joins extend the path.
pub fn base_url(raw: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
