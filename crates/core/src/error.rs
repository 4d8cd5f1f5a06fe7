use thiserror::Error;

use crate::readiness::ProbeOutcome;

#[derive(Debug, Error)]
pub enum ReadinessError {
    #[error("store unavailable after {attempts} attempts (last probe: {last_outcome})")]
    DependencyUnavailable {
        attempts: u32,
        last_outcome: ProbeOutcome,
    },

    #[error("readiness wait cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
}

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("embedding vector has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding request failed: {0}")]
    Request(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("query vector has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("search failed (status {}): {body}", status_label(.status))]
    SearchFailed { status: Option<u16>, body: String },

    #[error("embedding failed: {0}")]
    Embedding(EmbedError),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}

/// A wrong-width vector is reported the same way whichever embedder produced it.
impl From<EmbedError> for SearchError {
    fn from(error: EmbedError) -> Self {
        match error {
            EmbedError::DimensionMismatch { expected, actual } => {
                SearchError::DimensionMismatch { expected, actual }
            }
            other => SearchError::Embedding(other),
        }
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("document {id}: embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch {
        id: String,
        expected: usize,
        actual: usize,
    },

    #[error("write of document {id} failed (status {}): {body}", status_label(.status))]
    WriteFailed {
        id: String,
        status: Option<u16>,
        body: String,
    },

    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbedError),

    #[error("malformed source record at line {line}: {details}")]
    MalformedRecord { line: usize, details: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid setting: {0}")]
    Invalid(String),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("http client setup failed: {0}")]
    HttpClient(#[from] reqwest::Error),
}

fn status_label(status: &Option<u16>) -> String {
    status.map_or_else(|| "transport".to_string(), |code| code.to_string())
}
