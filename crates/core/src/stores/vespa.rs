use crate::config::{base_url, SchemaConfig, StoreConfig};
use crate::query::BuiltQuery;
use crate::readiness::{HealthProbe, ProbeOutcome};
use crate::traits::{DocumentSink, SearchBackend};
use crate::{ConfigError, Document, IngestError, RawHit, SearchError, WriteAck};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

/// HTTP client for a Vespa application: health, document/v1 writes and search.
pub struct VespaStore {
    client: Client,
    base: Url,
    namespace: String,
    document_type: String,
    embedding_field: String,
}

impl VespaStore {
    pub fn new(store: &StoreConfig, schema: &SchemaConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(store.request_timeout())
            .build()?;
        Ok(Self {
            client,
            base: base_url(&store.endpoint)?,
            namespace: store.namespace.clone(),
            document_type: store.document_type.clone(),
            embedding_field: schema.embedding_field.clone(),
        })
    }

    pub fn health_url(&self) -> Result<Url, url::ParseError> {
        self.base.join("state/v1/health")
    }

    pub fn search_url(&self) -> Result<Url, url::ParseError> {
        self.base.join("search/")
    }

    /// `document/v1/<namespace>/<doctype>/docid/<id>`, with `id` percent-encoded.
    pub fn document_url(&self, id: &str) -> Result<Url, url::ParseError> {
        let mut url = self.base.join("document/v1/")?;
        url.path_segments_mut()
            .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend([self.namespace.as_str(), self.document_type.as_str(), "docid", id]);
        Ok(url)
    }

    pub fn document_body(&self, document: &Document) -> Value {
        let mut fields = json!({
            "id": document.id,
            "name": document.name,
            "space": document.space,
            "amenities": document.amenities,
            "price": document.price,
        });
        fields[self.embedding_field.as_str()] = json!({ "values": document.embedding });
        json!({ "fields": fields })
    }
}

pub fn is_write_success(status: StatusCode) -> bool {
    matches!(status, StatusCode::OK | StatusCode::CREATED)
}

#[async_trait]
impl HealthProbe for VespaStore {
    async fn probe(&self) -> ProbeOutcome {
        let url = match self.health_url() {
            Ok(url) => url,
            Err(error) => return ProbeOutcome::Unreachable(error.to_string()),
        };
        match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => ProbeOutcome::Ready,
            Ok(response) => ProbeOutcome::NotReady(response.status().as_u16()),
            Err(error) => ProbeOutcome::Unreachable(error.to_string()),
        }
    }
}

#[async_trait]
impl DocumentSink for VespaStore {
    async fn write_document(&self, document: &Document) -> Result<WriteAck, IngestError> {
        let url = self.document_url(&document.id)?;
        let response = self
            .client
            .post(url)
            .json(&self.document_body(document))
            .send()
            .await
            .map_err(|error| IngestError::WriteFailed {
                id: document.id.clone(),
                status: None,
                body: error.to_string(),
            })?;

        let status = response.status();
        if !is_write_success(status) {
            return Err(IngestError::WriteFailed {
                id: document.id.clone(),
                status: Some(status.as_u16()),
                body: response.text().await.unwrap_or_default(),
            });
        }

        debug!(id = %document.id, status = status.as_u16(), "document written");
        Ok(WriteAck {
            status: status.as_u16(),
        })
    }
}

#[derive(Debug, Deserialize, Default)]
struct SearchResponse {
    #[serde(default)]
    root: ResponseRoot,
}

#[derive(Debug, Deserialize, Default)]
struct ResponseRoot {
    #[serde(default)]
    children: Vec<RawHit>,
    #[serde(default)]
    errors: Vec<Value>,
}

#[async_trait]
impl SearchBackend for VespaStore {
    async fn execute(&self, query: &BuiltQuery) -> Result<Vec<RawHit>, SearchError> {
        let transport = |error: reqwest::Error| SearchError::SearchFailed {
            status: error.status().map(|status| status.as_u16()),
            body: error.to_string(),
        };

        let response = self
            .client
            .post(self.search_url()?)
            .json(&query.to_request_body())
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let body = response.text().await.map_err(transport)?;
        if !status.is_success() {
            return Err(SearchError::SearchFailed {
                status: Some(status.as_u16()),
                body,
            });
        }

        let parsed: SearchResponse =
            serde_json::from_str(&body).map_err(|error| SearchError::SearchFailed {
                status: Some(status.as_u16()),
                body: format!("unparseable search response: {error}"),
            })?;

        if parsed.root.children.is_empty() && !parsed.root.errors.is_empty() {
            return Err(SearchError::SearchFailed {
                status: Some(status.as_u16()),
                body: Value::Array(parsed.root.errors).to_string(),
            });
        }

        debug!(hits = parsed.root.children.len(), "search executed");
        Ok(parsed.root.children)
    }
}
