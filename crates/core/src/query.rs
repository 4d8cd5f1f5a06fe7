//! Compiles a [`Query`] into the store's nearest-neighbor + filter request.

use serde_json::{json, Map, Value};
use std::time::Duration;

use crate::config::SchemaConfig;
use crate::embeddings::Embedder;
use crate::filter::{self, Predicate};
use crate::{FilterPlacement, Query, SearchError};

/// A query ready to send. Owns everything the backend and the mapper need.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub yql: String,
    pub input_name: String,
    pub vector: Vec<f32>,
    pub ranking_profile: String,
    pub hits: usize,
    pub timeout: Option<Duration>,
    pub placement: FilterPlacement,
    /// Predicates compiled into `yql`, evaluated by the store.
    pub store_predicates: Vec<Predicate>,
    /// Predicates the mapper evaluates on returned hits.
    pub client_predicates: Vec<Predicate>,
}

impl BuiltQuery {
    pub fn to_request_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("yql".to_string(), Value::String(self.yql.clone()));
        body.insert(
            format!("input.query({})", self.input_name),
            json!(self.vector),
        );
        body.insert(
            "ranking".to_string(),
            Value::String(self.ranking_profile.clone()),
        );
        body.insert("hits".to_string(), json!(self.hits));
        if let Some(timeout) = self.timeout {
            body.insert(
                "timeout".to_string(),
                Value::String(format!("{}ms", timeout.as_millis())),
            );
        }
        Value::Object(body)
    }
}

pub struct QueryBuilder<E> {
    embedder: E,
    schema: SchemaConfig,
    timeout: Option<Duration>,
}

impl<E: Embedder> QueryBuilder<E> {
    pub fn new(embedder: E, schema: SchemaConfig) -> Self {
        Self {
            embedder,
            schema,
            timeout: None,
        }
    }

    /// Server-side time budget sent with each query.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub async fn build(&self, query: &Query) -> Result<BuiltQuery, SearchError> {
        query.validate()?;
        let vector = self.embedder.embed(&query.text).await?;
        self.compile(query, vector)
    }

    /// Pure half of [`build`](Self::build): no embedding, no I/O.
    pub fn compile(&self, query: &Query, vector: Vec<f32>) -> Result<BuiltQuery, SearchError> {
        query.validate()?;
        if vector.len() != self.schema.dimensions {
            return Err(SearchError::DimensionMismatch {
                expected: self.schema.dimensions,
                actual: vector.len(),
            });
        }

        let predicates = query.predicates();
        let (store_predicates, client_predicates) = match query.placement {
            FilterPlacement::Pre => (predicates, Vec::new()),
            FilterPlacement::Post => (Vec::new(), predicates),
        };

        let nearest = format!(
            "({{targetHits:{}}}nearestNeighbor({}, {}))",
            query.top_k, self.schema.embedding_field, self.schema.query_input
        );
        let condition = match filter::conjunction(&store_predicates) {
            Some(clauses) => format!("{nearest} and {clauses}"),
            None => nearest,
        };
        let yql = format!(
            "select {} from {} where {}",
            self.schema.summary_fields.join(", "),
            self.schema.source,
            condition
        );

        Ok(BuiltQuery {
            yql,
            input_name: self.schema.query_input.clone(),
            vector,
            ranking_profile: self.schema.ranking_profile.clone(),
            hits: query.top_k,
            timeout: self.timeout,
            placement: query.placement,
            store_predicates,
            client_predicates,
        })
    }
}
