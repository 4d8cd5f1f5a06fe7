//! In-process store for tests and offline runs.
//!
//! Upserts by id into a map and answers searches by brute-force cosine
//! similarity, evaluating in-engine predicates the same way the real store's
//! filter expression would.

use crate::filter;
use crate::mapper::to_search_hit;
use crate::query::BuiltQuery;
use crate::readiness::{HealthProbe, ProbeOutcome};
use crate::traits::{DocumentSink, SearchBackend};
use crate::{Document, IngestError, RawHit, SearchError, WriteAck};
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<String, Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: &str) -> Option<Document> {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }
}

fn cosine_sim(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        0.0
    } else {
        f64::from(dot / (mag_a * mag_b))
    }
}

fn raw_hit(document: &Document, relevance: f64) -> RawHit {
    let fields = json!({
        "id": document.id,
        "name": document.name,
        "space": document.space,
        "amenities": document.amenities,
        "price": document.price,
    });
    RawHit {
        id: Some(document.id.clone()),
        relevance,
        fields: fields.as_object().cloned().unwrap_or_default(),
    }
}

#[async_trait]
impl HealthProbe for MemoryStore {
    async fn probe(&self) -> ProbeOutcome {
        ProbeOutcome::Ready
    }
}

#[async_trait]
impl DocumentSink for MemoryStore {
    async fn write_document(&self, document: &Document) -> Result<WriteAck, IngestError> {
        let previous = self
            .documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(document.id.clone(), document.clone());
        Ok(WriteAck {
            status: if previous.is_some() { 200 } else { 201 },
        })
    }
}

#[async_trait]
impl SearchBackend for MemoryStore {
    async fn execute(&self, query: &BuiltQuery) -> Result<Vec<RawHit>, SearchError> {
        let documents = self
            .documents
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let mut scored: Vec<RawHit> = documents
            .values()
            .map(|document| raw_hit(document, cosine_sim(&query.vector, &document.embedding)))
            .filter(|hit| filter::matches_all(&query.store_predicates, &to_search_hit(hit.clone())))
            .collect();

        scored.sort_by(|left, right| right.relevance.total_cmp(&left.relevance));
        scored.truncate(query.hits);
        Ok(scored)
    }
}
