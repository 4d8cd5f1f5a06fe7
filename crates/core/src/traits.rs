use crate::query::BuiltQuery;
use crate::{Document, IngestError, RawHit, SearchError, WriteAck};
use async_trait::async_trait;

pub use crate::readiness::HealthProbe;

/// Write side of the store. A write is an upsert keyed by `Document::id`.
#[async_trait]
pub trait DocumentSink: Send + Sync {
    async fn write_document(&self, document: &Document) -> Result<WriteAck, IngestError>;
}

/// Query side of the store. One request per call, no retry.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn execute(&self, query: &BuiltQuery) -> Result<Vec<RawHit>, SearchError>;
}

#[async_trait]
impl<T: DocumentSink + ?Sized> DocumentSink for std::sync::Arc<T> {
    async fn write_document(&self, document: &Document) -> Result<WriteAck, IngestError> {
        (**self).write_document(document).await
    }
}

#[async_trait]
impl<T: SearchBackend + ?Sized> SearchBackend for std::sync::Arc<T> {
    async fn execute(&self, query: &BuiltQuery) -> Result<Vec<RawHit>, SearchError> {
        (**self).execute(query).await
    }
}

#[async_trait]
impl<'a, T: SearchBackend + ?Sized> SearchBackend for &'a T {
    async fn execute(&self, query: &BuiltQuery) -> Result<Vec<RawHit>, SearchError> {
        (**self).execute(query).await
    }
}
