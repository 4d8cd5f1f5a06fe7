use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::embeddings::Embedder;
use crate::progress::{NoProgress, ProgressObserver};
use crate::source::SourceRecord;
use crate::traits::DocumentSink;
use crate::{Document, EmbedError, IngestError, IngestionOutcome, WriteAck};

/// Writes a stream of listings to the store, one upsert per document.
///
/// A failed item is counted and the run moves on; every item in the source is
/// attempted before [`run`](Self::run) returns. With `concurrency > 1` writes
/// overlap, but outcomes are still accounted in source order.
pub struct IngestionPipeline<S, E> {
    sink: S,
    embedder: E,
    concurrency: usize,
    observer: Box<dyn ProgressObserver>,
}

impl<S, E> IngestionPipeline<S, E>
where
    S: DocumentSink,
    E: Embedder,
{
    pub fn new(sink: S, embedder: E) -> Self {
        Self {
            sink,
            embedder,
            concurrency: 1,
            observer: Box::new(NoProgress),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_observer(mut self, observer: impl ProgressObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn dimensions(&self) -> usize {
        self.embedder.dimensions()
    }

    pub async fn run<I>(&self, documents: I) -> IngestionOutcome
    where
        I: IntoIterator<Item = Document>,
    {
        self.run_source(
            documents
                .into_iter()
                .map(|document| Ok(SourceRecord::from(document))),
        )
        .await
    }

    /// Like [`run`](Self::run), for sources that may yield unreadable records.
    /// Records without a precomputed embedding are embedded here.
    pub async fn run_source<I>(&self, records: I) -> IngestionOutcome
    where
        I: IntoIterator<Item = Result<SourceRecord, IngestError>>,
    {
        let mut outcome = IngestionOutcome::default();
        let results = stream::iter(records)
            .map(|record| self.ingest_one(record))
            .buffered(self.concurrency);
        futures::pin_mut!(results);

        while let Some((id, result)) = results.next().await {
            match result {
                Ok(_) => outcome.record_success(),
                Err(error) => {
                    warn!(id = %id, error = %error, "document not ingested");
                    outcome.record_failure(id, error.to_string());
                }
            }
            self.observer.on_progress(outcome.progress());
        }

        self.observer.on_complete(outcome.progress());
        info!(
            total = outcome.total,
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            "ingestion run complete"
        );
        outcome
    }

    async fn ingest_one(
        &self,
        record: Result<SourceRecord, IngestError>,
    ) -> (String, Result<WriteAck, IngestError>) {
        let record = match record {
            Ok(record) => record,
            Err(error) => return (failure_key(&error), Err(error)),
        };
        let id = record.id.clone();
        let result = self.prepare(record).await;
        let result = match result {
            Ok(document) => self.sink.write_document(&document).await,
            Err(error) => Err(error),
        };
        (id, result)
    }

    async fn prepare(&self, mut record: SourceRecord) -> Result<Document, IngestError> {
        let embedding = match record.embedding.take() {
            Some(embedding) => embedding,
            None => self
                .embedder
                .embed(&record.embedding_text())
                .await
                .map_err(|error| match error {
                    EmbedError::DimensionMismatch { expected, actual } => {
                        IngestError::DimensionMismatch {
                            id: record.id.clone(),
                            expected,
                            actual,
                        }
                    }
                    other => IngestError::Embedding(other),
                })?,
        };

        let expected = self.embedder.dimensions();
        if embedding.len() != expected {
            return Err(IngestError::DimensionMismatch {
                id: record.id,
                expected,
                actual: embedding.len(),
            });
        }

        Ok(record.into_document(embedding))
    }
}

fn failure_key(error: &IngestError) -> String {
    match error {
        IngestError::MalformedRecord { line, .. } => format!("line:{line}"),
        IngestError::WriteFailed { id, .. } | IngestError::DimensionMismatch { id, .. } => {
            id.clone()
        }
        _ => "unknown".to_string(),
    }
}
