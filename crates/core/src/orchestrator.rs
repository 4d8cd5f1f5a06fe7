use tracing::{debug, info};

use crate::embeddings::Embedder;
use crate::mapper::ResultMapper;
use crate::query::{BuiltQuery, QueryBuilder};
use crate::traits::SearchBackend;
use crate::{FilterPlacement, Query, SearchError, SearchHit};

/// Embeds a query, compiles it, runs it once against the store and maps the hits.
///
/// Failures are returned as-is. Retrying a failed search is left to the caller.
/// With [`FilterPlacement::Post`] the result may hold fewer than `top_k` hits.
pub struct HybridSearcher<E, B> {
    builder: QueryBuilder<E>,
    backend: B,
    mapper: ResultMapper,
}

impl<E, B> HybridSearcher<E, B>
where
    E: Embedder,
    B: SearchBackend,
{
    pub fn new(builder: QueryBuilder<E>, backend: B) -> Self {
        Self {
            builder,
            backend,
            mapper: ResultMapper,
        }
    }

    pub async fn search(&self, query: &Query) -> Result<Vec<SearchHit>, SearchError> {
        let built = self.builder.build(query).await?;
        self.execute(built).await
    }

    /// Runs an already-embedded query; the vector length is still checked first.
    pub async fn search_with_vector(
        &self,
        query: &Query,
        vector: Vec<f32>,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let built = self.builder.compile(query, vector)?;
        self.execute(built).await
    }

    async fn execute(&self, built: BuiltQuery) -> Result<Vec<SearchHit>, SearchError> {
        debug!(yql = %built.yql, hits = built.hits, "executing search");
        let raw_hits = self.backend.execute(&built).await?;
        let retrieved = raw_hits.len();
        let hits = self.mapper.map(raw_hits, &built);

        if built.placement == FilterPlacement::Post && hits.len() < built.hits {
            debug!(
                retrieved,
                kept = hits.len(),
                requested = built.hits,
                "post-filter returned fewer hits than requested"
            );
        }
        info!(
            placement = ?built.placement,
            retrieved,
            returned = hits.len(),
            "search complete"
        );
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchemaConfig;
    use crate::embeddings::HashingEmbedder;
    use crate::RawHit;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct SpyBackend {
        calls: AtomicUsize,
        hits: Vec<RawHit>,
        fail_with: Option<u16>,
    }

    #[async_trait]
    impl SearchBackend for SpyBackend {
        async fn execute(&self, _query: &BuiltQuery) -> Result<Vec<RawHit>, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.fail_with {
                Some(status) => Err(SearchError::SearchFailed {
                    status: Some(status),
                    body: "overloaded".to_string(),
                }),
                None => Ok(self.hits.clone()),
            }
        }
    }

    /// Ignores the configured width and always returns three dimensions.
    struct WrongWidthEmbedder;

    #[async_trait]
    impl Embedder for WrongWidthEmbedder {
        fn dimensions(&self) -> usize {
            8
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, crate::EmbedError> {
            Ok(vec![0.0; 3])
        }
    }

    fn schema(dimensions: usize) -> SchemaConfig {
        SchemaConfig {
            dimensions,
            ..SchemaConfig::default()
        }
    }

    fn raw(id: &str, amenities: &[&str], relevance: f64) -> RawHit {
        RawHit {
            id: None,
            relevance,
            fields: json!({ "id": id, "amenities": amenities, "price": 90 })
                .as_object()
                .cloned()
                .unwrap_or_default(),
        }
    }

    #[tokio::test]
    async fn dimension_mismatch_fails_before_any_store_call() {
        let backend = SpyBackend::default();
        let searcher =
            HybridSearcher::new(QueryBuilder::new(WrongWidthEmbedder, schema(8)), &backend);

        let result = searcher.search(&Query::new("cozy loft")).await;

        assert!(matches!(
            result,
            Err(SearchError::DimensionMismatch {
                expected: 8,
                actual: 3
            })
        ));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn precomputed_vector_of_wrong_width_is_rejected_before_the_store() {
        let backend = SpyBackend::default();
        let searcher =
            HybridSearcher::new(QueryBuilder::new(HashingEmbedder::new(4), schema(4)), &backend);

        let result = searcher
            .search_with_vector(&Query::new("cozy loft"), vec![0.5; 6])
            .await;

        assert!(matches!(
            result,
            Err(SearchError::DimensionMismatch {
                expected: 4,
                actual: 6
            })
        ));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn precomputed_vector_skips_the_embedder() -> Result<(), SearchError> {
        let backend = SpyBackend {
            hits: vec![raw("a", &["WiFi"], 0.9)],
            ..SpyBackend::default()
        };
        let searcher =
            HybridSearcher::new(QueryBuilder::new(WrongWidthEmbedder, schema(8)), &backend);

        let hits = searcher
            .search_with_vector(&Query::new("cozy loft"), vec![0.1; 8])
            .await?;

        assert_eq!(hits.len(), 1);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn invalid_query_never_reaches_the_store() {
        let backend = SpyBackend::default();
        let searcher =
            HybridSearcher::new(QueryBuilder::new(HashingEmbedder::new(4), schema(4)), &backend);

        let result = searcher.search(&Query::new("")).await;

        assert!(matches!(result, Err(SearchError::InvalidQuery(_))));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn store_failure_is_surfaced_once_without_retry() {
        let backend = SpyBackend {
            fail_with: Some(503),
            ..SpyBackend::default()
        };
        let searcher =
            HybridSearcher::new(QueryBuilder::new(HashingEmbedder::new(4), schema(4)), &backend);

        let result = searcher.search(&Query::new("loft")).await;

        assert!(matches!(
            result,
            Err(SearchError::SearchFailed {
                status: Some(503),
                ..
            })
        ));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn postfilter_may_return_fewer_than_top_k() -> Result<(), SearchError> {
        let backend = SpyBackend {
            hits: vec![
                raw("a", &["Kitchen"], 0.9),
                raw("b", &["WiFi"], 0.8),
                raw("c", &[], 0.7),
            ],
            ..SpyBackend::default()
        };
        let searcher =
            HybridSearcher::new(QueryBuilder::new(HashingEmbedder::new(4), schema(4)), &backend);
        let query = Query::new("loft")
            .with_top_k(3)
            .with_amenity("WiFi")
            .with_placement(FilterPlacement::Post);

        let hits = searcher.search(&query).await?;

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "b");
        Ok(())
    }
}
