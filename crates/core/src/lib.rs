pub mod config;
pub mod embeddings;
pub mod error;
pub mod filter;
pub mod ingest;
pub mod mapper;
pub mod models;
pub mod orchestrator;
pub mod progress;
pub mod query;
pub mod readiness;
pub mod source;
pub mod stores;
pub mod traits;

pub use config::{IngestConfig, ReadinessConfig, SchemaConfig, Settings, StoreConfig};
pub use embeddings::{Embedder, HashingEmbedder, RemoteEmbedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{ConfigError, EmbedError, IngestError, ReadinessError, SearchError};
pub use filter::Predicate;
pub use ingest::IngestionPipeline;
pub use mapper::ResultMapper;
pub use models::{
    Document, FilterPlacement, IngestProgress, IngestionOutcome, Query, RawHit, SearchHit,
    WriteAck, DEFAULT_TOP_K,
};
pub use orchestrator::HybridSearcher;
pub use progress::{NoProgress, ProgressObserver, TracingProgress};
pub use query::{BuiltQuery, QueryBuilder};
pub use readiness::{HealthProbe, ProbeOutcome, ReadinessGate, Sleeper, TokioSleeper};
pub use source::{JsonLinesSource, SourceRecord};
pub use stores::{MemoryStore, VespaStore};
pub use traits::{DocumentSink, SearchBackend};
