use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use listing_search_core::{
    Embedder, FilterPlacement, HashingEmbedder, HybridSearcher, IngestionPipeline,
    JsonLinesSource, Query, QueryBuilder, ReadinessGate, RemoteEmbedder, Settings,
    TracingProgress, VespaStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "listing-search", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Optional TOML settings file
    #[arg(long, env = "LISTING_SEARCH_CONFIG")]
    config: Option<PathBuf>,

    /// Vespa base URL (overrides the settings file)
    #[arg(long, env = "LISTING_SEARCH_ENDPOINT")]
    endpoint: Option<String>,

    /// Per-request timeout in milliseconds (overrides the settings file)
    #[arg(long, env = "LISTING_SEARCH_REQUEST_TIMEOUT_MS")]
    request_timeout_ms: Option<u64>,

    /// Which embedder turns query text into vectors
    #[arg(long, value_enum, default_value = "hashing", env = "LISTING_SEARCH_EMBEDDER")]
    embedder: EmbedderKind,

    /// Base URL of an Ollama-compatible embedding server
    #[arg(long, default_value = "http://localhost:11434", env = "LISTING_SEARCH_EMBEDDER_URL")]
    embedder_url: String,

    /// Model name sent to the embedding server
    #[arg(long, default_value = "all-minilm", env = "LISTING_SEARCH_EMBEDDER_MODEL")]
    embedder_model: String,

    /// Skip waiting for the store health check
    #[arg(long, default_value_t = false)]
    skip_wait: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum EmbedderKind {
    Hashing,
    Remote,
}

#[derive(Subcommand)]
enum Command {
    /// Block until the store reports healthy.
    Wait,
    /// Feed listings from a JSON-lines file into the store.
    Ingest {
        /// JSON-lines file, one listing per line.
        #[arg(long)]
        input: PathBuf,
        /// Number of writes in flight (overrides the settings file).
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Run one hybrid vector + filter query.
    Search {
        /// Query text
        #[arg(long)]
        query: String,
        #[arg(long)]
        min_price: Option<f64>,
        #[arg(long)]
        max_price: Option<f64>,
        /// Amenity every hit must list, e.g. "WiFi".
        #[arg(long)]
        amenity: Option<String>,
        /// Number of hits to request.
        #[arg(long, default_value = "10")]
        top_k: usize,
        /// Apply filters in the store (pre) or on returned hits (post).
        #[arg(long, default_value = "pre")]
        placement: FilterPlacement,
        /// Print hits as JSON instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::from_file(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::default(),
    };
    if let Some(endpoint) = &cli.endpoint {
        settings.store.endpoint = endpoint.clone();
    }
    if let Some(timeout) = cli.request_timeout_ms {
        settings.store.request_timeout_ms = timeout;
    }
    if let Command::Ingest {
        concurrency: Some(concurrency),
        ..
    } = &cli.command
    {
        settings.ingest.concurrency = *concurrency;
    }
    settings.validate()?;
    Ok(settings)
}

fn build_embedder(cli: &Cli, settings: &Settings) -> anyhow::Result<Arc<dyn Embedder>> {
    let dimensions = settings.schema.dimensions;
    let embedder: Arc<dyn Embedder> = match cli.embedder {
        EmbedderKind::Hashing => Arc::new(HashingEmbedder::new(dimensions)),
        EmbedderKind::Remote => Arc::new(RemoteEmbedder::new(
            &cli.embedder_url,
            cli.embedder_model.clone(),
            dimensions,
            Duration::from_secs(30),
        )?),
    };
    Ok(embedder)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    let store = Arc::new(VespaStore::new(&settings.store, &settings.schema)?);
    let embedder = build_embedder(&cli, &settings)?;

    info!(
        version = app_version,
        endpoint = %settings.store.endpoint,
        started_at = %Utc::now().to_rfc3339(),
        "listing-search boot"
    );

    if !cli.skip_wait || matches!(cli.command, Command::Wait) {
        let gate = ReadinessGate::from_config(&settings.readiness);
        let cancel = async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        };
        gate.await_ready_or_cancel(store.as_ref(), cancel).await?;
    }

    match cli.command {
        Command::Wait => {
            println!("store is ready at {}", settings.store.endpoint);
        }
        Command::Ingest { input, .. } => {
            let source = JsonLinesSource::open(&input)
                .with_context(|| format!("opening {}", input.display()))?;
            let pipeline = IngestionPipeline::new(store, embedder)
                .with_concurrency(settings.ingest.concurrency)
                .with_observer(TracingProgress::new(settings.ingest.progress_every));

            let outcome = pipeline.run_source(source).await;

            for (id, reason) in &outcome.failures {
                warn!(id = %id, reason = %reason, "failed document");
            }
            println!(
                "ingested {}/{} documents ({} failed, success rate {:.1}%) at {}",
                outcome.succeeded,
                outcome.total,
                outcome.failed,
                outcome.success_rate().unwrap_or(0.0) * 100.0,
                Utc::now().to_rfc3339()
            );
        }
        Command::Search {
            query,
            min_price,
            max_price,
            amenity,
            top_k,
            placement,
            json,
        } => {
            let mut search_query = Query::new(query)
                .with_price_range(min_price, max_price)
                .with_top_k(top_k)
                .with_placement(placement);
            if let Some(amenity) = amenity {
                search_query = search_query.with_amenity(amenity);
            }

            let builder = QueryBuilder::new(embedder, settings.schema.clone())
                .with_timeout(settings.store.query_timeout());
            let searcher = HybridSearcher::new(builder, store);
            let hits = searcher.search(&search_query).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
                return Ok(());
            }

            if hits.len() < top_k && placement == FilterPlacement::Post {
                println!(
                    "note: post-filtering kept {} of the top {} hits",
                    hits.len(),
                    top_k
                );
            }
            for hit in hits {
                println!("---");
                println!("[{}] {} score={:.3}", hit.id, hit.name, hit.score);
                if let Some(price) = hit.price {
                    println!("  price=${price}");
                }
                if !hit.space.is_empty() {
                    let preview: String = hit.space.chars().take(200).collect();
                    println!("  space: {preview}");
                }
                if !hit.amenities.is_empty() {
                    let shown: Vec<_> = hit.amenities.iter().take(5).cloned().collect();
                    println!("  amenities: {}", shown.join(", "));
                }
            }
        }
    }

    Ok(())
}
