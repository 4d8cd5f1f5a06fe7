use listing_search_core::{
    Document, Embedder, FilterPlacement, HashingEmbedder, HybridSearcher, IngestionPipeline,
    MemoryStore, Query, QueryBuilder, SchemaConfig,
};
use std::sync::Arc;

const DIMENSIONS: usize = 32;

type TestResult = Result<(), Box<dyn std::error::Error>>;

async fn listing(
    embedder: &HashingEmbedder,
    id: &str,
    name: &str,
    price: f64,
    amenities: &[&str],
) -> Result<Document, Box<dyn std::error::Error>> {
    Ok(Document {
        id: id.to_string(),
        name: name.to_string(),
        space: String::new(),
        amenities: amenities.iter().map(|item| item.to_string()).collect(),
        price,
        embedding: embedder.embed(name).await?,
    })
}

async fn seeded_store() -> Result<Arc<MemoryStore>, Box<dyn std::error::Error>> {
    let embedder = HashingEmbedder::new(DIMENSIONS);
    let store = Arc::new(MemoryStore::new());
    let mut documents = Vec::new();
    for (index, price) in [20.0, 45.0, 50.0, 75.0, 99.0, 120.0, 150.0, 151.0, 300.0, 135.0]
        .into_iter()
        .enumerate()
    {
        let amenities: &[&str] = if index % 2 == 0 { &["WiFi"] } else { &["Kitchen"] };
        documents.push(
            listing(
                &embedder,
                &format!("listing-{index}"),
                &format!("cozy loft number {index}"),
                price,
                amenities,
            )
            .await?,
        );
    }

    let outcome = IngestionPipeline::new(store.clone(), embedder)
        .run(documents)
        .await;
    assert_eq!(outcome.succeeded, 10);
    Ok(store)
}

fn searcher(store: Arc<MemoryStore>) -> HybridSearcher<HashingEmbedder, Arc<MemoryStore>> {
    let schema = SchemaConfig {
        dimensions: DIMENSIONS,
        ..SchemaConfig::default()
    };
    HybridSearcher::new(QueryBuilder::new(HashingEmbedder::new(DIMENSIONS), schema), store)
}

#[tokio::test]
async fn prefiltered_price_range_returns_only_matching_hits() -> TestResult {
    let searcher = searcher(seeded_store().await?);
    let query = Query::new("cozy loft")
        .with_price_range(Some(50.0), Some(150.0))
        .with_top_k(5)
        .with_placement(FilterPlacement::Pre);

    let hits = searcher.search(&query).await?;

    assert!(!hits.is_empty());
    assert!(hits.len() <= 5);
    for hit in &hits {
        let price = hit.price.unwrap_or(-1.0);
        assert!((50.0..=150.0).contains(&price), "{} has price {price}", hit.id);
    }
    Ok(())
}

#[tokio::test]
async fn prefilter_fills_top_k_when_enough_listings_match() -> TestResult {
    let searcher = searcher(seeded_store().await?);
    let query = Query::new("cozy loft")
        .with_price_range(Some(50.0), Some(150.0))
        .with_top_k(5);

    // Six seeded listings fall inside the range.
    assert_eq!(searcher.search(&query).await?.len(), 5);
    Ok(())
}

#[tokio::test]
async fn postfiltered_amenity_may_under_return() -> TestResult {
    let searcher = searcher(seeded_store().await?);
    let query = Query::new("cozy loft")
        .with_amenity("WiFi")
        .with_top_k(4)
        .with_placement(FilterPlacement::Post);

    let hits = searcher.search(&query).await?;

    assert!(hits.len() <= 4);
    assert!(hits
        .iter()
        .all(|hit| hit.amenities.iter().any(|amenity| amenity == "WiFi")));
    Ok(())
}

#[tokio::test]
async fn prefiltered_amenity_fills_from_matching_listings() -> TestResult {
    let searcher = searcher(seeded_store().await?);
    let query = Query::new("cozy loft").with_amenity("WiFi").with_top_k(4);

    let hits = searcher.search(&query).await?;

    assert_eq!(hits.len(), 4);
    assert!(hits
        .iter()
        .all(|hit| hit.amenities.contains(&"WiFi".to_string())));
    Ok(())
}

#[tokio::test]
async fn concurrent_queries_share_one_searcher() -> TestResult {
    let searcher = Arc::new(searcher(seeded_store().await?));
    let mut handles = Vec::new();
    for top_k in 1..=4 {
        let searcher = searcher.clone();
        handles.push(tokio::spawn(async move {
            searcher
                .search(&Query::new("cozy loft").with_top_k(top_k))
                .await
                .map(|hits| (top_k, hits.len()))
        }));
    }

    for handle in handles {
        let (requested, returned) = handle.await??;
        assert_eq!(requested, returned);
    }
    Ok(())
}
