use super::*;
use crate::config::CollectionConfig;
use tempfile::TempDir;

fn test_collection() -> (CollectionConfig, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = CollectionConfig {
        name: "test_collection".to_string(),
        data_dir: temp_dir.path().join("vectors"),
        ..CollectionConfig::default()
    };
    (config, temp_dir)
}

fn test_document(id: &str, seed: f32) -> StoredDocument {
    StoredDocument {
        id: id.to_string(),
        vector: vec![seed, seed + 0.1, seed + 0.2, seed + 0.3],
        content: format!("Test content for {}", id),
        source_id: "https://example.com/a".to_string(),
        heading: "Intro".to_string(),
        section_type: "h1".to_string(),
        chunk_index: 0,
    }
}

#[tokio::test]
async fn connect_creates_empty_collection() {
    let (config, _temp_dir) = test_collection();

    let store = VectorStore::connect(&config)
        .await
        .expect("should create vector store");

    assert_eq!(store.table_name, "test_collection");
    assert_eq!(store.count().await.expect("count should succeed"), 0);
}

#[tokio::test]
async fn add_batch_then_search_returns_metadata() {
    let (config, _temp_dir) = test_collection();
    let mut store = VectorStore::connect(&config)
        .await
        .expect("should create vector store");

    let documents = vec![test_document("doc_0_0_0", 0.1), test_document("doc_0_0_1", 0.9)];
    store
        .add_batch(&documents)
        .await
        .expect("add_batch should succeed");

    assert_eq!(store.count().await.expect("count should succeed"), 2);

    let results = store
        .search(&[0.1, 0.2, 0.3, 0.4], 5)
        .await
        .expect("search should succeed");

    assert_eq!(results.len(), 2);
    let nearest = &results[0];
    assert_eq!(nearest.source_id, "https://example.com/a");
    assert_eq!(nearest.heading, "Intro");
    assert_eq!(nearest.section_type, "h1");
    assert_eq!(nearest.content, "Test content for doc_0_0_0");
}

#[tokio::test]
async fn search_results_are_ranked_by_distance() {
    let (config, _temp_dir) = test_collection();
    let mut store = VectorStore::connect(&config)
        .await
        .expect("should create vector store");

    let documents = vec![
        test_document("near", 0.1),
        test_document("far", 5.0),
        test_document("middle", 1.0),
    ];
    store
        .add_batch(&documents)
        .await
        .expect("add_batch should succeed");

    let results = store
        .search(&[0.1, 0.2, 0.3, 0.4], 3)
        .await
        .expect("search should succeed");

    assert_eq!(results.len(), 3);
    assert!(results[0].distance <= results[1].distance);
    assert!(results[1].distance <= results[2].distance);
    assert_eq!(results[0].content, "Test content for near");
}

#[tokio::test]
async fn search_respects_limit() {
    let (config, _temp_dir) = test_collection();
    let mut store = VectorStore::connect(&config)
        .await
        .expect("should create vector store");

    let documents: Vec<StoredDocument> = (0..10)
        .map(|i| test_document(&format!("doc_{}", i), i as f32 * 0.1))
        .collect();
    store
        .add_batch(&documents)
        .await
        .expect("add_batch should succeed");

    let results = store
        .search(&[0.0, 0.1, 0.2, 0.3], 3)
        .await
        .expect("search should succeed");

    assert_eq!(results.len(), 3);
}

#[tokio::test]
async fn search_on_empty_collection_returns_nothing() {
    let (config, _temp_dir) = test_collection();
    let store = VectorStore::connect(&config)
        .await
        .expect("should create vector store");

    // The placeholder schema has 768 dimensions until the first insert.
    let query = vec![0.0f32; 768];
    let results = store
        .search(&query, 5)
        .await
        .expect("search should succeed");

    assert!(results.is_empty());
}

#[tokio::test]
async fn reset_clears_the_collection() {
    let (config, _temp_dir) = test_collection();
    let mut store = VectorStore::connect(&config)
        .await
        .expect("should create vector store");

    store
        .add_batch(&[test_document("doc_0_0_0", 0.2)])
        .await
        .expect("add_batch should succeed");
    assert_eq!(store.count().await.expect("count should succeed"), 1);

    store.reset().await.expect("reset should succeed");

    assert_eq!(store.count().await.expect("count should succeed"), 0);
}

#[tokio::test]
async fn dimension_change_recreates_table() {
    let (config, _temp_dir) = test_collection();
    let mut store = VectorStore::connect(&config)
        .await
        .expect("should create vector store");

    store
        .add_batch(&[test_document("four_dims", 0.2)])
        .await
        .expect("add_batch should succeed");

    let wider = StoredDocument {
        vector: vec![0.1; 8],
        ..test_document("eight_dims", 0.0)
    };
    store
        .add_batch(&[wider])
        .await
        .expect("add_batch with new dimension should succeed");

    // The narrower documents were dropped with the old table.
    assert_eq!(store.count().await.expect("count should succeed"), 1);
}

#[tokio::test]
async fn mixed_dimension_batch_is_rejected() {
    let (config, _temp_dir) = test_collection();
    let mut store = VectorStore::connect(&config)
        .await
        .expect("should create vector store");

    let mismatched = StoredDocument {
        vector: vec![0.1; 8],
        ..test_document("bad", 0.0)
    };
    let result = store
        .add_batch(&[test_document("good", 0.1), mismatched])
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn reopening_detects_existing_dimension() {
    let (config, _temp_dir) = test_collection();

    {
        let mut store = VectorStore::connect(&config)
            .await
            .expect("should create vector store");
        store
            .add_batch(&[test_document("doc", 0.3)])
            .await
            .expect("add_batch should succeed");
    }

    let store = VectorStore::connect(&config)
        .await
        .expect("should reopen vector store");
    assert_eq!(store.vector_dimension, Some(4));
    assert_eq!(store.count().await.expect("count should succeed"), 1);
}
