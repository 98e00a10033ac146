//! End-to-end pipeline tests against a real SQLite file.
//!
//! Everything here runs offline: entries are stored with hand-made
//! embeddings, and questions are routed through the local answer paths
//! (line lookups, empty-store handling) that never touch the network.

use std::io::Write;
use std::path::Path;

use answermate::chat::{
    BotState, ChatSession, MemoryStrategy, RagAnswerer, EMPTY_STORE_MESSAGE, LINE_NOT_FOUND,
    MORE_INFO_PROMPT,
};
use answermate::chunk::chunk_text;
use answermate::config::{load_config, Config};
use answermate::db;
use answermate::models::ChunkMetadata;
use answermate::store;

fn test_config(db_path: &Path) -> Config {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "[db]\npath = \"{}\"\ncollection = \"docs\"\n",
        db_path.display()
    )
    .unwrap();
    load_config(file.path()).unwrap()
}

/// A unit vector pointing along one axis, good enough for ranking tests.
fn axis_embedding(axis: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; 4];
    v[axis] = 1.0;
    v
}

#[tokio::test]
async fn ensure_collection_is_idempotent() {
    let tmp = tempfile::tempdir().unwrap();
    let pool = db::connect(&tmp.path().join("mate.sqlite")).await.unwrap();

    let first = store::ensure_collection(&pool, "docs").await.unwrap();
    let second = store::ensure_collection(&pool, "docs").await.unwrap();
    assert_eq!(first.name(), second.name());
    assert_eq!(first.count().await.unwrap(), 0);

    pool.close().await;
}

#[tokio::test]
async fn add_count_and_query_rank_by_similarity() {
    let tmp = tempfile::tempdir().unwrap();
    let pool = db::connect(&tmp.path().join("mate.sqlite")).await.unwrap();
    let collection = store::ensure_collection(&pool, "docs").await.unwrap();

    let ids = vec![
        "notes.txtchunk0".to_string(),
        "notes.txtchunk1".to_string(),
        "notes.txtchunk2".to_string(),
    ];
    let texts = vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()];
    let embeddings = vec![axis_embedding(0), axis_embedding(1), axis_embedding(2)];
    let metadata: Vec<ChunkMetadata> = (0..3)
        .map(|i| ChunkMetadata {
            filename: "notes.txt".to_string(),
            chunk_index: i,
        })
        .collect();

    collection
        .add(&ids, &texts, &embeddings, &metadata)
        .await
        .unwrap();
    assert_eq!(collection.count().await.unwrap(), 3);

    // Every column is populated, including the insertion timestamp.
    let created: i64 =
        sqlx::query_scalar("SELECT created_at FROM entries WHERE id = 'notes.txtchunk0'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(created > 0);

    // A query along axis 1 must rank "beta" first.
    let results = collection.query(&axis_embedding(1), 2).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].text, "beta");
    assert!(results[0].similarity > results[1].similarity);

    pool.close().await;
}

#[tokio::test]
async fn mismatched_batch_is_rejected_without_partial_insert() {
    let tmp = tempfile::tempdir().unwrap();
    let pool = db::connect(&tmp.path().join("mate.sqlite")).await.unwrap();
    let collection = store::ensure_collection(&pool, "docs").await.unwrap();

    let ids = vec!["a".to_string(), "b".to_string()];
    let texts = vec!["only one".to_string()];
    let embeddings = vec![axis_embedding(0), axis_embedding(1)];
    let metadata = vec![
        ChunkMetadata {
            filename: "f".to_string(),
            chunk_index: 0,
        },
        ChunkMetadata {
            filename: "f".to_string(),
            chunk_index: 1,
        },
    ];

    let err = collection
        .add(&ids, &texts, &embeddings, &metadata)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("mismatched batch lengths"));
    assert_eq!(collection.count().await.unwrap(), 0);

    pool.close().await;
}

#[tokio::test]
async fn document_text_reconstructs_original_exactly() {
    let tmp = tempfile::tempdir().unwrap();
    let pool = db::connect(&tmp.path().join("mate.sqlite")).await.unwrap();
    let collection = store::ensure_collection(&pool, "docs").await.unwrap();

    let original = "First line.\nSecond line.\nThird line with more text.";
    let chunks = chunk_text("doc.txt", original, 10);

    let ids: Vec<String> = chunks.iter().map(|c| c.id()).collect();
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let embeddings: Vec<Vec<f32>> = chunks.iter().map(|_| axis_embedding(0)).collect();
    let metadata: Vec<ChunkMetadata> = chunks
        .iter()
        .map(|c| ChunkMetadata {
            filename: c.filename.clone(),
            chunk_index: c.index,
        })
        .collect();

    collection
        .add(&ids, &texts, &embeddings, &metadata)
        .await
        .unwrap();

    let rebuilt = collection.document_text("doc.txt").await.unwrap();
    assert_eq!(rebuilt, original);

    pool.close().await;
}

#[tokio::test]
async fn line_question_is_answered_from_the_store() {
    let tmp = tempfile::tempdir().unwrap();
    let db_path = tmp.path().join("mate.sqlite");
    let pool = db::connect(&db_path).await.unwrap();
    let config = test_config(&db_path);
    let collection = store::ensure_collection(&pool, &config.db.collection)
        .await
        .unwrap();

    let original = "A\nB\nC";
    let chunks = chunk_text("doc.txt", original, 2);
    let ids: Vec<String> = chunks.iter().map(|c| c.id()).collect();
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let embeddings: Vec<Vec<f32>> = chunks.iter().map(|_| axis_embedding(0)).collect();
    let metadata: Vec<ChunkMetadata> = chunks
        .iter()
        .map(|c| ChunkMetadata {
            filename: c.filename.clone(),
            chunk_index: c.index,
        })
        .collect();
    collection
        .add(&ids, &texts, &embeddings, &metadata)
        .await
        .unwrap();

    let mut session = ChatSession::new(MemoryStrategy::from_config(&config));
    let mut answerer = RagAnswerer::new(&config, &pool);

    let replies = session
        .process_input("what is on line 2", &mut answerer)
        .await
        .unwrap();
    assert_eq!(replies[0], "The content on line 2 is: B");
    assert_eq!(replies[1], MORE_INFO_PROMPT);
    assert_eq!(session.state, BotState::WaitingForMoreInfo);

    // A line question without a number is apologized for locally, never
    // sent to the completion API.
    let replies = session
        .process_input("which line is it", &mut answerer)
        .await
        .unwrap();
    assert_eq!(replies[0], LINE_NOT_FOUND);

    pool.close().await;
}

#[tokio::test]
async fn question_before_indexing_warns_without_transition() {
    let tmp = tempfile::tempdir().unwrap();
    let db_path = tmp.path().join("mate.sqlite");
    let pool = db::connect(&db_path).await.unwrap();
    let config = test_config(&db_path);
    store::ensure_collection(&pool, &config.db.collection)
        .await
        .unwrap();

    let mut session = ChatSession::new(MemoryStrategy::from_config(&config));
    let mut answerer = RagAnswerer::new(&config, &pool);

    let replies = session
        .process_input("what is on line 2", &mut answerer)
        .await
        .unwrap();
    assert_eq!(replies, vec![EMPTY_STORE_MESSAGE.to_string()]);
    assert_eq!(session.state, BotState::Initial);

    pool.close().await;
}
