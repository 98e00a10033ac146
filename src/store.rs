//! Vector store adapter over SQLite.
//!
//! A collection is a named set of indexed entries, each holding a chunk of
//! document text, its embedding (little-endian f32 BLOB), and metadata.
//! Similarity search fetches the collection's vectors and ranks them by
//! cosine similarity in Rust; there is no ANN index at this scale.
//!
//! Entry ids follow the `"<filename>chunk<index>"` convention and are
//! unique per collection.

use anyhow::Result;
use sqlx::{Row, SqlitePool};

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::error::PipelineError;
use crate::models::{ChunkMetadata, ScoredChunk};

/// Handle to one named collection in the store.
pub struct VectorCollection {
    pool: SqlitePool,
    name: String,
}

/// Fetch-or-create a collection. Idempotent: the schema and the collection
/// row are created only if missing.
pub async fn ensure_collection(pool: &SqlitePool, name: &str) -> Result<VectorCollection> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS collections (
            name TEXT PRIMARY KEY,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS entries (
            id TEXT NOT NULL,
            collection TEXT NOT NULL,
            filename TEXT NOT NULL,
            chunk_index INTEGER NOT NULL,
            text TEXT NOT NULL,
            hash TEXT NOT NULL,
            embedding BLOB NOT NULL,
            created_at INTEGER NOT NULL,
            PRIMARY KEY (collection, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_entries_collection ON entries(collection)")
        .execute(pool)
        .await?;

    sqlx::query("INSERT OR IGNORE INTO collections (name, created_at) VALUES (?, ?)")
        .bind(name)
        .bind(chrono::Utc::now().timestamp())
        .execute(pool)
        .await?;

    Ok(VectorCollection {
        pool: pool.clone(),
        name: name.to_string(),
    })
}

impl VectorCollection {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a batch of entries. The four slices must have equal length;
    /// a mismatch rejects the whole batch with a validation error and
    /// nothing is inserted. Inserts run in one transaction, so a failure
    /// mid-batch leaves no partial state either.
    pub async fn add(
        &self,
        ids: &[String],
        texts: &[String],
        embeddings: &[Vec<f32>],
        metadata: &[ChunkMetadata],
    ) -> Result<()> {
        if ids.len() != texts.len()
            || ids.len() != embeddings.len()
            || ids.len() != metadata.len()
        {
            return Err(PipelineError::Validation(format!(
                "mismatched batch lengths: {} ids, {} texts, {} embeddings, {} metadata",
                ids.len(),
                texts.len(),
                embeddings.len(),
                metadata.len()
            ))
            .into());
        }

        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        for i in 0..ids.len() {
            sqlx::query(
                r#"
                INSERT INTO entries (id, collection, filename, chunk_index, text, hash, embedding, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&ids[i])
            .bind(&self.name)
            .bind(&metadata[i].filename)
            .bind(metadata[i].chunk_index)
            .bind(&texts[i])
            .bind(hash_text(&texts[i]))
            .bind(vec_to_blob(&embeddings[i]))
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Total entries in the collection. The indexing pipeline uses this
    /// as its idempotency gate.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries WHERE collection = ?")
            .bind(&self.name)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Top-k entries by cosine similarity to `embedding`, descending.
    /// An empty collection yields an empty result set.
    pub async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let rows = sqlx::query(
            "SELECT filename, chunk_index, text, embedding FROM entries WHERE collection = ?",
        )
        .bind(&self.name)
        .fetch_all(&self.pool)
        .await?;

        let mut scored: Vec<ScoredChunk> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let vec = blob_to_vec(&blob);
                ScoredChunk {
                    filename: row.get("filename"),
                    chunk_index: row.get("chunk_index"),
                    text: row.get("text"),
                    similarity: cosine_similarity(embedding, &vec),
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);

        Ok(scored)
    }

    /// Delete every entry in the collection (used by `index --force`).
    pub async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM entries WHERE collection = ?")
            .bind(&self.name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Distinct filenames present in the collection, sorted.
    pub async fn filenames(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT DISTINCT filename FROM entries WHERE collection = ? ORDER BY filename",
        )
        .bind(&self.name)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(|r| r.get("filename")).collect())
    }

    /// Entry count per filename, sorted by filename.
    pub async fn entry_counts(&self) -> Result<Vec<(String, i64)>> {
        let rows = sqlx::query(
            r#"
            SELECT filename, COUNT(*) AS entries
            FROM entries WHERE collection = ?
            GROUP BY filename ORDER BY filename
            "#,
        )
        .bind(&self.name)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|r| (r.get("filename"), r.get("entries")))
            .collect())
    }

    /// Reconstruct a document's full text by concatenating its chunks in
    /// index order. Exact because chunking is lossless.
    pub async fn document_text(&self, filename: &str) -> Result<String> {
        let rows = sqlx::query(
            r#"
            SELECT text FROM entries
            WHERE collection = ? AND filename = ?
            ORDER BY chunk_index
            "#,
        )
        .bind(&self.name)
        .bind(filename)
        .fetch_all(&self.pool)
        .await?;

        let mut out = String::new();
        for row in &rows {
            let text: String = row.get("text");
            out.push_str(&text);
        }
        Ok(out)
    }

    /// Stored (hash, embedding) pairs keyed by entry id, used to reuse
    /// embeddings for unchanged chunks on re-index.
    pub async fn embedding_cache(
        &self,
    ) -> Result<std::collections::HashMap<String, (String, Vec<f32>)>> {
        let rows = sqlx::query("SELECT id, hash, embedding FROM entries WHERE collection = ?")
            .bind(&self.name)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                (
                    row.get::<String, _>("id"),
                    (row.get::<String, _>("hash"), blob_to_vec(&blob)),
                )
            })
            .collect())
    }
}

/// SHA-256 of chunk text, used for staleness detection on re-index.
pub fn hash_text(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
