//! Hosted embeddings client and vector utilities.
//!
//! [`EmbeddingClient`] wraps the OpenAI embeddings endpoint with the shared
//! bounded-retry policy: a fixed delay between attempts and a hard attempt
//! cap, after which the error is returned to the caller (bulk indexing
//! skips the affected chunk rather than aborting).
//!
//! Also provides the vector utilities used by the SQLite-backed store:
//! - [`cosine_similarity`] — similarity between two embedding vectors
//! - [`vec_to_blob`] — encode a `Vec<f32>` as little-endian bytes for BLOB storage
//! - [`blob_to_vec`] — decode a BLOB back into a `Vec<f32>`

use std::time::Duration;

use crate::config::EmbeddingConfig;
use crate::error::PipelineError;
use crate::retry::RetryPolicy;

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

/// Client for the hosted embeddings API.
pub struct EmbeddingClient {
    http: reqwest::Client,
    model: String,
    url: String,
    api_key: String,
    retry: RetryPolicy,
}

impl EmbeddingClient {
    /// Create a client from configuration. Fails if `OPENAI_API_KEY` is
    /// not set in the environment.
    pub fn new(config: &EmbeddingConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            model: config.model.clone(),
            url: config
                .url
                .clone()
                .unwrap_or_else(|| OPENAI_EMBEDDINGS_URL.to_string()),
            api_key,
            retry: RetryPolicy::new(
                config.max_retries,
                Duration::from_secs(config.retry_delay_secs),
            ),
        })
    }

    /// Embed a single text, retrying rate limits and transient failures
    /// up to the configured attempt cap.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        self.retry.run(|| self.embed_once(text)).await
    }

    async fn embed_once(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });

        let resp = self
            .http
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::Transient(e.to_string()))?;

        let status = resp.status();

        if status.is_success() {
            let json: serde_json::Value = resp
                .json()
                .await
                .map_err(|e| PipelineError::Upstream(e.to_string()))?;
            return parse_embedding_response(&json);
        }

        let body_text = resp.text().await.unwrap_or_default();
        if status.as_u16() == 429 {
            Err(PipelineError::RateLimited(format!(
                "embeddings API {}: {}",
                status, body_text
            )))
        } else if status.is_server_error() {
            Err(PipelineError::Transient(format!(
                "embeddings API {}: {}",
                status, body_text
            )))
        } else {
            Err(PipelineError::Upstream(format!(
                "embeddings API {}: {}",
                status, body_text
            )))
        }
    }
}

/// Extract the first `data[].embedding` array from an embeddings response.
fn parse_embedding_response(json: &serde_json::Value) -> Result<Vec<f32>, PipelineError> {
    let embedding = json
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|d| d.first())
        .and_then(|item| item.get("embedding"))
        .and_then(|e| e.as_array())
        .ok_or_else(|| {
            PipelineError::Upstream("invalid embeddings response: missing embedding".to_string())
        })?;

    Ok(embedding
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect())
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`; `0.0` for empty vectors or vectors
/// of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_blob_roundtrip() {
        let vec = vec![1.0f32, -2.5, 3.125, 0.0, -0.001];
        let blob = vec_to_blob(&vec);
        let restored = blob_to_vec(&blob);
        assert_eq!(vec, restored);
    }

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_opposite() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_empty_or_mismatched() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
    }

    #[test]
    fn parses_embedding_from_response() {
        let json = serde_json::json!({
            "data": [{"embedding": [0.1, 0.2, 0.3]}],
            "model": "text-embedding-3-small"
        });
        let vec = parse_embedding_response(&json).unwrap();
        assert_eq!(vec.len(), 3);
        assert!((vec[1] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn missing_embedding_is_upstream_error() {
        let json = serde_json::json!({"data": []});
        let err = parse_embedding_response(&json).unwrap_err();
        assert!(matches!(err, PipelineError::Upstream(_)));
    }
}
