//! Retrieval assembler: builds the bounded context string for a query.
//!
//! The query is embedded, the top-k nearest chunks are fetched from the
//! store, and their blocks are concatenated greedily in similarity order
//! until the approximate token budget would be exceeded. The first block
//! that does not fit is discarded along with everything ranked below it;
//! a block is never partially truncated.

use anyhow::Result;

use crate::config::Config;
use crate::embedding::EmbeddingClient;
use crate::models::ScoredChunk;
use crate::store::VectorCollection;

/// Approximate chars-per-token ratio used for the context budget.
const CHARS_PER_TOKEN: usize = 4;

/// Approximate token count of `text` (ceiling, so any non-empty text
/// costs at least one token).
pub fn approx_token_count(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Embed `query` and assemble a context string from the nearest chunks,
/// bounded by `token_budget`. Returns an empty string when the collection
/// holds no entries.
pub async fn build_context(
    collection: &VectorCollection,
    embedder: &EmbeddingClient,
    config: &Config,
    query: &str,
) -> Result<String> {
    if collection.count().await? == 0 {
        return Ok(String::new());
    }

    let query_vec = embedder.embed(query).await?;
    let results = collection.query(&query_vec, config.retrieval.top_k).await?;

    Ok(assemble_context(&results, config.retrieval.token_budget))
}

/// Greedy, similarity-ranked, budget-bounded concatenation of chunk blocks.
pub fn assemble_context(results: &[ScoredChunk], token_budget: usize) -> String {
    let mut context = String::new();
    let mut used_tokens = 0usize;

    for result in results {
        let block = format!("From document '{}':\n{}\n\n", result.filename, result.text);
        let block_tokens = approx_token_count(&block);
        if used_tokens + block_tokens > token_budget {
            break;
        }
        context.push_str(&block);
        used_tokens += block_tokens;
    }

    context
}
