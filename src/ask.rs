//! One-shot question answering.
//!
//! `mate ask "<question>"` runs the retrieval pipeline once without the
//! follow-up state machine: embed the question, assemble the bounded
//! context, and stream the answer to stdout as it arrives.

use anyhow::Result;
use std::io::Write;

use crate::completion::CompletionClient;
use crate::config::Config;
use crate::context;
use crate::db;
use crate::embedding::EmbeddingClient;
use crate::models::ChatMessage;
use crate::store;

pub async fn run_ask(config: &Config, question: &str, no_stream: bool) -> Result<()> {
    let pool = db::connect(&config.db.path).await?;
    let collection = store::ensure_collection(&pool, &config.db.collection).await?;

    if collection.count().await? == 0 {
        println!("The vector DB is not initialized. Run `mate index <files>` first.");
        pool.close().await;
        return Ok(());
    }

    let embedder = EmbeddingClient::new(&config.embedding)?;
    let completer = CompletionClient::new(&config.chat)?;

    let ctx = context::build_context(&collection, &embedder, config, question).await?;

    let messages = vec![
        ChatMessage::system(&config.chat.system_prompt),
        ChatMessage::user(format!("Context:\n{}\n\nQuestion: {}", ctx, question)),
    ];

    if no_stream || !config.chat.stream {
        let answer = completer.complete(&messages, None).await?;
        println!("{}", answer);
    } else {
        // Print fragments as they arrive; the full buffer is also the
        // return value once the stream ends.
        let print_delta = |delta: &str, _buffer: &str| {
            print!("{}", delta);
            let _ = std::io::stdout().flush();
        };
        completer.complete(&messages, Some(&print_delta)).await?;
        println!();
    }

    pool.close().await;
    Ok(())
}
