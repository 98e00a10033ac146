//! Index statistics overview.
//!
//! Provides a quick summary of what's indexed: entry counts per document
//! and database size. Used by `mate stats` to give confidence that an
//! index run stored what it was supposed to.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::store;

/// Run the stats command: query the store and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(&config.db.path).await?;
    let collection = store::ensure_collection(&pool, &config.db.collection).await?;

    let total = collection.count().await?;
    let per_file = collection.entry_counts().await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Answermate — Index Stats");
    println!("========================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!("  Collection:  {}", collection.name());
    println!();
    println!("  Documents:   {}", per_file.len());
    println!("  Entries:     {}", total);

    if !per_file.is_empty() {
        println!();
        println!("  By document:");
        println!("  {:<40} {:>8}", "DOCUMENT", "CHUNKS");
        println!("  {}", "-".repeat(50));
        for (filename, entries) in &per_file {
            println!("  {:<40} {:>8}", filename, entries);
        }
    }

    println!();

    pool.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
