//! Indexing pipeline orchestration.
//!
//! Coordinates extract → chunk → embed → store for each input file.
//! Chunks are embedded strictly one at a time with a mandatory pause
//! between calls; a chunk whose embedding fails after retries is reported
//! and skipped, never aborting the batch. The collection count gates
//! re-indexing: a non-empty collection is left alone unless `--force`,
//! in which case embeddings of unchanged chunks are reused via their
//! text hashes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use walkdir::WalkDir;

use crate::chunk::chunk_text;
use crate::config::Config;
use crate::db;
use crate::embedding::EmbeddingClient;
use crate::error::PipelineError;
use crate::extract::{self, SUPPORTED_EXTENSIONS};
use crate::models::ChunkMetadata;
use crate::store;

pub async fn run_index(config: &Config, paths: &[PathBuf], force: bool) -> Result<()> {
    let pool = db::connect(&config.db.path).await?;
    let collection = store::ensure_collection(&pool, &config.db.collection).await?;

    let existing = collection.count().await?;
    if existing > 0 && !force {
        println!(
            "Collection '{}' already indexed ({} entries). Use --force to re-index.",
            collection.name(),
            existing
        );
        pool.close().await;
        return Ok(());
    }

    // Embeddings of unchanged chunks survive a forced re-index.
    let cache: HashMap<String, (String, Vec<f32>)> = if force && existing > 0 {
        let cache = collection.embedding_cache().await?;
        collection.clear().await?;
        cache
    } else {
        HashMap::new()
    };

    let embedder = EmbeddingClient::new(&config.embedding)?;
    let pause = Duration::from_secs(config.embedding.bulk_pause_secs);

    let files = collect_files(paths);
    if files.is_empty() {
        println!("No supported files found (pdf, txt, md).");
        pool.close().await;
        return Ok(());
    }

    // Entry ids are keyed by bare file name, so two same-named files
    // would collide mid-run. Reject the batch before any insert.
    if let Some(dup) = duplicate_filename(&files) {
        pool.close().await;
        return Err(PipelineError::Validation(format!(
            "duplicate file name '{}' across input paths; rename one of the files",
            dup
        ))
        .into());
    }

    let mut total_chunks = 0u64;
    let mut total_embedded = 0u64;
    let mut total_reused = 0u64;
    let mut total_skipped = 0u64;

    for path in &files {
        let document = match extract::read_document(path) {
            Ok(doc) => doc,
            Err(e) => {
                eprintln!("Warning: skipping {}: {}", path.display(), e);
                continue;
            }
        };

        let chunks = chunk_text(&document.filename, &document.text, config.chunking.chunk_size);
        total_chunks += chunks.len() as u64;

        let mut ids = Vec::new();
        let mut texts = Vec::new();
        let mut embeddings = Vec::new();
        let mut metadata = Vec::new();

        for chunk in &chunks {
            let id = chunk.id();
            let hash = store::hash_text(&chunk.text);

            let embedding = match cache.get(&id) {
                Some((cached_hash, cached_vec)) if *cached_hash == hash => {
                    total_reused += 1;
                    cached_vec.clone()
                }
                _ => {
                    // Sequential, one call at a time, with a pause between
                    // calls.
                    let result = embedder.embed(&chunk.text).await;
                    tokio::time::sleep(pause).await;
                    match result {
                        Ok(vec) => {
                            total_embedded += 1;
                            vec
                        }
                        Err(e) => {
                            eprintln!("Warning: skipping chunk {}: {}", id, e);
                            total_skipped += 1;
                            continue;
                        }
                    }
                }
            };

            ids.push(id);
            texts.push(chunk.text.clone());
            embeddings.push(embedding);
            metadata.push(ChunkMetadata {
                filename: chunk.filename.clone(),
                chunk_index: chunk.index,
            });
        }

        collection.add(&ids, &texts, &embeddings, &metadata).await?;
        println!(
            "indexed {} ({} chunks)",
            document.filename,
            ids.len()
        );
    }

    println!("index {}", collection.name());
    println!("  files: {}", files.len());
    println!("  chunks: {}", total_chunks);
    println!("  embedded: {}", total_embedded);
    if total_reused > 0 {
        println!("  reused: {}", total_reused);
    }
    if total_skipped > 0 {
        println!("  skipped: {}", total_skipped);
    }
    println!("  total entries: {}", collection.count().await?);
    println!("ok");

    pool.close().await;
    Ok(())
}

/// Expand the given paths into supported files, walking directories.
fn collect_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                if entry.file_type().is_file() && is_supported(entry.path()) {
                    files.push(entry.path().to_path_buf());
                }
            }
        } else {
            files.push(path.clone());
        }
    }
    files
}

/// First file name appearing more than once in `files`, if any.
fn duplicate_filename(files: &[PathBuf]) -> Option<String> {
    let mut seen = std::collections::HashSet::new();
    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        if !seen.insert(name.clone()) {
            return Some(name);
        }
    }
    None
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .map(|e| {
            let ext = e.to_string_lossy().to_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn collects_supported_files_from_directories() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.txt"), "alpha").unwrap();
        fs::write(tmp.path().join("b.md"), "beta").unwrap();
        fs::write(tmp.path().join("c.docx"), "gamma").unwrap();

        let files = collect_files(&[tmp.path().to_path_buf()]);
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| is_supported(f)));
    }

    #[test]
    fn explicit_file_paths_are_kept_as_given() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("doc.txt");
        fs::write(&file, "text").unwrap();
        let files = collect_files(&[file.clone()]);
        assert_eq!(files, vec![file]);
    }

    #[test]
    fn same_named_files_in_different_directories_are_detected() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("a")).unwrap();
        fs::create_dir_all(tmp.path().join("b")).unwrap();
        fs::write(tmp.path().join("a/readme.md"), "one").unwrap();
        fs::write(tmp.path().join("b/readme.md"), "two").unwrap();

        let files = collect_files(&[tmp.path().to_path_buf()]);
        assert_eq!(files.len(), 2);
        assert_eq!(duplicate_filename(&files).as_deref(), Some("readme.md"));
    }

    #[test]
    fn distinct_file_names_pass_the_duplicate_check() {
        let files = vec![
            PathBuf::from("/docs/a.txt"),
            PathBuf::from("/docs/b.txt"),
            PathBuf::from("/notes/c.md"),
        ];
        assert_eq!(duplicate_filename(&files), None);
    }
}
