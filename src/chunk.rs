//! Fixed-size text chunker.
//!
//! Splits document text into [`Chunk`]s of at most `chunk_size` characters
//! with no gaps and no overlap. Splitting is purely positional (it can cut
//! mid-word), which keeps it lossless: concatenating a document's chunks in
//! index order reproduces the original text exactly.

use crate::models::Chunk;

/// Split `text` into chunks of at most `chunk_size` characters.
/// The final chunk may be shorter; empty text yields no chunks.
pub fn chunk_text(filename: &str, text: &str, chunk_size: usize) -> Vec<Chunk> {
    debug_assert!(chunk_size > 0, "chunk_size validated at config load");

    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut index: i64 = 0;

    while start < text.len() {
        let mut end = start;
        let mut taken = 0usize;
        for (offset, ch) in text[start..].char_indices() {
            if taken == chunk_size {
                end = start + offset;
                break;
            }
            taken += 1;
            end = start + offset + ch.len_utf8();
        }

        chunks.push(Chunk {
            filename: filename.to_string(),
            index,
            text: text[start..end].to_string(),
        });
        index += 1;
        start = end;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk_text("a.txt", "", 1000).is_empty());
    }

    #[test]
    fn short_text_single_chunk() {
        let chunks = chunk_text("a.txt", "Hello, world!", 1000);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].text, "Hello, world!");
    }

    #[test]
    fn concatenation_reconstructs_original() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(40);
        let chunks = chunk_text("a.txt", &text, 100);
        let rebuilt: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn chunk_count_is_ceiling_of_chars_over_size() {
        for (len, size, expected) in [(10, 3, 4), (9, 3, 3), (1, 1000, 1), (1000, 1000, 1)] {
            let text = "x".repeat(len);
            let chunks = chunk_text("a.txt", &text, size);
            assert_eq!(chunks.len(), expected, "len={} size={}", len, size);
        }
    }

    #[test]
    fn chunks_cut_by_characters_not_bytes() {
        // Multi-byte characters must never be split.
        let text = "héllo wörld ümlaut".repeat(10);
        let chunks = chunk_text("a.txt", &text, 7);
        let rebuilt: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(rebuilt, text);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 7);
        }
    }

    #[test]
    fn indices_are_contiguous_from_zero() {
        let chunks = chunk_text("a.txt", &"y".repeat(250), 100);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i as i64);
            assert_eq!(chunk.filename, "a.txt");
        }
    }

    #[test]
    fn final_chunk_may_be_shorter() {
        let chunks = chunk_text("a.txt", &"z".repeat(25), 10);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].text.len(), 5);
    }
}
