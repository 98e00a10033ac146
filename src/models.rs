//! Core data models used throughout Answermate.
//!
//! These types represent the documents, chunks, and chat turns that flow
//! through the indexing and retrieval pipeline.

use serde::Serialize;

/// A source document: raw text plus its identifying filename.
/// Immutable once extracted.
#[derive(Debug, Clone)]
pub struct Document {
    pub filename: String,
    pub text: String,
}

/// A contiguous fixed-size slice of a document's text. Concatenating a
/// document's chunks in index order reconstructs the original text exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub filename: String,
    pub index: i64,
    pub text: String,
}

impl Chunk {
    /// Identity key of the indexed entry, unique per collection.
    pub fn id(&self) -> String {
        format!("{}chunk{}", self.filename, self.index)
    }
}

/// Metadata stored alongside an indexed entry.
#[derive(Debug, Clone)]
pub struct ChunkMetadata {
    pub filename: String,
    pub chunk_index: i64,
}

/// A retrieval result: a stored chunk with its cosine similarity to the
/// query embedding.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub filename: String,
    pub chunk_index: i64,
    pub text: String,
    pub similarity: f32,
}

/// Who authored a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn of conversation history, in the shape the chat-completions
/// API expects.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_id_composes_filename_and_index() {
        let chunk = Chunk {
            filename: "syllabus.pdf".to_string(),
            index: 2,
            text: "text".to_string(),
        };
        assert_eq!(chunk.id(), "syllabus.pdfchunk2");
    }

    #[test]
    fn role_serializes_lowercase() {
        let msg = ChatMessage::user("hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "hi");
    }
}
