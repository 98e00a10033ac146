//! # Answermate
//!
//! A retrieval-augmented document chat assistant.
//!
//! Answermate indexes local documents (PDF, text, Markdown) into a SQLite
//! vector store, then answers questions over them: each question is
//! embedded, the nearest chunks are assembled into a budget-bounded
//! context block, and a hosted chat-completions API produces the answer,
//! streamed to the terminal as it arrives.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────────┐   ┌───────────┐
//! │ Documents │──▶│   Pipeline    │──▶│  SQLite   │
//! │ pdf/txt/md│   │ Chunk+Embed  │   │  vectors  │
//! └───────────┘   └──────────────┘   └─────┬─────┘
//!                                          │
//!                     ┌────────────────────┤
//!                     ▼                    ▼
//!                ┌──────────┐       ┌────────────┐
//!                │   ask    │       │    chat    │
//!                │ one-shot │       │ follow-ups │
//!                └──────────┘       └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! mate init                     # create database
//! mate index ./docs             # extract, chunk, embed, store
//! mate ask "what is chapter 2 about?"
//! mate chat                     # interactive session with follow-ups
//! mate stats                    # what's indexed
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Pipeline error taxonomy |
//! | [`retry`] | Bounded fixed-delay retry policy |
//! | [`extract`] | Document text extraction |
//! | [`chunk`] | Fixed-size lossless chunking |
//! | [`embedding`] | Embeddings API client and vector math |
//! | [`store`] | SQLite vector collection |
//! | [`context`] | Budget-bounded context assembly |
//! | [`completion`] | Chat-completions client with streaming |
//! | [`chat`] | Conversation state machine |
//! | [`index`] | Indexing pipeline orchestration |
//! | [`weather`] | Weather lookup and clothing suggestions |
//! | [`db`] | Database connection |

pub mod ask;
pub mod chat;
pub mod chunk;
pub mod completion;
pub mod config;
pub mod context;
pub mod db;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod index;
pub mod models;
pub mod retry;
pub mod stats;
pub mod store;
pub mod weather;
