//! Conversation controller: history, memory windows, and the follow-up
//! state machine.
//!
//! A [`ChatSession`] owns the append-only message history and the current
//! [`BotState`]. Answer generation is behind the [`Answerer`] trait so the
//! state machine can be driven without network access; the production
//! implementation is [`RagAnswerer`], which routes line-number and
//! "document" questions locally and everything else through retrieval
//! plus the completion API.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::completion::CompletionClient;
use crate::config::Config;
use crate::context;
use crate::embedding::EmbeddingClient;
use crate::error::PipelineError;
use crate::models::{ChatMessage, Role};
use crate::store;

/// Appended after every answered question.
pub const MORE_INFO_PROMPT: &str = "Do you want more info?";

/// Appended when the user declines more info.
pub const NEXT_QUESTION_PROMPT: &str = "What other question can I help you with?";

/// Canned elaboration for a "yes" reply.
pub const MORE_INFO_TEXT: &str = "Here's some more information: you can ask me about specific \
lines of the document, request a summary, or follow up on any detail from the retrieved context.";

/// Reported when a question arrives before any document was indexed.
pub const EMPTY_STORE_MESSAGE: &str =
    "The vector DB is not initialized. Please index a document before asking questions.";

/// Reply for a line question whose line cannot be resolved.
pub const LINE_NOT_FOUND: &str = "I'm sorry, I couldn't find that line in the document. Please \
specify a valid line number.";

/// Follow-up dialogue state. The session starts in `Initial`; there is no
/// terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotState {
    Initial,
    WaitingForMoreInfo,
    WaitingForQuestion,
}

/// History window applied when building completion messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryStrategy {
    /// Keep the last N exchanges (2N messages).
    Buffer(usize),
    /// Keep messages fitting an approximate token cap, newest first.
    TokenBuffer(usize),
}

impl MemoryStrategy {
    /// Resolve the configured strategy name. `summary` currently applies
    /// the buffer window; see DESIGN.md.
    pub fn from_config(config: &Config) -> Self {
        match config.chat.memory.as_str() {
            "token-buffer" => MemoryStrategy::TokenBuffer(config.chat.token_buffer),
            _ => MemoryStrategy::Buffer(config.chat.buffer_turns),
        }
    }

    /// The suffix of `history` this strategy retains.
    pub fn window<'a>(&self, history: &'a [ChatMessage]) -> &'a [ChatMessage] {
        match *self {
            MemoryStrategy::Buffer(turns) => {
                let keep = turns * 2;
                let start = history.len().saturating_sub(keep);
                &history[start..]
            }
            MemoryStrategy::TokenBuffer(max_tokens) => {
                let mut used = 0usize;
                let mut start = history.len();
                for (i, msg) in history.iter().enumerate().rev() {
                    let cost = context::approx_token_count(&msg.content);
                    if used + cost > max_tokens {
                        break;
                    }
                    used += cost;
                    start = i;
                }
                &history[start..]
            }
        }
    }
}

/// Produces an answer to a question, given the retained history window.
#[async_trait]
pub trait Answerer {
    async fn answer(
        &mut self,
        question: &str,
        history: &[ChatMessage],
    ) -> Result<String, PipelineError>;
}

/// One user's conversation: append-only history plus follow-up state.
pub struct ChatSession {
    pub history: Vec<ChatMessage>,
    pub state: BotState,
    memory: MemoryStrategy,
}

impl ChatSession {
    pub fn new(memory: MemoryStrategy) -> Self {
        Self {
            history: Vec::new(),
            state: BotState::Initial,
            memory,
        }
    }

    /// Process one user input and return the assistant messages appended
    /// this turn.
    ///
    /// Transitions:
    /// - yes/y while waiting for more info: canned elaboration plus the
    ///   prompt again (two messages), state unchanged.
    /// - no/n while waiting for more info: next-question prompt, move to
    ///   `WaitingForQuestion`.
    /// - anything else (from any state): answer the question, append the
    ///   prompt, move to `WaitingForMoreInfo`.
    ///
    /// A `MissingPrecondition` from the answerer is surfaced as a warning
    /// message with no state transition; the session remains usable.
    pub async fn process_input(
        &mut self,
        input: &str,
        answerer: &mut dyn Answerer,
    ) -> Result<Vec<String>, PipelineError> {
        self.history.push(ChatMessage::user(input));

        let lower = input.trim().to_lowercase();
        let answering_followup = self.state == BotState::WaitingForMoreInfo
            && matches!(lower.as_str(), "yes" | "y" | "no" | "n");

        let replies = if answering_followup {
            if matches!(lower.as_str(), "yes" | "y") {
                vec![MORE_INFO_TEXT.to_string(), MORE_INFO_PROMPT.to_string()]
            } else {
                self.state = BotState::WaitingForQuestion;
                vec![NEXT_QUESTION_PROMPT.to_string()]
            }
        } else {
            // New question, regardless of previous state.
            self.state = BotState::Initial;
            let window = self.memory.window(&self.history);
            match answerer.answer(input, window).await {
                Ok(answer) => {
                    self.state = BotState::WaitingForMoreInfo;
                    vec![answer, MORE_INFO_PROMPT.to_string()]
                }
                Err(PipelineError::MissingPrecondition(msg)) => vec![msg],
                Err(e) => return Err(e),
            }
        };

        for reply in &replies {
            self.history.push(ChatMessage::assistant(reply));
        }
        Ok(replies)
    }
}

/// Production answerer: canned local routes first, then retrieval plus
/// the completion API.
pub struct RagAnswerer<'a> {
    config: &'a Config,
    pool: &'a SqlitePool,
}

impl<'a> RagAnswerer<'a> {
    pub fn new(config: &'a Config, pool: &'a SqlitePool) -> Self {
        Self { config, pool }
    }
}

#[async_trait]
impl Answerer for RagAnswerer<'_> {
    async fn answer(
        &mut self,
        question: &str,
        history: &[ChatMessage],
    ) -> Result<String, PipelineError> {
        let collection = store::ensure_collection(self.pool, &self.config.db.collection)
            .await
            .map_err(|e| PipelineError::Upstream(e.to_string()))?;

        if collection
            .count()
            .await
            .map_err(|e| PipelineError::Upstream(e.to_string()))?
            == 0
        {
            return Err(PipelineError::MissingPrecondition(
                EMPTY_STORE_MESSAGE.to_string(),
            ));
        }

        let lower = question.to_lowercase();

        // Line lookups are answered from the reconstructed document text,
        // no model call involved. A "line" question without a parsable
        // number gets the apology rather than a model answer.
        if lower.contains("line") {
            let line_number = match extract_line_number(question) {
                Some(n) => n,
                None => return Ok(LINE_NOT_FOUND.to_string()),
            };
            let filenames = collection
                .filenames()
                .await
                .map_err(|e| PipelineError::Upstream(e.to_string()))?;
            // Single-document sessions are the normal case; with
            // several documents the first by name is used.
            let filename = filenames
                .first()
                .ok_or_else(|| {
                    PipelineError::MissingPrecondition(EMPTY_STORE_MESSAGE.to_string())
                })?
                .clone();
            let text = collection
                .document_text(&filename)
                .await
                .map_err(|e| PipelineError::Upstream(e.to_string()))?;
            return Ok(answer_line_question(&text, line_number));
        }

        if lower.contains("document") {
            return Ok(
                "This document contains important information. You can ask me about specific \
                 lines or details."
                    .to_string(),
            );
        }

        let embedder = EmbeddingClient::new(&self.config.embedding)
            .map_err(|e| PipelineError::Upstream(e.to_string()))?;
        let completer = CompletionClient::new(&self.config.chat)
            .map_err(|e| PipelineError::Upstream(e.to_string()))?;

        let ctx = context::build_context(&collection, &embedder, self.config, question)
            .await
            .map_err(|e| match e.downcast::<PipelineError>() {
                Ok(pe) => pe,
                Err(other) => PipelineError::Upstream(other.to_string()),
            })?;

        let mut messages = vec![ChatMessage::system(&self.config.chat.system_prompt)];
        // Prior turns within the memory window, minus the just-pushed
        // user question which is re-sent with the context attached.
        let prior = &history[..history.len().saturating_sub(1)];
        for msg in prior.iter().filter(|m| m.role != Role::System) {
            messages.push(msg.clone());
        }
        messages.push(ChatMessage::user(format!(
            "Context:\n{}\n\nQuestion: {}",
            ctx, question
        )));

        completer.complete(&messages, None).await
    }
}

/// Run the interactive chat loop on stdin/stdout. Errors from a single
/// turn are printed and the session continues; EOF or `exit` ends it.
pub async fn run_chat(config: &Config) -> Result<()> {
    use std::io::{BufRead, Write};

    let pool = crate::db::connect(&config.db.path).await?;
    let mut session = ChatSession::new(MemoryStrategy::from_config(config));
    let mut answerer = RagAnswerer::new(config, &pool);

    println!("Ask a question about your documents (exit to quit).");

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "exit" || input == "quit" {
            break;
        }

        match session.process_input(input, &mut answerer).await {
            Ok(replies) => {
                for reply in replies {
                    println!("{}", reply);
                }
            }
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    pool.close().await;
    Ok(())
}

/// First standalone number in the question, 1-based as users phrase it,
/// returned as a 0-based index.
pub fn extract_line_number(question: &str) -> Option<usize> {
    question
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_ascii_digit()))
        .find_map(|word| {
            if word.is_empty() {
                None
            } else {
                word.parse::<usize>().ok()
            }
        })
        .and_then(|n| n.checked_sub(1))
}

/// Answer a "what is on line N" question against reconstructed text.
pub fn answer_line_question(document: &str, line_index: usize) -> String {
    match document.lines().nth(line_index) {
        Some(line) => format!("The content on line {} is: {}", line_index + 1, line),
        None => LINE_NOT_FOUND.to_string(),
    }
}
