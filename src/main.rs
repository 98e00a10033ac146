//! # Answermate CLI (`mate`)
//!
//! The `mate` binary is the primary interface for Answermate. It provides
//! commands for database initialization, document indexing, one-shot
//! question answering, interactive chat, index statistics, and weather
//! lookups.
//!
//! ## Usage
//!
//! ```bash
//! mate --config ./config/mate.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `mate init` | Create the SQLite database and the configured collection |
//! | `mate index <paths>` | Extract, chunk, embed, and store documents |
//! | `mate ask "<question>"` | Answer one question over the indexed documents |
//! | `mate chat` | Interactive session with follow-up prompts |
//! | `mate stats` | Show what's indexed |
//! | `mate weather <location>` | Current weather plus a clothing suggestion |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! mate init --config ./config/mate.toml
//!
//! # Index a directory of documents
//! mate index ./docs --config ./config/mate.toml
//!
//! # Re-index after editing a document
//! mate index ./docs --force --config ./config/mate.toml
//!
//! # One-shot question, streamed to the terminal
//! mate ask "what is on line 2?" --config ./config/mate.toml
//!
//! # Interactive chat with follow-ups
//! mate chat --config ./config/mate.toml
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use answermate::{ask, chat, config, db, index, stats, store, weather};

/// Answermate — a retrieval-augmented document chat assistant.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/mate.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "mate",
    about = "Answermate — a retrieval-augmented document chat assistant",
    version,
    long_about = "Answermate indexes local documents (PDF, text, Markdown) into a SQLite \
    vector store and answers questions over them: questions are embedded, the nearest chunks \
    are assembled into a budget-bounded context, and a hosted chat-completions API produces \
    the answer, streamed to the terminal."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/mate.toml`. Database, chunking, retrieval,
    /// embedding, and chat settings are read from this file.
    #[arg(long, global = true, default_value = "./config/mate.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database.
    ///
    /// Creates the SQLite database file and the configured collection.
    /// This command is idempotent — running it multiple times is safe.
    Init,

    /// Index documents into the vector store.
    ///
    /// Extracts text from each file (pdf, txt, md), cuts it into
    /// fixed-size chunks, embeds each chunk sequentially, and stores the
    /// results. A non-empty collection is left untouched unless `--force`
    /// is given.
    Index {
        /// Files or directories to index. Directories are walked
        /// recursively for supported file types.
        paths: Vec<PathBuf>,

        /// Clear the collection and re-index. Embeddings of unchanged
        /// chunks are reused.
        #[arg(long)]
        force: bool,
    },

    /// Answer one question over the indexed documents.
    ///
    /// Embeds the question, assembles a context from the nearest chunks,
    /// and streams the answer to the terminal.
    Ask {
        /// The question to answer.
        question: String,

        /// Print the answer only once it is complete.
        #[arg(long)]
        no_stream: bool,
    },

    /// Start an interactive chat session.
    ///
    /// Each answer is followed by "Do you want more info?"; reply yes/no
    /// or just ask the next question. Type `exit` to quit.
    Chat,

    /// Show index statistics.
    ///
    /// Prints database size and entry counts per document.
    Stats,

    /// Current weather and a clothing suggestion for a location.
    ///
    /// Requires `OPENWEATHER_API_KEY` in the environment; the suggestion
    /// additionally requires `OPENAI_API_KEY`.
    Weather {
        /// Location, e.g. "Syracuse" or "Syracuse, NY".
        location: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg.db.path).await?;
            store::ensure_collection(&pool, &cfg.db.collection).await?;
            pool.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Index { paths, force } => {
            if paths.is_empty() {
                anyhow::bail!("index requires at least one file or directory");
            }
            index::run_index(&cfg, &paths, force).await?;
        }
        Commands::Ask {
            question,
            no_stream,
        } => {
            ask::run_ask(&cfg, &question, no_stream).await?;
        }
        Commands::Chat => {
            chat::run_chat(&cfg).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Weather { location } => {
            let report = weather::current_weather(&cfg, &location).await?;
            println!("Weather in {}:", report.location);
            println!("  Temperature: {}°C", report.temperature);
            println!("  Feels like:  {}°C", report.feels_like);
            println!("  Min/Max:     {}°C / {}°C", report.temp_min, report.temp_max);
            println!("  Humidity:    {}%", report.humidity);
            println!();
            let suggestion = weather::suggest_clothing(&cfg, &report).await?;
            println!("{}", suggestion);
        }
    }

    Ok(())
}
