//! # Folio CLI (`folio`)
//!
//! The `folio` binary ingests portfolio material into a vector index,
//! answers questions from the command line, and serves the chat API.
//!
//! ## Usage
//!
//! ```bash
//! folio --config ./config/folio.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `folio chunk <path>` | Print the chunks produced for a file or directory |
//! | `folio ingest <path>` | Chunk, embed and upsert documents and structured content |
//! | `folio ask "<question>"` | Answer one question with empty history |
//! | `folio serve` | Start the HTTP chat server |
//!
//! ## Examples
//!
//! ```bash
//! # Inspect chunking of a resume before ingesting it
//! folio chunk ./content/resume.pdf
//!
//! # Ingest a directory, skipping unreadable files
//! folio ingest ./content --keep-going
//!
//! # Ask a question
//! folio ask "What did you work on at Acme Corp?"
//! ```

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use portfolio_rag::config;
use portfolio_rag::ingest::{self, IngestOptions};
use portfolio_rag::orchestrator::Assistant;
use portfolio_rag::server;

/// Folio — a retrieval-augmented assistant that answers questions about a
/// portfolio owner.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. Credentials come from `OPENAI_API_KEY`, `ANTHROPIC_API_KEY` and
/// `PINECONE_API_KEY`.
#[derive(Parser)]
#[command(
    name = "folio",
    about = "Folio — answer questions about a portfolio from its documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/folio.toml`. A missing file at the default
    /// location means "use built-in defaults".
    #[arg(long, global = true, default_value = "./config/folio.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Print the chunks produced for a file or directory.
    ///
    /// Makes no backend calls. Useful for tuning `[chunking]`.
    Chunk {
        /// File or directory to chunk.
        path: PathBuf,
    },

    /// Chunk, embed, and upsert documents into the vector index.
    ///
    /// Batches of at most 100 records are committed sequentially; if a
    /// batch fails, earlier batches stay committed.
    Ingest {
        /// File or directory to ingest (pdf, txt, md, json).
        path: PathBuf,

        /// Report and skip files that fail to read or parse.
        #[arg(long)]
        keep_going: bool,

        /// Show file and chunk counts without embedding or writing.
        #[arg(long)]
        dry_run: bool,

        /// Do not ingest the structured content file from `[content].path`.
        #[arg(long)]
        no_content: bool,
    },

    /// Answer a single question.
    Ask {
        /// The question.
        question: String,
    },

    /// Start the HTTP chat server.
    ///
    /// Binds to the address configured in `[server].bind`.
    Serve,
}

const DEFAULT_CONFIG: &str = "./config/folio.toml";

fn load_config(path: &Path) -> anyhow::Result<config::Config> {
    if !path.exists() && path == Path::new(DEFAULT_CONFIG) {
        return Ok(config::Config::default());
    }
    config::load_config(path)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    match cli.command {
        Commands::Chunk { path } => {
            ingest::run_chunk(&cfg, &path)?;
        }
        Commands::Ingest {
            path,
            keep_going,
            dry_run,
            no_content,
        } => {
            let opts = IngestOptions {
                keep_going,
                dry_run,
                no_content,
            };
            ingest::run_ingest(&cfg, &path, opts).await?;
        }
        Commands::Ask { question } => {
            let assistant = Assistant::from_config(&cfg).await?;
            let answer = assistant.answer(&question, &[]).await?;
            println!("{}", answer);
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
