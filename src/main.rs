//! # pdfqa CLI
//!
//! ## Usage
//!
//! ```bash
//! pdfqa --config ./config/pdfqa.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pdfqa ingest` | Embed every unprocessed PDF in the documents directory |
//! | `pdfqa ingest --dry-run` | List the PDFs the next run would process |
//! | `pdfqa ask "<question>"` | Answer one question from the indexed documents |
//! | `pdfqa serve` | Start the HTTP server (`POST /api/chat`) |
//!
//! API keys are read from the environment (`OPENAI_API_KEY`,
//! `PINECONE_API_KEY`); a `.env` file in the working directory is loaded
//! first. Set `RUST_LOG` to change log verbosity (default `pdfqa=info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use pdfqa::{chain, config, ingest, server};

/// Ask questions about a folder of PDFs.
#[derive(Parser)]
#[command(
    name = "pdfqa",
    about = "Incremental PDF ingestion and conversational question answering",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/pdfqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest new PDFs into the vector index.
    ///
    /// Files with a marker in the processed directory are skipped. Each
    /// file is marked only after all of its passages were upserted.
    Ingest {
        /// List pending files without loading, embedding or marking them.
        #[arg(long)]
        dry_run: bool,
    },

    /// Answer a question from the indexed documents.
    Ask {
        question: String,

        /// JSON file with prior turns: `[["question", "answer"], ...]`.
        #[arg(long)]
        history: Option<PathBuf>,
    },

    /// Start the HTTP server.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pdfqa=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Ingest { dry_run } => {
            ingest::run_ingest(&cfg, dry_run).await?;
        }
        Commands::Ask { question, history } => {
            chain::run_ask(&cfg, &question, history.as_deref()).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
