//! # pdf-qa CLI (`pdfqa`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pdfqa chat [--file PATH]` | Interactive question-answering session |
//! | `pdfqa ask --file PATH "<question>"` | Answer one question and exit |
//! | `pdfqa inspect PATH` | Show pages, characters, and chunks (no network) |
//!
//! ## Examples
//!
//! ```bash
//! export GOOGLE_API_KEY=...
//! pdfqa chat --file report.pdf
//! pdfqa ask --file report.pdf "What were the Q3 results?"
//! pdfqa --config ./pdfqa.toml inspect report.pdf
//! RUST_LOG=pdf_qa=debug pdfqa chat
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pdf_qa::config::{self, Config};
use pdf_qa::models::Credential;
use pdf_qa::session::Pipeline;
use pdf_qa::shell;

/// Ask questions about a PDF using retrieval-augmented generation.
#[derive(Parser)]
#[command(name = "pdfqa", version, about)]
struct Cli {
    /// Path to a TOML configuration file. Built-in defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// API key for the embedding and generation providers.
    #[arg(long, global = true, env = "GOOGLE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive session.
    ///
    /// Each line is a question. Lines starting with `:` are commands; type
    /// `:help` inside the session for the list.
    Chat {
        /// PDF to open at startup.
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Answer a single question about a PDF.
    Ask {
        /// PDF to query.
        #[arg(long)]
        file: PathBuf,

        /// The question.
        question: String,
    },

    /// Extract and chunk a PDF locally and print what would be indexed.
    Inspect {
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => Config::default(),
    };
    let credential = cli.api_key.and_then(Credential::new);

    match cli.command {
        Commands::Chat { file } => {
            let document = file.as_deref().map(shell::load_document).transpose()?;
            let pipeline = Pipeline::http(cfg);
            let stdin = std::io::stdin();
            shell::run_chat(
                &pipeline,
                credential,
                document,
                stdin.lock(),
                std::io::stdout(),
            )
            .await?;
        }
        Commands::Ask { file, question } => {
            let pipeline = Pipeline::http(cfg);
            shell::run_ask(
                &pipeline,
                credential,
                &file,
                &question,
                &mut std::io::stdout(),
            )
            .await?;
        }
        Commands::Inspect { path } => {
            shell::run_inspect(&cfg, &path, &mut std::io::stdout())?;
        }
    }

    Ok(())
}
