//! # rag-query CLI (`ragq`)
//!
//! Ask questions of a retrieval-augmented answering service and read the
//! answer together with its sources.
//!
//! ## Usage
//!
//! ```bash
//! ragq [--config ./config/ragq.toml] [--api-url URL] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ragq ask "<question>"` | Ask one question, print the answer, exit |
//! | `ragq repl` | Interactive session |
//! | `ragq health` | Check the service's health endpoint |
//!
//! `ragq ask` exits with status 1 when the query fails.

use clap::{Parser, Subcommand};
use rag_query::config::{self, OutputFormat, API_URL_ENV};
use rag_query::{health, session};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "./config/ragq.toml";

/// rag-query: ask questions of your documents.
#[derive(Parser)]
#[command(
    name = "ragq",
    about = "Ask questions of a retrieval-augmented answering service",
    version,
    long_about = "Sends questions to a retrieval-augmented answering service and prints the \
    generated answer together with the source passages it was grounded on."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Optional. When the default path does not exist, built-in defaults are used.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Base URL of the answering service.
    ///
    /// Overrides the RAG_API_URL environment variable and `[endpoint].base_url`.
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question.
    ///
    /// A blank question sends nothing and prints the start view.
    Ask {
        /// The question text.
        question: String,

        /// Output format (defaults to `[output].format`).
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,

        /// Print every source passage, not just the source list.
        #[arg(long)]
        show_passages: bool,
    },

    /// Start an interactive session.
    ///
    /// Each line is a question; `:help` lists the commands.
    Repl {
        /// Output format (defaults to `[output].format`).
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,

        /// Show passages of every answer without `:show`.
        #[arg(long)]
        show_passages: bool,
    },

    /// Check that the answering service is reachable and healthy.
    Health,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let file_config = if cli.config == PathBuf::from(DEFAULT_CONFIG_PATH) {
        config::load_config_or_default(&cli.config)?
    } else {
        config::load_config(&cli.config)?
    };
    let env_url = std::env::var(API_URL_ENV).ok();
    let cfg = file_config.with_base_url_override(cli.api_url.as_deref(), env_url.as_deref())?;

    match cli.command {
        Commands::Ask {
            question,
            format,
            show_passages,
        } => {
            let format = format.unwrap_or(cfg.output.format);
            let show = show_passages || cfg.output.show_passages;
            if !session::run_ask(&cfg, &question, format, show).await? {
                std::process::exit(1);
            }
        }
        Commands::Repl {
            format,
            show_passages,
        } => {
            let format = format.unwrap_or(cfg.output.format);
            let show = show_passages || cfg.output.show_passages;
            session::run_repl(&cfg, format, show).await?;
        }
        Commands::Health => {
            health::run_health(&cfg).await?;
        }
    }

    Ok(())
}
