//! # rag-chat CLI (`ragchat`)
//!
//! The `ragchat` binary manages the local document cache and sends
//! questions to a retrieval-augmented answering service.
//!
//! ## Usage
//!
//! ```bash
//! ragchat --config ./config/ragchat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ragchat init` | Create the cache database |
//! | `ragchat add <path>...` | Cache files (directories are walked) |
//! | `ragchat list` | List cached documents |
//! | `ragchat remove <index>` | Remove a cached document |
//! | `ragchat clear` | Remove every cached document |
//! | `ragchat languages` | List supported response languages |
//! | `ragchat ask "<question>"` | Upload the cache, ask once, print the transcript |
//! | `ragchat chat` | Interactive session on stdin |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use rag_chat::commands;
use rag_chat::config;

/// rag-chat CLI — a local document cache and query orchestrator for
/// retrieval-augmented answering services.
///
/// All commands except `languages` read a TOML configuration file given by
/// `--config`.
#[derive(Parser)]
#[command(
    name = "ragchat",
    about = "rag-chat — cache documents locally and ask questions about them",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ragchat.toml")]
    config: PathBuf,

    /// Log debug output to stderr (overrides RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Create the cache database. Safe to run repeatedly.
    Init,

    /// Add files to the cache.
    ///
    /// Each file is stored under its file name. Directories are walked
    /// recursively.
    Add {
        /// Files or directories to cache.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// List cached documents with their positions.
    List,

    /// Remove the cached document at a position shown by `list`.
    Remove {
        /// Zero-based position.
        index: usize,
    },

    /// Remove every cached document.
    Clear,

    /// List supported response languages.
    Languages,

    /// Upload the cached documents and ask one question.
    ///
    /// An empty question is allowed when documents are cached; the service
    /// is then asked to summarize them.
    Ask {
        /// The question.
        #[arg(default_value = "")]
        question: String,

        /// Response language (english, hindi, malayalam, tamil, french).
        #[arg(long, short)]
        language: Option<String>,
    },

    /// Start an interactive session.
    Chat {
        /// Initial response language.
        #[arg(long, short)]
        language: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("rag_chat=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Commands that don't require config
    if let Commands::Languages = cli.command {
        commands::run_languages();
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => commands::run_init(&cfg).await?,
        Commands::Add { paths } => commands::run_add(&cfg, &paths).await?,
        Commands::List => commands::run_list(&cfg).await?,
        Commands::Remove { index } => commands::run_remove(&cfg, index).await?,
        Commands::Clear => commands::run_clear(&cfg).await?,
        Commands::Ask { question, language } => {
            let language = commands::resolve_language(&cfg, language.as_deref())?;
            commands::run_ask(&cfg, &question, language).await?;
        }
        Commands::Chat { language } => {
            let language = commands::resolve_language(&cfg, language.as_deref())?;
            commands::run_chat(&cfg, language).await?;
        }
        Commands::Languages => unreachable!("handled above"),
    }

    Ok(())
}
