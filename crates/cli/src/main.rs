//! Kangae CLI — the main entry point.
//!
//! Commands:
//! - `chat`       — Ask a question once, or enter interactive mode
//! - `tools`      — List the built-in tools
//! - `strategies` — List the reasoning strategies
//! - `memory`     — Inspect, search, or clear a saved memory file
//! - `config`     — Print the effective (or default) configuration

use clap::{Parser, Subcommand};
use kangae_agent::Strategy;
use kangae_config::{AppConfig, LoggingConfig, MemoryKind, TotLevel};
use std::path::PathBuf;
use std::sync::Arc;

mod commands;
mod model;

#[derive(Parser)]
#[command(
    name = "kangae",
    about = "Kangae — ReAct, Chain-of-Thought and Tree-of-Thoughts reasoning loops",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the agent a question
    Chat {
        /// Ask a single question instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Reasoning strategy (react, cot, tot)
        #[arg(short, long)]
        strategy: Option<Strategy>,

        /// Memory store (conversation, vector)
        #[arg(long)]
        memory: Option<MemoryKind>,

        /// JSON file the memory log is loaded from and saved to
        #[arg(long, value_name = "PATH")]
        memory_file: Option<PathBuf>,

        /// Maximum model calls for ReAct and CoT
        #[arg(long, value_parser = commands::chat::positive)]
        max_turns: Option<usize>,

        /// Tree-of-Thoughts search depth
        #[arg(long, value_parser = commands::chat::positive)]
        depth: Option<usize>,

        /// Tree-of-Thoughts beam width
        #[arg(long, value_parser = commands::chat::positive)]
        breadth: Option<usize>,

        /// Tree-of-Thoughts preset (low, middle, high, extreme)
        #[arg(long)]
        tot_level: Option<TotLevel>,

        /// Print every intermediate step
        #[arg(long)]
        stream: bool,
    },

    /// List the built-in tools
    Tools {
        /// Print each tool's parameter schema
        #[arg(long)]
        schema: bool,
    },

    /// List the reasoning strategies
    Strategies,

    /// Inspect a saved memory file
    Memory {
        #[command(subcommand)]
        action: MemoryAction,

        /// Memory file (defaults to the configured one)
        #[arg(long, global = true, value_name = "PATH")]
        file: Option<PathBuf>,
    },

    /// Print the effective configuration
    Config {
        /// Print the built-in defaults instead
        #[arg(long)]
        default: bool,
    },
}

#[derive(Subcommand)]
enum MemoryAction {
    /// Print every stored message
    Show,

    /// Search stored messages
    Search {
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value_t = 5)]
        limit: usize,

        /// Use TF-IDF similarity instead of keyword matching
        #[arg(long)]
        vector: bool,
    },

    /// Remove every stored message
    Clear {
        /// Skip the confirmation notice
        #[arg(long)]
        confirm: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Commands::Config { default: true } = cli.command {
        return commands::config_cmd::show_default();
    }

    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    init_tracing(cli.verbose, &config.logging, cli.log_file.clone())?;

    match cli.command {
        Commands::Chat {
            message,
            strategy,
            memory,
            memory_file,
            max_turns,
            depth,
            breadth,
            tot_level,
            stream,
        } => {
            let args = commands::chat::ChatArgs {
                message,
                strategy,
                memory,
                memory_file,
                max_turns,
                depth,
                breadth,
                tot_level,
                stream,
            };
            commands::chat::run(config, args).await?
        }
        Commands::Tools { schema } => commands::tools::run(schema)?,
        Commands::Strategies => commands::strategies::run(&config),
        Commands::Memory { action, file } => {
            let path = commands::memory::resolve_path(file, &config)?;
            match action {
                MemoryAction::Show => commands::memory::show(&path).await?,
                MemoryAction::Search {
                    query,
                    limit,
                    vector,
                } => commands::memory::search(&path, &query, limit, vector).await?,
                MemoryAction::Clear { confirm } => {
                    commands::memory::clear(&path, confirm).await?
                }
            }
        }
        Commands::Config { .. } => commands::config_cmd::show(&config)?,
    }

    Ok(())
}

/// Pick the log filter: `--verbose`, then `AGENT_LOG_LEVEL` or
/// `[logging] level`, then `RUST_LOG`, then `info`.
fn filter_directive(verbose: bool, configured: Option<&str>, rust_log: Option<String>) -> String {
    if verbose {
        return "debug".into();
    }
    configured
        .map(str::to_string)
        .or(rust_log)
        .unwrap_or_else(|| "info".into())
}

/// Install the subscriber: stderr always, plus a plain-text file layer when
/// a log file is given on the command line or in the configuration.
fn init_tracing(
    verbose: bool,
    logging: &LoggingConfig,
    log_file: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};

    let directive = filter_directive(
        verbose,
        logging.level.as_deref(),
        std::env::var(EnvFilter::DEFAULT_ENV).ok(),
    );
    let filter = EnvFilter::try_new(&directive)
        .map_err(|e| format!("Invalid log level '{directive}': {e}"))?;

    let file_layer = match log_file.or_else(|| logging.file.clone()) {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| format!("Failed to open log file {}: {e}", path.display()))?;
            Some(
                fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false)
                    .with_target(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .init();

    Ok(())
}
