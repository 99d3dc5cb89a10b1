//! ByteBell CLI - Knowledge-base retrieval for grounding language models
//!
//! # Usage
//!
//! ```bash
//! # Full two-phase retrieval
//! bytebell retrieve "What is SEI blockchain?"
//!
//! # Inspect one namespace
//! bytebell search "parallel execution" --stage meta
//!
//! # Serve the MCP tools over stdio
//! bytebell mcp
//!
//! # Create ~/.bytebell/config.toml
//! bytebell config init --global
//! ```

use std::path::PathBuf;

use anyhow::Result;
use bytebell_config::{ConfigError, ConfigOverrides, IndexBackend};
use clap::{Args, Parser, Subcommand};

mod commands;
mod logging;

/// ByteBell - Two-phase hybrid retrieval over a curated knowledge base
#[derive(Parser, Debug)]
#[command(name = "bytebell")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOptions,
}

/// Global options available to all commands
#[derive(Args, Debug, Clone)]
struct GlobalOptions {
    /// Path to configuration file (skips global and local lookup)
    #[arg(long, short = 'c', global = true, env = "BYTEBELL_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Vector index backend (pinecone, qdrant)
    #[arg(long, global = true, env = "BYTEBELL_INDEX_BACKEND", value_parser = parse_index_backend)]
    index_backend: Option<IndexBackend>,
}

fn parse_index_backend(s: &str) -> Result<IndexBackend, String> {
    s.parse().map_err(|e: ConfigError| e.to_string())
}

impl GlobalOptions {
    /// Convert global options to config overrides
    pub fn to_config_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            index_backend: self.index_backend,
            ..Default::default()
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Retrieve grounding context for a query (meta → base)
    Retrieve(commands::retrieve::RetrieveArgs),

    /// Search a single namespace and print labelled results
    Search(commands::search::SearchArgs),

    /// View and initialize configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),

    /// Start the MCP server for AI assistant integration
    Mcp(commands::mcp::McpArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Each command installs its own subscriber once the config is known
    match cli.command {
        Commands::Retrieve(args) => commands::retrieve::execute(args, cli.global).await,
        Commands::Search(args) => commands::search::execute(args, cli.global).await,
        Commands::Config(cmd) => commands::config::execute(cmd, cli.global).await,
        Commands::Mcp(args) => commands::mcp::execute(args, cli.global).await,
    }
}
