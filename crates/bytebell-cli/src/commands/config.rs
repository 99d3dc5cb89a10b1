//! Config command - View and initialize configuration
//!
//! - Show the effective configuration (or one key of it)
//! - Show configuration file paths
//! - Create a default configuration file (local or global)

use std::path::PathBuf;

use anyhow::{Context, Result};
use bytebell_config::{ByteBellConfig, ConfigLoader, LoggingConfig};
use clap::Subcommand;
use serde::Serialize;

use super::load_config;
use crate::{logging, GlobalOptions};

/// Config management commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show(ShowArgs),

    /// Show configuration file paths
    Path(PathArgs),

    /// Create a configuration file with default values
    Init(InitArgs),
}

/// Arguments for the show command
#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Show a single key (e.g., "index.meta_namespace")
    #[arg(long)]
    key: Option<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Arguments for the path command
#[derive(clap::Args, Debug)]
pub struct PathArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Arguments for the init command
#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Create ~/.bytebell/config.toml instead of ./.bytebell/config.toml
    #[arg(long)]
    global: bool,
}

/// Configuration paths
#[derive(Debug, Clone, Serialize)]
pub struct ConfigPaths {
    /// Global config file path
    pub global: Option<PathBuf>,
    /// Local config file path
    pub local: PathBuf,
    /// File given with --config, if any
    pub explicit: Option<PathBuf>,
    pub global_exists: bool,
    pub local_exists: bool,
}

/// Execute the config command
pub async fn execute(cmd: ConfigCommand, global: GlobalOptions) -> Result<()> {
    logging::init(&global, &LoggingConfig::default())?;

    match cmd {
        ConfigCommand::Show(args) => execute_show(args, global),
        ConfigCommand::Path(args) => execute_path(args, global),
        ConfigCommand::Init(args) => execute_init(args),
    }
}

fn execute_show(args: ShowArgs, global: GlobalOptions) -> Result<()> {
    let config = load_config(&global)?;

    if let Some(ref key) = args.key {
        let value = get_config_value(&config, key)
            .ok_or_else(|| anyhow::anyhow!("Unknown configuration key: {}", key))?;
        match value {
            serde_json::Value::String(s) => println!("{}", s),
            serde_json::Value::Null => println!("null"),
            other if args.json => println!("{}", serde_json::to_string_pretty(&other)?),
            other => println!("{}", other),
        }
        return Ok(());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        print!(
            "{}",
            toml::to_string_pretty(&config).context("Failed to render configuration")?
        );
    }

    if let Err(e) = config.validate() {
        eprintln!("warning: {}", e);
    }

    Ok(())
}

fn execute_path(args: PathArgs, global: GlobalOptions) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let loader = ConfigLoader::new();

    let global_path = loader.global_config_path();
    let local_path = loader.local_config_path(&cwd);

    let paths = ConfigPaths {
        global_exists: global_path.as_ref().map(|p| p.exists()).unwrap_or(false),
        local_exists: local_path.exists(),
        global: global_path,
        local: local_path,
        explicit: global.config,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&paths)?);
        return Ok(());
    }

    println!("Configuration Paths");
    println!("===================\n");

    if let Some(ref gp) = paths.global {
        println!("Global: {} ({})", gp.display(), exists_label(paths.global_exists));
    } else {
        println!("Global: not available (no home directory)");
    }
    println!(
        "Local:  {} ({})",
        paths.local.display(),
        exists_label(paths.local_exists)
    );
    if let Some(ref explicit) = paths.explicit {
        println!(
            "Config: {} ({}, overrides global and local)",
            explicit.display(),
            exists_label(explicit.exists())
        );
    }

    Ok(())
}

fn execute_init(args: InitArgs) -> Result<()> {
    let loader = ConfigLoader::new();

    let path = if args.global {
        loader
            .init_global()
            .context("Failed to initialize global config")?
    } else {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        loader
            .init_local(&cwd)
            .context("Failed to initialize local config")?
    };

    println!("Configuration file: {}", path.display());
    Ok(())
}

fn exists_label(exists: bool) -> &'static str {
    if exists {
        "exists"
    } else {
        "not found"
    }
}

/// Get a configuration value by dotted key path
fn get_config_value(config: &ByteBellConfig, key: &str) -> Option<serde_json::Value> {
    let json = serde_json::to_value(config).ok()?;

    let mut current = &json;
    for part in key.split('.') {
        current = current.get(part)?;
    }

    Some(current.clone())
}
