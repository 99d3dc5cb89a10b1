//! MCP server command
//!
//! Serves the ByteBell tools over stdio for AI assistant integration.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use bytebell_mcp::{ByteBellServer, ServerConfig};
use clap::Args;
use rmcp::{transport::stdio, ServiceExt};
use tokio::signal;
use tracing::{info, warn};

use super::{build_retriever, load_config};
use crate::{logging, GlobalOptions};

/// Start the MCP server for AI assistant integration
#[derive(Args, Debug)]
pub struct McpArgs {
    /// Log file path (default: stderr)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Maximum top_k accepted by search_namespace
    #[arg(long, default_value_t = bytebell_mcp::server::MAX_TOP_K)]
    max_top_k: usize,
}

/// Execute the MCP server command
pub async fn execute(args: McpArgs, global: GlobalOptions) -> Result<()> {
    let mut config = load_config(&global)?;
    if let Some(log_file) = args.log_file {
        config.logging.file = Some(log_file);
    }
    // stdout is reserved for the MCP protocol
    logging::init(&global, &config.logging)?;

    let retriever = build_retriever(&config)?;
    let server = ByteBellServer::new(
        Arc::new(retriever),
        ServerConfig::default().with_max_top_k(args.max_top_k),
    );

    info!("Server initialized, starting MCP protocol over stdio");

    let service = server
        .serve(stdio())
        .await
        .context("Failed to start MCP service")?;

    tokio::select! {
        result = service.waiting() => {
            if let Err(e) = result {
                info!("Service ended with error: {}", e);
            } else {
                info!("Service ended normally");
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
