//! Retrieve command - Full two-phase retrieval

use anyhow::Result;
use bytebell_retrieval::RetrievalOutcome;
use clap::Args;

use super::{build_retriever, load_config, print_info};
use crate::{logging, GlobalOptions};

/// Arguments for the retrieve command
#[derive(Args, Debug)]
pub struct RetrieveArgs {
    /// Free-text query
    query: String,
}

/// Execute the retrieve command
pub async fn execute(args: RetrieveArgs, global: GlobalOptions) -> Result<()> {
    let config = load_config(&global)?;
    logging::init(&global, &config.logging)?;

    let retriever = build_retriever(&config)?;

    match retriever.run(&args.query).await {
        RetrievalOutcome::Context(text) if text.is_empty() => {
            print_info("No relevant context found.", global.quiet);
            Ok(())
        }
        RetrievalOutcome::Context(text) => {
            println!("{}", text);
            Ok(())
        }
        RetrievalOutcome::Diagnostic(message) => anyhow::bail!("{}", message),
    }
}
