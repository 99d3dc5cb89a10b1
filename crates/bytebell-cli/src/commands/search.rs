//! Search command - Single-stage namespace search

use anyhow::Result;
use bytebell_retrieval::{FormatOptions, Stage};
use clap::{Args, ValueEnum};

use super::{build_retriever, load_config, print_info};
use crate::{logging, GlobalOptions};

/// Namespace to search
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StageArg {
    /// Cross-referencing summaries
    Meta,
    /// Detailed content chunks (default)
    Base,
}

impl From<StageArg> for Stage {
    fn from(stage: StageArg) -> Self {
        match stage {
            StageArg::Meta => Stage::Meta,
            StageArg::Base => Stage::Base,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Labelled text output
    Text,
    /// JSON output for scripting
    Json,
}

/// Arguments for the search command
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search query
    query: String,

    /// Namespace to search: meta or base
    #[arg(long, short = 's', value_enum, default_value = "base")]
    stage: StageArg,

    /// Also search code repositories (default: decided from the query)
    #[arg(long, conflicts_with = "exclude_code")]
    include_code: bool,

    /// Never search code repositories
    #[arg(long)]
    exclude_code: bool,

    /// Maximum number of results to return
    #[arg(long, short = 'k')]
    top_k: Option<usize>,

    /// Output format: text (default), json
    #[arg(long, short = 'o', value_enum, default_value = "text")]
    output: OutputFormat,
}

impl SearchArgs {
    fn code_override(&self) -> Option<bool> {
        if self.include_code {
            Some(true)
        } else if self.exclude_code {
            Some(false)
        } else {
            None
        }
    }
}

/// Execute the search command
pub async fn execute(args: SearchArgs, global: GlobalOptions) -> Result<()> {
    let config = load_config(&global)?;
    logging::init(&global, &config.logging)?;

    if args.top_k == Some(0) {
        anyhow::bail!("--top-k must be greater than 0");
    }

    let retriever = build_retriever(&config)?;
    let stage = Stage::from(args.stage);

    let response = retriever
        .search_stage(stage, &args.query, args.code_override(), args.top_k)
        .await;

    if let OutputFormat::Json = args.output {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    if !response.success {
        anyhow::bail!(
            "Search of {} namespace '{}' failed: {}",
            stage,
            response.namespace,
            response.error.as_deref().unwrap_or("unknown error")
        );
    }

    let rendered = FormatOptions::for_stage(stage).render(&response);
    if rendered.is_empty() {
        print_info(
            &format!("No results found in {} namespace '{}'.", stage, response.namespace),
            global.quiet,
        );
    } else {
        println!("{}", rendered);
    }

    Ok(())
}
