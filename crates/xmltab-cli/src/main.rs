//! # xmltab
//!
//! Converts collections of XML documents into CSV files or a SQLite
//! database, driven by a YAML mapping configuration.

mod cli;

use anyhow::{Context, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use xmltab_pipeline::Pipeline;
use xmltab_schema::Schema;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(?cli, "Starting xmltab");

    if let Err(message) = cli.validate_args() {
        bail!(message);
    }

    let schema = Schema::from_file(&cli.config)
        .with_context(|| format!("loading configuration {}", cli.config.display()))?;

    let pipeline = Pipeline::new(schema, cli.pipeline_config()).await?;
    let summary = pipeline.convert().await?;

    if cli.summary {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Ok(())
}
