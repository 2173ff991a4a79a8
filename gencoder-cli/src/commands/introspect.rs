//! `gencoder introspect`

use crate::orchestrator::Orchestrator;
use anyhow::Result;
use clap::{Args, ValueEnum};
use gencoder_core::properties::Properties;
use gencoder_core::{Config, RenderContext};
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    #[value(alias = "yml")]
    Yaml,
}

#[derive(Debug, Args)]
pub struct IntrospectArgs {
    /// Output format
    #[arg(short, long, alias = "format", value_enum, default_value_t = OutputFormat::Json)]
    pub output: OutputFormat,
}

pub async fn run(config_path: &Path, args: IntrospectArgs) -> Result<()> {
    let config = Config::from_file(config_path).await?;
    let contexts = Orchestrator::new(config, Properties::new())
        .collect_contexts()
        .await?;

    println!("{}", format_contexts(&contexts, args.output)?);
    Ok(())
}

fn format_contexts(contexts: &[RenderContext], format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(contexts)?,
        OutputFormat::Yaml => serde_yaml::to_string(contexts)?,
    })
}
