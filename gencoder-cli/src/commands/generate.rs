//! `gencoder generate`

use crate::orchestrator::{GeneratedFile, Orchestrator};
use crate::source::TemplateSource;
use anyhow::{Context, Result};
use clap::Args;
use gencoder_core::materialize::MaterializeAction;
use gencoder_core::properties;
use gencoder_core::Config;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Templates directory or GitHub URL, overrides `templates` in the config file
    #[arg(short, long)]
    pub templates: Option<String>,

    /// Properties as key=value, override properties from the config file
    #[arg(short, long, value_delimiter = ',')]
    pub properties: Vec<String>,

    /// Output directory for generated files
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Also copy files that are not templates (existing files are kept)
    #[arg(short = 'a', long = "include-non-tpl")]
    pub include_non_tpl: bool,

    /// Local Rhai helper scripts; each `name.rhai` registers helper `name`.
    /// URLs are not fetched: download remote helpers first
    #[arg(long, value_delimiter = ',', value_name = "FILE")]
    pub helpers: Vec<PathBuf>,

    /// Maximum number of tables introspected at the same time
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub concurrency: Option<u64>,
}

pub async fn run(config_path: &Path, args: GenerateArgs) -> Result<()> {
    let config = load_config(config_path, &args).await?;
    let cli_properties = properties::parse_overrides(&args.properties)?;

    let source = TemplateSource::parse(config.templates())?;
    let resolved = source.resolve().await?;
    log::debug!("Loading templates from {}", resolved.root().display());

    let orchestrator =
        Orchestrator::new(config, cli_properties).include_non_templates(args.include_non_tpl);
    let generated = orchestrator.generate(resolved.root()).await?;

    print_summary(&generated);
    Ok(())
}

/// Read the config file and apply command-line overrides
///
/// A missing config file is fine when templates are given on the command line.
async fn load_config(config_path: &Path, args: &GenerateArgs) -> Result<Config> {
    let exists = tokio::fs::try_exists(config_path).await.unwrap_or(false);
    let mut config = if exists || args.templates.is_none() {
        Config::from_file(config_path).await?
    } else {
        log::debug!(
            "{} not found, using command-line options only",
            config_path.display()
        );
        Config::default()
    };

    if let Some(templates) = &args.templates {
        config.templates = Some(templates.clone());
    }
    if let Some(output) = &args.output {
        config.output = Some(output.display().to_string());
    }
    config
        .helpers
        .extend(args.helpers.iter().map(|h| h.display().to_string()));
    if let Some(concurrency) = args.concurrency {
        config.concurrency =
            Some(usize::try_from(concurrency).context("--concurrency is too large")?);
    }
    Ok(config)
}

fn print_summary(generated: &[GeneratedFile]) {
    let mut written = 0;
    for file in generated {
        match file.action {
            MaterializeAction::Created => println!("📝 Created {}", file.path.display()),
            MaterializeAction::Merged => println!("🔄 Updated {}", file.path.display()),
            MaterializeAction::Unchanged | MaterializeAction::Skipped => continue,
        }
        written += 1;
    }
    println!(
        "✅ {} file(s) written, {} unchanged",
        written,
        generated.len() - written
    );
}
