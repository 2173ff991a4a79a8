use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod orchestrator;
mod schema;
mod source;

#[derive(Parser)]
#[command(name = "gencoder")]
#[command(about = "Generate code from database table metadata and handlebars templates")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file to use
    #[arg(short = 'f', long, global = true, default_value = "gencoder.yaml")]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate code from templates and database table metadata
    #[command(visible_aliases = ["gen", "g"])]
    Generate(commands::generate::GenerateArgs),

    /// Print the render contexts built from the configured databases
    #[command(visible_aliases = ["i", "intro"])]
    Introspect(commands::introspect::IntrospectArgs),

    /// Write a starter configuration and templates
    Init(commands::init::InitArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    match cli.command {
        Commands::Generate(args) => commands::generate::run(&cli.config, args).await,
        Commands::Introspect(args) => commands::introspect::run(&cli.config, args).await,
        Commands::Init(args) => commands::init::run(args).await,
    }
}
