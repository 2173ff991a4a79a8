//! `gencoder init`

use anyhow::{Context, Result};
use clap::Args;
use rust_embed::RustEmbed;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(RustEmbed)]
#[folder = "templates/init/"]
struct StarterFiles;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Directory to initialize
    #[arg(short, long, default_value = ".")]
    pub dir: PathBuf,
}

pub async fn run(args: InitArgs) -> Result<()> {
    let written = write_starter_files(&args.dir)?;

    if written.is_empty() {
        println!("📁 Nothing to do, starter files already exist");
    }
    for path in &written {
        println!("📝 Creating {}", path.display());
    }
    println!();
    println!("✅ Init done! Adjust gencoder.yaml and the templates to fit your project, then run:");
    println!("   gencoder generate");
    Ok(())
}

/// Write every embedded starter file that does not exist yet under `dir`
fn write_starter_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    let mut names: Vec<_> = StarterFiles::iter().collect();
    names.sort();

    for name in names {
        let target = dir.join(name.as_ref());
        if target.exists() {
            log::debug!("{} exists, keeping it", target.display());
            continue;
        }
        let Some(file) = StarterFiles::get(&name) else {
            continue;
        };
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&target, file.data.as_ref())
            .with_context(|| format!("Failed to write {}", target.display()))?;
        written.push(target);
    }
    Ok(written)
}
