//! Template source resolution: a local directory or a GitHub repository

use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::process::Command;

const DEFAULT_BRANCH: &str = "main";

static GITHUB_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"github\.com/([^/]+)/([^/]+?)(?:\.git)?(?:/tree/([^/]+)(?:/(.*?))?)?/?$")
        .expect("valid GitHub URL pattern")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    Local(PathBuf),
    GitHub {
        owner: String,
        repo: String,
        branch: String,
        /// Directory inside the repository holding the templates
        dir: Option<String>,
    },
}

/// A template root ready for loading. Remote checkouts live as long as this value.
#[derive(Debug)]
pub struct ResolvedTemplates {
    root: PathBuf,
    _checkout: Option<TempDir>,
}

impl ResolvedTemplates {
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl TemplateSource {
    pub fn parse(templates: &str) -> Result<Self> {
        if !templates.contains("github.com/") {
            return Ok(TemplateSource::Local(PathBuf::from(templates)));
        }

        let captures = GITHUB_URL
            .captures(templates)
            .with_context(|| format!("Invalid GitHub URL: {}", templates))?;
        let group = |i: usize| captures.get(i).map(|m| m.as_str().to_string());

        Ok(TemplateSource::GitHub {
            owner: group(1).unwrap_or_default(),
            repo: group(2).unwrap_or_default(),
            branch: group(3).unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
            dir: group(4).filter(|d| !d.is_empty()),
        })
    }

    /// Make the templates available on disk, shallow-cloning remote sources
    pub async fn resolve(&self) -> Result<ResolvedTemplates> {
        match self {
            TemplateSource::Local(path) => Ok(ResolvedTemplates {
                root: path.clone(),
                _checkout: None,
            }),
            TemplateSource::GitHub {
                owner,
                repo,
                branch,
                dir,
            } => {
                let checkout = TempDir::new().context("Failed to create checkout directory")?;
                let clone_url = format!("https://github.com/{}/{}.git", owner, repo);
                log::info!("Cloning {} (branch {})", clone_url, branch);

                let status = Command::new("git")
                    .args(["clone", "--branch", branch, "--depth", "1", &clone_url])
                    .arg(checkout.path())
                    .status()
                    .await
                    .context("Failed to run git")?;
                if !status.success() {
                    bail!("git clone of {} failed with {}", clone_url, status);
                }

                let root = match dir {
                    Some(dir) => checkout.path().join(dir),
                    None => checkout.path().to_path_buf(),
                };
                Ok(ResolvedTemplates {
                    root,
                    _checkout: Some(checkout),
                })
            }
        }
    }
}
