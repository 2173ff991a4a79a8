//! Writing rendered output to disk
//!
//! New files are written verbatim. Existing files go through the block merge so
//! hand-written code outside blocks survives. Writes replace the whole file in
//! place; there is no temp-file-and-rename step, so an interrupted write can
//! leave a truncated file behind. Rerunning the generation repairs it.

use crate::merge::{merge_blocks_with_report, BlockMarkers};
use crate::template::TemplateFile;
use crate::{GencoderError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterializeAction {
    /// No file existed; content written as rendered
    Created,
    /// Existing file merged and rewritten with different content
    Merged,
    /// Existing file merged, result identical to what was there
    Unchanged,
    /// Existing normal file left alone
    Skipped,
}

/// Writes files below one output directory
#[derive(Debug, Clone)]
pub struct Materializer {
    output_dir: PathBuf,
    markers: BlockMarkers,
}

impl Materializer {
    pub fn new(output_dir: impl Into<PathBuf>, markers: BlockMarkers) -> Self {
        Self {
            output_dir: output_dir.into(),
            markers,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Create or merge `relative_path` with freshly rendered content
    pub async fn write(&self, relative_path: &Path, content: &str) -> Result<MaterializeAction> {
        let path = self.output_dir.join(relative_path);
        materialize(&path, content, &self.markers).await
    }

    /// Copy a normal file to its relative path unless something already exists there
    pub async fn copy_normal(&self, file: &TemplateFile) -> Result<MaterializeAction> {
        let path = self.output_dir.join(&file.relative_path);
        if exists(&path).await? {
            log::debug!("{} exists, not overwriting", path.display());
            return Ok(MaterializeAction::Skipped);
        }
        write_new(&path, &file.content).await?;
        Ok(MaterializeAction::Created)
    }
}

/// Create `path` with `new_content`, or merge into the file already there
pub async fn materialize(
    path: &Path,
    new_content: &str,
    markers: &BlockMarkers,
) -> Result<MaterializeAction> {
    if !exists(path).await? {
        write_new(path, new_content.as_bytes()).await?;
        return Ok(MaterializeAction::Created);
    }

    let old_content = fs::read_to_string(path)
        .await
        .map_err(|source| materialize_error(path, source))?;
    let outcome = merge_blocks_with_report(markers, &old_content, new_content);
    log::debug!(
        "{}: replaced blocks {:?}, preserved blocks {:?}",
        path.display(),
        outcome.replaced,
        outcome.preserved
    );

    fs::write(path, outcome.content.as_bytes())
        .await
        .map_err(|source| materialize_error(path, source))?;

    if outcome.content == old_content {
        Ok(MaterializeAction::Unchanged)
    } else {
        Ok(MaterializeAction::Merged)
    }
}

async fn exists(path: &Path) -> Result<bool> {
    fs::try_exists(path)
        .await
        .map_err(|source| materialize_error(path, source))
}

async fn write_new(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|source| materialize_error(parent, source))?;
    }
    fs::write(path, content)
        .await
        .map_err(|source| materialize_error(path, source))
}

fn materialize_error(path: &Path, source: std::io::Error) -> GencoderError {
    GencoderError::Materialize {
        path: path.to_path_buf(),
        source,
    }
}
