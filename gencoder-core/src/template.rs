//! Template discovery and classification
//!
//! Files under the template root fall into three groups:
//!
//! - `*.hbs` files with an output-marker line are **templates**; the rest of
//!   that line is a handlebars expression producing the output path
//! - `*.hbs` files without one are **partials**, only usable through `{{> name}}`
//! - any other file is a **normal** file, copied verbatim when requested

use crate::{GencoderError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

/// Extension marking a file as handlebars source
pub const TEMPLATE_EXTENSION: &str = "hbs";

/// `{{> name}}`, `{{~> "name"}}`; partial blocks (`{{#> name}}`) carry a fallback and are not matched
static PARTIAL_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\{\{~?\s*>\s*(?:"([^"]+)"|'([^']+)'|([^\s}~()"']+))"#).unwrap()
});

static INLINE_PARTIAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\{\{~?\s*#\*inline\s+["']([^"']+)["']"#).unwrap());

static COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{\{~?!--.*?--~?\}\}|\{\{~?![^}]*\}\}").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateKind {
    /// Renders to the path produced by `output` (itself a template expression)
    Template { output: String },
    /// Included from other templates by name
    Partial,
    /// Copied as is, never overwritten
    Normal,
}

#[derive(Debug, Clone)]
pub struct TemplateFile {
    /// File name, e.g. `entity.java.hbs`
    pub name: String,
    /// Path relative to the template root
    pub relative_path: PathBuf,
    pub kind: TemplateKind,
    pub content: Vec<u8>,
}

impl TemplateFile {
    /// Source text of a handlebars file
    pub fn source(&self) -> &str {
        // Only Normal files may hold non UTF-8 bytes; others are validated on load.
        std::str::from_utf8(&self.content).unwrap_or_default()
    }

    /// Registry key for the compiled body
    pub fn key(&self) -> String {
        self.relative_path.to_string_lossy().replace('\\', "/")
    }

    /// Names a partial answers to: the file name, and the file name without `.hbs`
    pub fn partial_names(&self) -> Vec<String> {
        let mut names = vec![self.name.clone()];
        if let Some(stem) = self.name.strip_suffix(&format!(".{}", TEMPLATE_EXTENSION)) {
            if !stem.is_empty() {
                names.push(stem.to_string());
            }
        }
        names
    }

    /// Partials this file includes by name
    ///
    /// Dynamic names (`{{> (expr)}}`), `@partial-block` and inline partials
    /// defined in the same file are left out.
    pub fn partial_references(&self) -> Vec<String> {
        let source = COMMENT.replace_all(self.source(), "");
        let inline: HashSet<&str> = INLINE_PARTIAL
            .captures_iter(&source)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .collect();

        let mut names: Vec<String> = Vec::new();
        for caps in PARTIAL_REFERENCE.captures_iter(&source) {
            let Some(name) = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)) else {
                continue;
            };
            let name = name.as_str();
            if name.starts_with('@') || inline.contains(name) || names.iter().any(|n| n == name) {
                continue;
            }
            names.push(name.to_string());
        }
        names
    }
}

/// All files found under a template root
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    files: Vec<TemplateFile>,
}

impl TemplateSet {
    /// Walk `root` and classify every file
    ///
    /// Normal files are only collected when `include_non_templates` is set.
    pub async fn load(
        root: &Path,
        output_marker: &str,
        include_non_templates: bool,
    ) -> Result<Self> {
        if !fs::metadata(root).await.map_or(false, |m| m.is_dir()) {
            return Err(GencoderError::Config(format!(
                "Template directory not found: {}",
                root.display()
            )));
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.file_name() != ".git");

        for entry in walker {
            let entry = entry.map_err(|e| {
                GencoderError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("Failed to walk '{}': {}", root.display(), e),
                ))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative_path = path.strip_prefix(root).unwrap_or(path).to_path_buf();
            let name = entry.file_name().to_string_lossy().to_string();
            let is_template = path
                .extension()
                .map_or(false, |ext| ext == TEMPLATE_EXTENSION);

            if !is_template && !include_non_templates {
                log::debug!("Skipping non-template file {}", relative_path.display());
                continue;
            }

            let content = fs::read(path).await?;
            let kind = if is_template {
                let source = std::str::from_utf8(&content).map_err(|e| {
                    GencoderError::TemplateCompile {
                        file: relative_path.display().to_string(),
                        message: format!("not valid UTF-8: {}", e),
                    }
                })?;
                classify(source, output_marker)
            } else {
                TemplateKind::Normal
            };

            log::debug!("Loaded {:?} file {}", kind, relative_path.display());
            files.push(TemplateFile {
                name,
                relative_path,
                kind,
                content,
            });
        }

        Ok(Self { files })
    }

    pub fn from_files(files: Vec<TemplateFile>) -> Self {
        Self { files }
    }

    pub fn files(&self) -> &[TemplateFile] {
        &self.files
    }

    pub fn templates(&self) -> impl Iterator<Item = &TemplateFile> {
        self.files
            .iter()
            .filter(|f| matches!(f.kind, TemplateKind::Template { .. }))
    }

    pub fn partials(&self) -> impl Iterator<Item = &TemplateFile> {
        self.files.iter().filter(|f| f.kind == TemplateKind::Partial)
    }

    pub fn normal_files(&self) -> impl Iterator<Item = &TemplateFile> {
        self.files.iter().filter(|f| f.kind == TemplateKind::Normal)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Classify handlebars source by its first output-marker line
pub fn classify(source: &str, output_marker: &str) -> TemplateKind {
    match find_output_expression(source, output_marker) {
        Some(output) => TemplateKind::Template { output },
        None => TemplateKind::Partial,
    }
}

/// Text after the marker on the first line that contains it, trimmed
pub fn find_output_expression(source: &str, output_marker: &str) -> Option<String> {
    source.lines().find_map(|line| {
        line.rfind(output_marker)
            .map(|pos| line[pos + output_marker.len()..].trim().to_string())
    })
}
