//! Render engine
//!
//! One [`RenderEngine`] owns one handlebars registry for the whole invocation:
//! helpers, partials, template bodies and output-path expressions all live
//! there. Partials must be registered before any template is rendered.
//!
//! Bodies are registered under `@template/<relative path>`, a name no partial
//! file can produce, so `{{> name}}` only ever resolves to a partial.

use crate::template::{TemplateFile, TemplateKind, TemplateSet};
use crate::types::RenderContext;
use crate::{GencoderError, Result};
use handlebars::Handlebars;
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};

pub mod helpers;

/// Prefix of the registry keys holding template bodies
const TEMPLATE_KEY_PREFIX: &str = "@template/";

/// Suffix of the registry key holding a template's output-path expression
const OUTPUT_KEY_SUFFIX: &str = "#output";

/// A rendered template: where it goes and what it contains
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    /// Path relative to the output directory
    pub relative_path: PathBuf,
    pub content: String,
}

pub struct RenderEngine {
    registry: Handlebars<'static>,
    /// Template key -> first partial it includes (directly or through other partials) that does not exist
    missing_partials: HashMap<String, String>,
}

impl RenderEngine {
    /// Create an engine with the built-in helpers and no HTML escaping
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        helpers::register_builtin_helpers(&mut registry);
        Self {
            registry,
            missing_partials: HashMap::new(),
        }
    }

    /// Register a Rhai script as helper `name`, replacing any helper with that name
    pub fn register_script_helper(&mut self, name: &str, path: &Path) -> Result<()> {
        self.registry
            .register_script_helper_file(name, path)
            .map_err(|e| GencoderError::TemplateCompile {
                file: path.display().to_string(),
                message: format!("helper script: {}", e),
            })?;
        log::debug!("Registered script helper '{}' from {}", name, path.display());
        Ok(())
    }

    /// Register a Rhai script named after its file stem (`to_kotlin.rhai` -> `to_kotlin`)
    pub fn register_script_helper_file(&mut self, path: &Path) -> Result<()> {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                GencoderError::Config(format!("Invalid helper script path: {}", path.display()))
            })?;
        self.register_script_helper(&name, path)
    }

    /// Compile every partial, then every template body and output-path expression
    ///
    /// Any compile error aborts: later renders would see an incomplete registry.
    pub fn compile(&mut self, templates: &TemplateSet) -> Result<()> {
        let mut partial_refs: HashMap<String, Vec<String>> = HashMap::new();
        for partial in templates.partials() {
            let references = partial.partial_references();
            for name in partial.partial_names() {
                self.registry
                    .register_partial(&name, partial.source())
                    .map_err(|e| compile_error(partial, e))?;
                partial_refs.insert(name, references.clone());
            }
            log::debug!("Registered partial {}", partial.name);
        }

        for template in templates.templates() {
            self.compile_template(template)?;
            if let Some(missing) = find_missing_partial(template.partial_references(), &partial_refs) {
                log::debug!("Template {} includes unknown partial '{}'", template.key(), missing);
                self.missing_partials.insert(template.key(), missing);
            }
        }
        Ok(())
    }

    fn compile_template(&mut self, template: &TemplateFile) -> Result<()> {
        let output = match &template.kind {
            TemplateKind::Template { output } => output,
            _ => return Ok(()),
        };
        let key = body_key(template);
        self.registry
            .register_template_string(&format!("{}{}", key, OUTPUT_KEY_SUFFIX), output)
            .map_err(|e| compile_error(template, e))?;
        self.registry
            .register_template_string(&key, template.source())
            .map_err(|e| compile_error(template, e))?;
        log::debug!("Compiled template {}", template.key());
        Ok(())
    }

    /// Render the output path and then the body of a compiled template
    ///
    /// Including a partial that was never registered is an error, not empty text.
    pub fn render(&self, template: &TemplateFile, context: &RenderContext) -> Result<RenderedFile> {
        let name = template.key();
        if let Some(missing) = self.missing_partials.get(&name) {
            return Err(GencoderError::Render {
                template: name,
                message: format!("partial '{}' not found", missing),
            });
        }

        let key = body_key(template);
        let data = serde_json::to_value(context)?;

        let path = self
            .registry
            .render(&format!("{}{}", key, OUTPUT_KEY_SUFFIX), &data)
            .map_err(|e| render_error(&name, e))?;
        let relative_path = normalize_output_path(&path).ok_or_else(|| GencoderError::Render {
            template: name.clone(),
            message: format!("output path '{}' is empty or escapes the output directory", path),
        })?;

        let content = self
            .registry
            .render(&key, &data)
            .map_err(|e| render_error(&name, e))?;

        Ok(RenderedFile {
            relative_path,
            content,
        })
    }
}

impl Default for RenderEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn body_key(template: &TemplateFile) -> String {
    format!("{}{}", TEMPLATE_KEY_PREFIX, template.key())
}

/// Follow partial includes and return the first name with no registered partial
fn find_missing_partial(
    references: Vec<String>,
    partials: &HashMap<String, Vec<String>>,
) -> Option<String> {
    let mut pending: Vec<String> = references.into_iter().rev().collect();
    let mut seen = HashSet::new();
    while let Some(name) = pending.pop() {
        if !seen.insert(name.clone()) {
            continue;
        }
        match partials.get(&name) {
            Some(nested) => pending.extend(nested.iter().rev().cloned()),
            None => return Some(name),
        }
    }
    None
}

fn compile_error(file: &TemplateFile, e: handlebars::TemplateError) -> GencoderError {
    GencoderError::TemplateCompile {
        file: file.key(),
        message: e.to_string(),
    }
}

fn render_error(template: &str, e: handlebars::RenderError) -> GencoderError {
    GencoderError::Render {
        template: template.to_string(),
        message: e.to_string(),
    }
}

/// Trim a rendered output path and keep it relative to the output directory
///
/// Leading separators are dropped; `..` may not climb above the output directory.
fn normalize_output_path(raw: &str) -> Option<PathBuf> {
    let trimmed = raw.trim();
    let mut path = PathBuf::new();
    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !path.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => {}
        }
    }
    if path.as_os_str().is_empty() {
        None
    } else {
        Some(path)
    }
}
