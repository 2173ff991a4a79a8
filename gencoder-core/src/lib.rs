//! gencoder core - render and merge pipeline for schema-driven code generation
//!
//! This crate turns database table metadata into files on disk:
//!
//! - **Property resolution** across global, database, table and command-line maps
//! - **Template classification** into templates, partials and plain files
//! - **Rendering** through an explicit handlebars registry with built-in helpers
//! - **Block merging** so hand-edited regions survive regeneration
//! - **Materialization** of rendered output under an output directory
//!
//! # Example
//!
//! ```rust
//! use gencoder_core::merge::{merge_blocks, BlockMarkers};
//!
//! let markers = BlockMarkers::default();
//! let old = "keep\n// @gencoder.block.start: a\nold\n// @gencoder.block.end: a\ntail";
//! let new = "ignored\n// @gencoder.block.start: a\nnew\n// @gencoder.block.end: a\n";
//!
//! let merged = merge_blocks(&markers, old, new);
//! assert_eq!(merged, "keep\n// @gencoder.block.start: a\nnew\n// @gencoder.block.end: a\ntail");
//! ```

use std::path::PathBuf;
use thiserror::Error;

pub mod config;
pub mod materialize;
pub mod merge;
pub mod properties;
pub mod render;
pub mod template;
pub mod types;

pub use config::{BlockMarker, Config, DatabaseConfig, TableConfig};
pub use merge::BlockMarkers;
pub use render::RenderEngine;
pub use template::{TemplateFile, TemplateKind, TemplateSet};
pub use types::*;

/// gencoder errors
///
/// Every variant except I/O wrappers maps to one failure class of a generation run.
/// A missing table is not an error: providers report it as `Ok(None)`.
#[derive(Error, Debug)]
pub enum GencoderError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to compile template '{file}': {message}")]
    TemplateCompile { file: String, message: String },

    #[error("Schema introspection failed: {0}")]
    SchemaIntrospection(String),

    #[error("Failed to render template '{template}': {message}")]
    Render { template: String, message: String },

    #[error("Failed to write '{}': {source}", path.display())]
    Materialize {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GencoderError>;
