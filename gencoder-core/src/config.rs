//! Configuration file model (`gencoder.yaml`)

use crate::properties::Properties;
use crate::{GencoderError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_TEMPLATES: &str = "templates";
pub const DEFAULT_OUTPUT_MARKER: &str = "@gencoder.generated:";
pub const DEFAULT_BLOCK_START: &str = "@gencoder.block.start:";
pub const DEFAULT_BLOCK_END: &str = "@gencoder.block.end:";
pub const DEFAULT_OUTPUT: &str = ".";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Local directory or GitHub URL holding the templates
    pub templates: Option<String>,
    pub output_marker: Option<String>,
    pub block_marker: BlockMarker,
    pub databases: Vec<DatabaseConfig>,
    /// Global properties, overridden by database and table properties
    pub properties: Properties,
    pub output: Option<String>,
    /// Rhai helper scripts registered before rendering
    pub helpers: Vec<String>,
    /// Upper bound on concurrent table introspections per database
    pub concurrency: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseConfig {
    pub name: Option<String>,
    #[serde(skip_serializing)]
    pub dsn: String,
    pub schema: Option<String>,
    pub properties: Properties,
    pub tables: Vec<TableConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableConfig {
    pub name: String,
    /// Overrides the database schema for this table
    pub schema: Option<String>,
    pub properties: Properties,
    pub ignore_columns: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockMarker {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl Config {
    /// Load configuration from a YAML file
    pub async fn from_file(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            GencoderError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Self::from_yaml(&contents).map_err(|e| match e {
            GencoderError::Config(msg) => {
                GencoderError::Config(format!("{} ({})", msg, path.display()))
            }
            other => other,
        })
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(contents)
            .map_err(|e| GencoderError::Config(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (i, database) in self.databases.iter().enumerate() {
            if database.dsn.trim().is_empty() {
                return Err(GencoderError::Config(format!(
                    "databases[{}]: 'dsn' is required",
                    i
                )));
            }
            if let Some(table) = database.tables.iter().find(|t| t.name.trim().is_empty()) {
                return Err(GencoderError::Config(format!(
                    "databases[{}]: table entry without a name (schema: {:?})",
                    i, table.schema
                )));
            }
        }
        if self.concurrency == Some(0) {
            return Err(GencoderError::Config(
                "'concurrency' must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn templates(&self) -> &str {
        non_empty(&self.templates).unwrap_or(DEFAULT_TEMPLATES)
    }

    pub fn output_marker(&self) -> &str {
        non_empty(&self.output_marker).unwrap_or(DEFAULT_OUTPUT_MARKER)
    }

    pub fn output(&self) -> &str {
        non_empty(&self.output).unwrap_or(DEFAULT_OUTPUT)
    }
}

impl BlockMarker {
    pub fn start(&self) -> &str {
        non_empty(&self.start).unwrap_or(DEFAULT_BLOCK_START)
    }

    pub fn end(&self) -> &str {
        non_empty(&self.end).unwrap_or(DEFAULT_BLOCK_END)
    }
}

impl DatabaseConfig {
    /// Display name for logs: the configured name, or the DSN with credentials masked
    pub fn display_name(&self) -> String {
        match non_empty(&self.name) {
            Some(name) => name.to_string(),
            None => mask_dsn(&self.dsn),
        }
    }
}

impl TableConfig {
    /// Schema to introspect: the table override, else the database schema
    pub fn effective_schema<'a>(&'a self, database: &'a DatabaseConfig) -> Option<&'a str> {
        non_empty(&self.schema).or_else(|| non_empty(&database.schema))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Mask the credential part of a connection string for display
pub fn mask_dsn(dsn: &str) -> String {
    match dsn.split_once("://") {
        Some((scheme, rest)) => match rest.rfind('@') {
            Some(at_pos) => format!("{}://***{}", scheme, &rest[at_pos..]),
            None => format!("{}://{}", scheme, rest),
        },
        None => "***".to_string(),
    }
}
