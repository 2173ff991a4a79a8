//! Property maps and override resolution

use crate::{GencoderError, Result};
use indexmap::IndexMap;

/// Flat string properties, kept in declaration order
pub type Properties = IndexMap<String, String>;

/// Merge property layers; later layers overwrite keys from earlier ones
///
/// The usual order is global, database, table, command line.
pub fn resolve<'a>(layers: impl IntoIterator<Item = &'a Properties>) -> Properties {
    let mut resolved = Properties::new();
    for layer in layers {
        for (key, value) in layer {
            resolved.insert(key.clone(), value.clone());
        }
    }
    resolved
}

/// Parse `key=value` command-line overrides
pub fn parse_overrides<S: AsRef<str>>(pairs: &[S]) -> Result<Properties> {
    let mut properties = Properties::new();
    for pair in pairs {
        let pair = pair.as_ref();
        match pair.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                properties.insert(key.trim().to_string(), value.to_string());
            }
            _ => {
                return Err(GencoderError::Config(format!(
                    "Invalid property '{}', expected key=value",
                    pair
                )))
            }
        }
    }
    Ok(properties)
}
