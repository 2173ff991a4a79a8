//! Table metadata and render context types

use crate::config::{DatabaseConfig, TableConfig};
use crate::properties::Properties;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A database table as seen by templates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub schema: String,
    pub name: String,
    pub comment: Option<String>,
    /// Sorted by ascending ordinal
    pub columns: Vec<Column>,
    /// Sorted primary first, then unique, then by name
    pub indexes: Vec<Index>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub ordinal: i64,
    pub name: String,
    /// Native type as reported by the database, e.g. `varchar(255)`
    #[serde(rename = "type")]
    pub data_type: String,
    pub is_nullable: bool,
    pub default_value: Option<String>,
    pub is_primary_key: bool,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Index {
    pub name: String,
    pub is_unique: bool,
    pub is_primary: bool,
    pub columns: Vec<IndexColumn>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexColumn {
    pub ordinal: i64,
    pub name: String,
}

/// One row of an index query: a single column of a single index
#[derive(Debug, Clone)]
pub struct IndexRow {
    pub index_name: String,
    pub is_unique: bool,
    pub is_primary: bool,
    pub ordinal: i64,
    pub column_name: String,
}

impl Table {
    /// Build a table, applying the column filter and the index ordering every provider must honor
    pub fn new(
        schema: impl Into<String>,
        name: impl Into<String>,
        comment: Option<String>,
        columns: Vec<Column>,
        mut indexes: Vec<Index>,
        ignore_columns: &[String],
    ) -> Self {
        sort_indexes(&mut indexes);
        Self {
            schema: schema.into(),
            name: name.into(),
            comment: comment.filter(|c| !c.is_empty()),
            columns: filter_columns(columns, ignore_columns),
            indexes,
        }
    }
}

/// Sort columns by ordinal and drop ignored names. Ordinals are kept, not renumbered.
pub fn filter_columns(mut columns: Vec<Column>, ignore_columns: &[String]) -> Vec<Column> {
    columns.sort_by_key(|c| c.ordinal);
    columns.retain(|c| !ignore_columns.iter().any(|ignored| ignored == &c.name));
    columns
}

/// Order indexes primary first, then unique, then by name ascending
pub fn sort_indexes(indexes: &mut [Index]) {
    indexes.sort_by(|a, b| {
        b.is_primary
            .cmp(&a.is_primary)
            .then(b.is_unique.cmp(&a.is_unique))
            .then_with(|| a.name.cmp(&b.name))
    });
}

/// Group per-column index rows into indexes, columns ordered by their position in the index
pub fn group_index_rows(rows: impl IntoIterator<Item = IndexRow>) -> Vec<Index> {
    let mut by_name: HashMap<String, Index> = HashMap::new();

    for row in rows {
        let index = by_name.entry(row.index_name.clone()).or_insert_with(|| Index {
            name: row.index_name.clone(),
            is_unique: row.is_unique,
            is_primary: row.is_primary,
            columns: Vec::new(),
        });
        index.columns.push(IndexColumn {
            ordinal: row.ordinal,
            name: row.column_name,
        });
    }

    let mut indexes: Vec<Index> = by_name
        .into_values()
        .map(|mut index| {
            index.columns.sort_by_key(|c| c.ordinal);
            index
        })
        .collect();
    sort_indexes(&mut indexes);
    indexes
}

/// Data bundle exposed to a template for one render
///
/// `table` is absent when generating boilerplate without a database.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderContext {
    pub table: Option<Table>,
    pub properties: Properties,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_config: Option<DatabaseConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_config: Option<TableConfig>,
}

impl RenderContext {
    /// Context for a table discovered in a configured database
    pub fn for_table(
        table: Table,
        properties: Properties,
        database: &DatabaseConfig,
        table_config: &TableConfig,
    ) -> Self {
        Self {
            table: Some(table),
            properties,
            database_config: Some(database.clone()),
            table_config: Some(table_config.clone()),
        }
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.table = Some(table);
        self
    }

    /// Context with no table, used for boilerplate generation
    pub fn without_table(properties: Properties) -> Self {
        Self {
            table: None,
            properties,
            database_config: None,
            table_config: None,
        }
    }
}
