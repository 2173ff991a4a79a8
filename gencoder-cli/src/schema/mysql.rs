//! MySQL schema provider

use super::{introspect_with, SchemaProvider};
use anyhow::Result;
use async_trait::async_trait;
use gencoder_core::{group_index_rows, Column, IndexRow, Table};
use sqlx::{MySql, Pool, Row};

pub struct MySqlProvider {
    pool: Pool<MySql>,
    db_name: String,
}

impl MySqlProvider {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = sqlx::mysql::MySqlPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        // Current database, falling back to the DSN path
        let db_name_row = sqlx::query("SELECT CAST(DATABASE() AS CHAR) as db_name")
            .fetch_one(&pool)
            .await?;
        let db_name = match db_name_row.try_get::<Option<String>, _>("db_name")? {
            Some(name) if !name.is_empty() => name,
            _ => database_from_dsn(database_url).unwrap_or_default(),
        };
        if db_name.is_empty() {
            log::warn!("No database selected in DSN; tables without a schema will not be found");
        }

        Ok(Self { pool, db_name })
    }

    async fn load_table(
        &self,
        schema: &str,
        name: &str,
        ignore_columns: &[String],
    ) -> Result<Option<Table>> {
        let table_row = sqlx::query(
            r#"
            SELECT CAST(TABLE_SCHEMA AS CHAR) as table_schema,
                   CAST(TABLE_NAME AS CHAR) as table_name,
                   CAST(TABLE_COMMENT AS CHAR) as table_comment
            FROM information_schema.tables
            WHERE TABLE_SCHEMA = ?
              AND TABLE_NAME = ?
            "#,
        )
        .bind(schema)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        let Some(table_row) = table_row else {
            return Ok(None);
        };

        let columns = self.load_columns(schema, name).await?;
        let rows = self.load_index_rows(schema, name).await?;

        Ok(Some(Table::new(
            table_row.try_get::<String, _>("table_schema")?,
            table_row.try_get::<String, _>("table_name")?,
            table_row.try_get("table_comment")?,
            columns,
            group_index_rows(rows),
            ignore_columns,
        )))
    }

    async fn load_columns(&self, schema: &str, name: &str) -> Result<Vec<Column>> {
        let rows = sqlx::query(
            r#"
            SELECT CAST(ORDINAL_POSITION AS SIGNED) as ordinal,
                   CAST(COLUMN_NAME AS CHAR) as column_name,
                   CAST(COLUMN_TYPE AS CHAR) as column_type,
                   CAST(IS_NULLABLE = 'YES' AS SIGNED) as is_nullable,
                   CAST(COLUMN_DEFAULT AS CHAR) as column_default,
                   CAST(COLUMN_KEY = 'PRI' AS SIGNED) as is_primary_key,
                   CAST(COLUMN_COMMENT AS CHAR) as column_comment
            FROM information_schema.columns
            WHERE TABLE_SCHEMA = ?
              AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
            "#,
        )
        .bind(schema)
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            columns.push(Column {
                ordinal: row.try_get("ordinal")?,
                name: row.try_get("column_name")?,
                data_type: row.try_get("column_type")?,
                is_nullable: row.try_get::<i64, _>("is_nullable")? != 0,
                default_value: row.try_get("column_default")?,
                is_primary_key: row.try_get::<i64, _>("is_primary_key")? != 0,
                comment: row
                    .try_get::<Option<String>, _>("column_comment")?
                    .filter(|c| !c.is_empty()),
            });
        }
        Ok(columns)
    }

    async fn load_index_rows(&self, schema: &str, name: &str) -> Result<Vec<IndexRow>> {
        let rows = sqlx::query(
            r#"
            SELECT CAST(INDEX_NAME AS CHAR) as index_name,
                   CAST(NON_UNIQUE = 0 AS SIGNED) as is_unique,
                   CAST(INDEX_NAME = 'PRIMARY' AS SIGNED) as is_primary,
                   CAST(SEQ_IN_INDEX AS SIGNED) as ordinal,
                   CAST(COLUMN_NAME AS CHAR) as column_name
            FROM information_schema.statistics
            WHERE TABLE_SCHEMA = ?
              AND TABLE_NAME = ?
            ORDER BY INDEX_NAME, SEQ_IN_INDEX
            "#,
        )
        .bind(schema)
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        let mut index_rows = Vec::with_capacity(rows.len());
        for row in rows {
            // Functional key parts have no column name
            let Some(column_name) = row.try_get::<Option<String>, _>("column_name")? else {
                continue;
            };
            index_rows.push(IndexRow {
                index_name: row.try_get("index_name")?,
                is_unique: row.try_get::<i64, _>("is_unique")? != 0,
                is_primary: row.try_get::<i64, _>("is_primary")? != 0,
                ordinal: row.try_get("ordinal")?,
                column_name,
            });
        }
        Ok(index_rows)
    }
}

#[async_trait]
impl SchemaProvider for MySqlProvider {
    fn default_schema(&self) -> &str {
        &self.db_name
    }

    async fn introspect(
        &self,
        schema: &str,
        table: &str,
        ignore_columns: &[String],
    ) -> gencoder_core::Result<Option<Table>> {
        introspect_with(schema, table, self.load_table(schema, table, ignore_columns)).await
    }
}

/// Database name from the path of a `mysql://` DSN
fn database_from_dsn(dsn: &str) -> Option<String> {
    let url = url::Url::parse(dsn).ok()?;
    let name = url.path().trim_start_matches('/');
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
