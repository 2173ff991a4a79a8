//! SQLite schema provider

use super::{introspect_with, SchemaProvider};
use anyhow::Result;
use async_trait::async_trait;
use gencoder_core::{group_index_rows, Column, IndexRow, Table};
use sqlx::{Pool, Row, Sqlite};

/// Name given to the primary key when SQLite keeps it in the rowid
const ROWID_PRIMARY_KEY: &str = "PRIMARY";

pub struct SqliteProvider {
    pool: Pool<Sqlite>,
}

impl SqliteProvider {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    async fn load_table(
        &self,
        schema: &str,
        name: &str,
        ignore_columns: &[String],
    ) -> Result<Option<Table>> {
        let sql = format!(
            "SELECT name FROM {}.sqlite_master WHERE type IN ('table', 'view') AND name = ?1",
            quote_identifier(schema)
        );
        let table_row = sqlx::query(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        let Some(table_row) = table_row else {
            return Ok(None);
        };
        let table_name: String = table_row.try_get("name")?;

        let columns = self.load_columns(schema, &table_name).await?;
        let mut rows = self.load_index_rows(schema, &table_name).await?;
        if !rows.iter().any(|r| r.is_primary) {
            rows.extend(rowid_primary_key(&columns));
        }

        Ok(Some(Table::new(
            schema,
            table_name,
            None,
            columns,
            group_index_rows(rows),
            ignore_columns,
        )))
    }

    async fn load_columns(&self, schema: &str, name: &str) -> Result<Vec<Column>> {
        let rows = sqlx::query(
            r#"SELECT cid, name, type, "notnull", dflt_value, pk FROM pragma_table_info(?1, ?2)"#,
        )
        .bind(name)
        .bind(schema)
        .fetch_all(&self.pool)
        .await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let cid: i64 = row.try_get("cid")?;
            columns.push(Column {
                ordinal: cid + 1,
                name: row.try_get("name")?,
                data_type: row.try_get("type")?,
                is_nullable: row.try_get::<i64, _>("notnull")? == 0,
                default_value: row.try_get("dflt_value")?,
                is_primary_key: row.try_get::<i64, _>("pk")? > 0,
                comment: None,
            });
        }
        Ok(columns)
    }

    async fn load_index_rows(&self, schema: &str, name: &str) -> Result<Vec<IndexRow>> {
        let indexes = sqlx::query(r#"SELECT name, "unique", origin FROM pragma_index_list(?1, ?2)"#)
            .bind(name)
            .bind(schema)
            .fetch_all(&self.pool)
            .await?;

        let mut index_rows = Vec::new();
        for index in indexes {
            let index_name: String = index.try_get("name")?;
            let is_unique = index.try_get::<i64, _>("unique")? != 0;
            let is_primary = index.try_get::<String, _>("origin")? == "pk";

            let parts = sqlx::query("SELECT seqno, name FROM pragma_index_info(?1, ?2)")
                .bind(&index_name)
                .bind(schema)
                .fetch_all(&self.pool)
                .await?;
            for part in parts {
                // Expression parts have no column name
                let Some(column_name) = part.try_get::<Option<String>, _>("name")? else {
                    continue;
                };
                index_rows.push(IndexRow {
                    index_name: index_name.clone(),
                    is_unique,
                    is_primary,
                    ordinal: part.try_get::<i64, _>("seqno")? + 1,
                    column_name,
                });
            }
        }
        Ok(index_rows)
    }
}

#[async_trait]
impl SchemaProvider for SqliteProvider {
    fn default_schema(&self) -> &str {
        "main"
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

/// Index rows for a primary key kept in the rowid, which has no index of its own
fn rowid_primary_key(columns: &[Column]) -> Vec<IndexRow> {
    columns
        .iter()
        .filter(|c| c.is_primary_key)
        .enumerate()
        .map(|(i, c)| IndexRow {
            index_name: ROWID_PRIMARY_KEY.to_string(),
            is_unique: true,
            is_primary: true,
            ordinal: i as i64 + 1,
            column_name: c.name.clone(),
        })
        .collect()
}

fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn provider_with(dir: &TempDir, statements: &[&str]) -> SqliteProvider {
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let provider = SqliteProvider::connect(&url).await.unwrap();
        for statement in statements {
            sqlx::query(statement).execute(&provider.pool).await.unwrap();
        }
        provider
    }

    #[tokio::test]
    async fn test_introspect_table() {
        let dir = TempDir::new().unwrap();
        let provider = provider_with(
            &dir,
            &[
                "CREATE TABLE user (id INTEGER PRIMARY KEY, email VARCHAR(128) NOT NULL, \
                 name TEXT DEFAULT 'anon', password TEXT)",
                "CREATE UNIQUE INDEX uq_email ON user (email)",
                "CREATE INDEX ix_name_email ON user (name, email)",
            ],
        )
        .await;

        let ignore = vec!["password".to_string()];
        let table = provider
            .introspect("main", "user", &ignore)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(table.schema, "main");
        assert_eq!(table.name, "user");

        let names: Vec<_> = table.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "email", "name"]);
        assert_eq!(table.columns[1].data_type, "VARCHAR(128)");
        assert!(!table.columns[1].is_nullable);
        assert!(table.columns[0].is_primary_key);
        assert_eq!(table.columns[2].default_value.as_deref(), Some("'anon'"));

        let indexes: Vec<_> = table.indexes.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(indexes, vec![ROWID_PRIMARY_KEY, "uq_email", "ix_name_email"]);
        let composite: Vec<_> = table.indexes[2]
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(composite, vec!["name", "email"]);
    }

    #[tokio::test]
    async fn test_composite_primary_key_index() {
        let dir = TempDir::new().unwrap();
        let provider = provider_with(
            &dir,
            &["CREATE TABLE membership (user_id INTEGER, group_id INTEGER, PRIMARY KEY (user_id, group_id))"],
        )
        .await;

        let table = provider
            .introspect("main", "membership", &[])
            .await
            .unwrap()
            .unwrap();

        assert_eq!(table.indexes.len(), 1);
        assert!(table.indexes[0].is_primary);
        let columns: Vec<_> = table.indexes[0]
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(columns, vec!["user_id", "group_id"]);
    }

    #[tokio::test]
    async fn test_missing_table() {
        let dir = TempDir::new().unwrap();
        let provider = provider_with(&dir, &[]).await;

        let table = provider.introspect("main", "nope", &[]).await.unwrap();
        assert!(table.is_none());
    }
}
