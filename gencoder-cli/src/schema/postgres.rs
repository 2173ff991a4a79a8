//! PostgreSQL schema provider

use super::{introspect_with, SchemaProvider};
use anyhow::Result;
use async_trait::async_trait;
use gencoder_core::{group_index_rows, Column, IndexRow, Table};
use sqlx::{Pool, Postgres, Row};

pub struct PostgresProvider {
    pool: Pool<Postgres>,
}

impl PostgresProvider {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
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
        let table_row = sqlx::query(
            r#"
            SELECT t.table_schema::text AS table_schema,
                   t.table_name::text AS table_name,
                   obj_description(c.oid, 'pg_class') AS table_comment
            FROM information_schema.tables t
            JOIN pg_namespace n ON n.nspname = t.table_schema
            JOIN pg_class c ON c.relname = t.table_name AND c.relnamespace = n.oid
            WHERE t.table_schema = $1
              AND t.table_name = $2
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
            SELECT a.attnum::int8                        AS ordinal,
                   a.attname::text                       AS column_name,
                   format_type(a.atttypid, a.atttypmod)  AS data_type,
                   NOT a.attnotnull                      AS is_nullable,
                   pg_get_expr(ad.adbin, ad.adrelid)     AS default_value,
                   COALESCE(ct.contype = 'p', false)     AS is_primary_key,
                   d.description                         AS comment
            FROM pg_attribute a
                     JOIN pg_class c ON c.oid = a.attrelid
                     JOIN pg_namespace n ON n.oid = c.relnamespace
                     LEFT JOIN pg_constraint ct
                               ON ct.conrelid = c.oid AND a.attnum = ANY (ct.conkey) AND ct.contype = 'p'
                     LEFT JOIN pg_attrdef ad ON ad.adrelid = c.oid AND ad.adnum = a.attnum
                     LEFT JOIN pg_description d ON d.objoid = c.oid AND d.objsubid = a.attnum
            WHERE a.attisdropped = false
              AND n.nspname = $1
              AND c.relname = $2
              AND a.attnum > 0
            ORDER BY a.attnum
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
                data_type: row.try_get("data_type")?,
                is_nullable: row.try_get("is_nullable")?,
                default_value: row.try_get("default_value")?,
                is_primary_key: row.try_get("is_primary_key")?,
                comment: row.try_get("comment")?,
            });
        }
        Ok(columns)
    }

    async fn load_index_rows(&self, schema: &str, name: &str) -> Result<Vec<IndexRow>> {
        let rows = sqlx::query(
            r#"
            SELECT ic.relname::text                                                           AS index_name,
                   i.indisunique                                                              AS is_unique,
                   i.indisprimary                                                             AS is_primary,
                   row_number() OVER (PARTITION BY ic.relname ORDER BY indkey_col.ordinality) AS ordinal,
                   a.attname::text                                                            AS column_name
            FROM pg_index i
                     JOIN pg_class c ON c.oid = i.indrelid
                     JOIN pg_namespace n ON n.oid = c.relnamespace
                     JOIN pg_class ic ON ic.oid = i.indexrelid
                     LEFT JOIN LATERAL unnest(i.indkey) WITH ORDINALITY indkey_col(indkey_col, ordinality) ON TRUE
                     LEFT JOIN pg_attribute a ON i.indrelid = a.attrelid
                AND a.attnum = indkey_col.indkey_col
                AND a.attisdropped = false
            WHERE n.nspname = $1
              AND c.relname = $2
            ORDER BY ic.relname, indkey_col.ordinality
            "#,
        )
        .bind(schema)
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        let mut index_rows = Vec::with_capacity(rows.len());
        for row in rows {
            // Expression index entries have no backing column
            let Some(column_name) = row.try_get::<Option<String>, _>("column_name")? else {
                continue;
            };
            index_rows.push(IndexRow {
                index_name: row.try_get("index_name")?,
                is_unique: row.try_get("is_unique")?,
                is_primary: row.try_get("is_primary")?,
                ordinal: row.try_get("ordinal")?,
                column_name,
            });
        }
        Ok(index_rows)
    }
}

#[async_trait]
impl SchemaProvider for PostgresProvider {
    fn default_schema(&self) -> &str {
        "public"
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
