//! PostgreSQL storage backend using sqlx.
//!
//! Provides `PostgresPageStore` and `PostgresSchemaStore` working directly on
//! the CMS database: the `pages` collection table, the form collection
//! tables, and the `directus_collections` / `directus_fields` metadata tables.
//!
//! # Feature flag
//!
//! This module is gated behind the `postgres` feature flag:
//! ```toml
//! [dependencies]
//! cms-automation = { version = "0.1", features = ["postgres"] }
//! ```
//!
//! # Error classification
//!
//! Column DDL failures are mapped to [`DdlErrorKind`] from their SQLSTATE:
//! `42703` (undefined column) and `42701` (duplicate column). Every other
//! database error is [`DdlErrorKind::Other`].

use crate::core::error::{DdlError, DdlErrorKind, DdlOperation, StorageError};
use crate::core::events::ItemKey;
use crate::core::field::{ColumnDef, ColumnType, ID_FIELD};
use crate::core::form::{CollectionMeta, FieldMeta};
use crate::core::page::{Page, PageStatus};
use crate::core::service::{ColumnSet, PageStore, SchemaStore, StorageResult};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

/// PostgreSQL error code for undefined column (42703).
pub const PG_UNDEFINED_COLUMN: &str = "42703";

/// PostgreSQL error code for duplicate column (42701).
pub const PG_DUPLICATE_COLUMN: &str = "42701";

/// Checks if a sqlx error has a specific PostgreSQL error code.
pub fn has_pg_error_code(err: &sqlx::Error, code: &str) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        db_err.code().as_deref() == Some(code)
    } else {
        false
    }
}

fn classify(err: &sqlx::Error) -> DdlErrorKind {
    if has_pg_error_code(err, PG_UNDEFINED_COLUMN) {
        DdlErrorKind::UndefinedColumn
    } else if has_pg_error_code(err, PG_DUPLICATE_COLUMN) {
        DdlErrorKind::DuplicateColumn
    } else {
        DdlErrorKind::Other
    }
}

/// Quote an identifier for interpolation into SQL
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// LIKE pattern matching every string starting with `prefix`
///
/// `%`, `_` and the escape character itself are escaped so the prefix is
/// matched literally.
pub fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn storage_err(operation: &str) -> impl FnOnce(sqlx::Error) -> StorageError + '_ {
    move |e| StorageError::new(operation, e)
}

// ---------------------------------------------------------------------------
// PostgresPageStore
// ---------------------------------------------------------------------------

type PageRow = (String, Option<String>, String, Option<String>);

fn page_from_row((id, title, permalink, status): PageRow) -> Page {
    Page {
        id: ItemKey::parse(&id),
        title,
        permalink,
        status: PageStatus::from(status.unwrap_or_default()),
    }
}

fn key_strings(ids: &[ItemKey]) -> Vec<String> {
    ids.iter().map(ToString::to_string).collect()
}

/// Page store backed by the CMS `pages` table.
///
/// Ids are compared as text so integer and uuid primary keys both work.
#[derive(Clone, Debug)]
pub struct PostgresPageStore {
    pool: PgPool,
    table: String,
}

impl PostgresPageStore {
    pub fn new(pool: PgPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn table(&self) -> String {
        quote_ident(&self.table)
    }
}

#[async_trait]
impl PageStore for PostgresPageStore {
    async fn find_by_ids(&self, ids: &[ItemKey]) -> StorageResult<Vec<Page>> {
        let sql = format!(
            "SELECT id::text, title, permalink, status FROM {} WHERE id::text = ANY($1)",
            self.table()
        );
        let rows = sqlx::query_as::<_, PageRow>(&sql)
            .bind(key_strings(ids))
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err("find pages"))?;

        Ok(rows.into_iter().map(page_from_row).collect())
    }

    async fn find_by_id(&self, id: &ItemKey) -> StorageResult<Option<Page>> {
        let sql = format!(
            "SELECT id::text, title, permalink, status FROM {} WHERE id::text = $1",
            self.table()
        );
        let row = sqlx::query_as::<_, PageRow>(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err("find page"))?;

        Ok(row.map(page_from_row))
    }

    async fn update_status(&self, id: &ItemKey, status: &PageStatus) -> StorageResult<()> {
        let sql = format!("UPDATE {} SET status = $1 WHERE id::text = $2", self.table());
        sqlx::query(&sql)
            .bind(status.as_str())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(storage_err("update page status"))?;
        Ok(())
    }

    async fn update_status_by_prefix(
        &self,
        prefix: &str,
        status: &PageStatus,
    ) -> StorageResult<Vec<ItemKey>> {
        let sql = format!(
            "UPDATE {} SET status = $1 \
             WHERE permalink ILIKE $2 ESCAPE '\\' AND status IS DISTINCT FROM $1 \
             RETURNING id::text",
            self.table()
        );
        let ids: Vec<(String,)> = sqlx::query_as(&sql)
            .bind(status.as_str())
            .bind(like_prefix(prefix))
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err("cascade page status"))?;

        Ok(ids.into_iter().map(|(id,)| ItemKey::parse(&id)).collect())
    }

    async fn delete_by_prefix_except(&self, prefix: &str) -> StorageResult<Vec<ItemKey>> {
        let sql = format!(
            "DELETE FROM {} WHERE permalink ILIKE $1 ESCAPE '\\' AND permalink <> $2 \
             RETURNING id::text",
            self.table()
        );
        let ids: Vec<(String,)> = sqlx::query_as(&sql)
            .bind(like_prefix(prefix))
            .bind(prefix)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err("cascade page delete"))?;

        Ok(ids.into_iter().map(|(id,)| ItemKey::parse(&id)).collect())
    }
}

// ---------------------------------------------------------------------------
// PostgresSchemaStore
// ---------------------------------------------------------------------------

/// Schema store creating form collections in `schema` and registering them
/// in the CMS metadata tables.
#[derive(Clone, Debug)]
pub struct PostgresSchemaStore {
    pool: PgPool,
    schema: String,
}

impl PostgresSchemaStore {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn qualified(&self, table: &str) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(table))
    }

    async fn execute_ddl(
        &self,
        operation: DdlOperation,
        table: &str,
        column: &str,
        sql: &str,
    ) -> Result<(), DdlError> {
        tracing::debug!(sql = %sql, "Executing DDL");
        sqlx::query(sql)
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| DdlError::new(classify(&e), operation, table, column, e))
    }
}

#[async_trait]
impl SchemaStore for PostgresSchemaStore {
    async fn has_table(&self, table: &str) -> StorageResult<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
             WHERE table_schema = $1 AND table_name = $2)",
        )
        .bind(&self.schema)
        .bind(table)
        .fetch_one(&self.pool)
        .await
        .map_err(storage_err("has table"))?;

        Ok(exists)
    }

    async fn create_table(&self, table: &str, columns: &[ColumnDef]) -> StorageResult<()> {
        let mut definitions = vec![format!(
            "{} uuid PRIMARY KEY DEFAULT gen_random_uuid()",
            quote_ident(ID_FIELD)
        )];
        definitions.extend(
            columns
                .iter()
                .map(|c| format!("{} {}", quote_ident(&c.name), c.column_type.sql_type())),
        );

        let sql = format!(
            "CREATE TABLE {} ({})",
            self.qualified(table),
            definitions.join(", ")
        );
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(storage_err("create table"))?;
        Ok(())
    }

    async fn columns(&self, table: &str) -> StorageResult<ColumnSet> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT column_name::text, data_type::text FROM information_schema.columns \
             WHERE table_schema = $1 AND table_name = $2 AND column_name <> $3",
        )
        .bind(&self.schema)
        .bind(table)
        .bind(ID_FIELD)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err("list columns"))?;

        Ok(rows
            .into_iter()
            .map(|(name, data_type)| (name, ColumnType::from_sql_type(&data_type)))
            .collect())
    }

    async fn drop_column(&self, table: &str, column: &str) -> Result<(), DdlError> {
        let sql = format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.qualified(table),
            quote_ident(column)
        );
        self.execute_ddl(DdlOperation::DropColumn, table, column, &sql)
            .await
    }

    async fn alter_column(&self, table: &str, column: &ColumnDef) -> Result<(), DdlError> {
        let name = quote_ident(&column.name);
        let sql = format!(
            "ALTER TABLE {} ALTER COLUMN {} TYPE {} USING {}::{}",
            self.qualified(table),
            name,
            column.column_type.sql_type(),
            name,
            column.column_type.sql_type()
        );
        self.execute_ddl(DdlOperation::AlterColumn, table, &column.name, &sql)
            .await
    }

    async fn add_column(&self, table: &str, column: &ColumnDef) -> Result<(), DdlError> {
        let sql = format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            self.qualified(table),
            quote_ident(&column.name),
            column.column_type.sql_type()
        );
        self.execute_ddl(DdlOperation::AddColumn, table, &column.name, &sql)
            .await
    }

    async fn form_collection_key(
        &self,
        forms_collection: &str,
        form_id: &ItemKey,
    ) -> StorageResult<Option<String>> {
        let sql = format!(
            "SELECT \"key\" FROM {} WHERE id::text = $1",
            quote_ident(forms_collection)
        );
        let row: Option<(String,)> = sqlx::query_as(&sql)
            .bind(form_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err("get form key"))?;

        Ok(row.map(|(key,)| key))
    }

    async fn upsert_collection_meta(&self, meta: &CollectionMeta) -> StorageResult<()> {
        sqlx::query(
            "INSERT INTO directus_collections \
             (collection, singleton, sort_field, accountability, \"group\", versioning, hidden, archive_app_filter) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (collection) DO NOTHING",
        )
        .bind(&meta.collection)
        .bind(meta.singleton)
        .bind(&meta.sort_field)
        .bind(&meta.accountability)
        .bind(&meta.group)
        .bind(meta.versioning)
        .bind(meta.hidden)
        .bind(meta.archive_app_filter)
        .execute(&self.pool)
        .await
        .map_err(storage_err("upsert collection meta"))?;
        Ok(())
    }

    async fn field_meta_names(&self, collection: &str) -> StorageResult<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT field FROM directus_fields WHERE collection = $1 AND field <> $2",
        )
        .bind(collection)
        .bind(ID_FIELD)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err("list field meta"))?;

        Ok(rows.into_iter().map(|(field,)| field).collect())
    }

    async fn delete_field_meta(&self, collection: &str, fields: &[String]) -> StorageResult<()> {
        sqlx::query("DELETE FROM directus_fields WHERE collection = $1 AND field = ANY($2)")
            .bind(collection)
            .bind(fields)
            .execute(&self.pool)
            .await
            .map_err(storage_err("delete field meta"))?;
        Ok(())
    }

    async fn upsert_field_meta(&self, batch: &[FieldMeta]) -> StorageResult<()> {
        // directus_fields has no unique key on (collection, field): update
        // what exists, insert the rest.
        let mut missing = Vec::new();
        for meta in batch {
            let updated = sqlx::query(
                "UPDATE directus_fields SET special = $3, interface = $4, required = $5, \
                 sort = $6, width = $7, readonly = $8, hidden = $9 \
                 WHERE collection = $1 AND field = $2",
            )
            .bind(&meta.collection)
            .bind(&meta.field)
            .bind(&meta.special)
            .bind(&meta.interface)
            .bind(meta.required)
            .bind(meta.sort)
            .bind(&meta.width)
            .bind(meta.readonly)
            .bind(meta.hidden)
            .execute(&self.pool)
            .await
            .map_err(storage_err("update field meta"))?;

            if updated.rows_affected() == 0 {
                missing.push(meta);
            }
        }

        if missing.is_empty() {
            return Ok(());
        }

        let mut insert: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO directus_fields \
             (collection, field, special, interface, required, sort, width, readonly, hidden) ",
        );
        insert.push_values(missing, |mut row, meta| {
            row.push_bind(&meta.collection)
                .push_bind(&meta.field)
                .push_bind(&meta.special)
                .push_bind(&meta.interface)
                .push_bind(meta.required)
                .push_bind(meta.sort)
                .push_bind(&meta.width)
                .push_bind(meta.readonly)
                .push_bind(meta.hidden);
        });

        insert
            .build()
            .execute(&self.pool)
            .await
            .map_err(storage_err("insert field meta"))?;
        Ok(())
    }
}
