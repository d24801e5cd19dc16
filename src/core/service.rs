//! Storage traits the hook handlers depend on
//!
//! The CMS owns the database; handlers reach it only through these traits so
//! that the same logic runs over PostgreSQL or the in-memory backends.

use crate::core::error::{DdlError, StorageError};
use crate::core::events::ItemKey;
use crate::core::field::{ColumnDef, ColumnType};
use crate::core::form::{CollectionMeta, FieldMeta};
use crate::core::page::{Page, PageStatus};
use async_trait::async_trait;
use std::collections::BTreeMap;

pub type StorageResult<T> = Result<T, StorageError>;

/// Columns of a form collection, identifier excluded
///
/// The type is `None` when the backend reports a type this crate never creates.
pub type ColumnSet = BTreeMap<String, Option<ColumnType>>;

/// Access to the `pages` collection
#[async_trait]
pub trait PageStore: Send + Sync {
    /// Pages whose id is in `ids`
    async fn find_by_ids(&self, ids: &[ItemKey]) -> StorageResult<Vec<Page>>;

    /// A single page by id
    async fn find_by_id(&self, id: &ItemKey) -> StorageResult<Option<Page>>;

    /// Set the status of one page
    async fn update_status(&self, id: &ItemKey, status: &PageStatus) -> StorageResult<()>;

    /// Set `status` on every page whose permalink starts with `prefix`
    /// (case-insensitive) and whose status differs; returns the updated ids
    async fn update_status_by_prefix(
        &self,
        prefix: &str,
        status: &PageStatus,
    ) -> StorageResult<Vec<ItemKey>>;

    /// Delete every page whose permalink starts with `prefix`
    /// (case-insensitive), except the page whose permalink equals `prefix`
    async fn delete_by_prefix_except(&self, prefix: &str) -> StorageResult<Vec<ItemKey>>;
}

/// Physical schema and CMS metadata of form collections
#[async_trait]
pub trait SchemaStore: Send + Sync {
    async fn has_table(&self, table: &str) -> StorageResult<bool>;

    /// Create `table` with a generated uuid identifier and `columns`
    async fn create_table(&self, table: &str, columns: &[ColumnDef]) -> StorageResult<()>;

    async fn columns(&self, table: &str) -> StorageResult<ColumnSet>;

    async fn drop_column(&self, table: &str, column: &str) -> Result<(), DdlError>;

    async fn alter_column(&self, table: &str, column: &ColumnDef) -> Result<(), DdlError>;

    async fn add_column(&self, table: &str, column: &ColumnDef) -> Result<(), DdlError>;

    /// Submission collection name (`key`) of the form with id `form_id`
    async fn form_collection_key(
        &self,
        forms_collection: &str,
        form_id: &ItemKey,
    ) -> StorageResult<Option<String>>;

    async fn upsert_collection_meta(&self, meta: &CollectionMeta) -> StorageResult<()>;

    /// Field names registered for `collection`, identifier excluded
    async fn field_meta_names(&self, collection: &str) -> StorageResult<Vec<String>>;

    async fn delete_field_meta(&self, collection: &str, fields: &[String]) -> StorageResult<()>;

    /// Insert or update one batch of field metadata rows
    async fn upsert_field_meta(&self, batch: &[FieldMeta]) -> StorageResult<()>;
}
