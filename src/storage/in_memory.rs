//! In-memory implementations of PageStore and SchemaStore for testing and development

use crate::core::error::{DdlError, DdlErrorKind, DdlOperation, StorageError};
use crate::core::events::ItemKey;
use crate::core::field::{ColumnDef, ColumnType, ID_FIELD};
use crate::core::form::{CollectionMeta, FieldMeta};
use crate::core::page::{Page, PageStatus};
use crate::core::service::{ColumnSet, PageStore, SchemaStore, StorageResult};
use crate::pages::cascade::{select_delete_cascade, select_status_cascade};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

fn read<'a, T>(lock: &'a RwLock<T>, operation: &str) -> StorageResult<RwLockReadGuard<'a, T>> {
    lock.read()
        .map_err(|e| StorageError::new(operation, format!("Failed to acquire read lock: {}", e)))
}

fn write<'a, T>(lock: &'a RwLock<T>, operation: &str) -> StorageResult<RwLockWriteGuard<'a, T>> {
    lock.write()
        .map_err(|e| StorageError::new(operation, format!("Failed to acquire write lock: {}", e)))
}

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

/// In-memory page store
///
/// Uses RwLock for thread-safe access. Prefix operations go through the
/// same selection functions the cascade resolver documents, and keys are
/// compared with [`ItemKey::matches`] like the SQL backends compare `id::text`.
#[derive(Clone, Default)]
pub struct InMemoryPageStore {
    pages: Arc<RwLock<Vec<Page>>>,
    failing_prefixes: Arc<RwLock<HashSet<String>>>,
}

impl InMemoryPageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pages(pages: impl IntoIterator<Item = Page>) -> Self {
        Self {
            pages: Arc::new(RwLock::new(pages.into_iter().collect())),
            failing_prefixes: Arc::default(),
        }
    }

    pub fn insert(&self, page: Page) -> StorageResult<()> {
        write(&self.pages, "insert page")?.push(page);
        Ok(())
    }

    /// Snapshot of every page
    pub fn all(&self) -> StorageResult<Vec<Page>> {
        Ok(read(&self.pages, "list pages")?.clone())
    }

    pub fn by_permalink(&self, permalink: &str) -> StorageResult<Option<Page>> {
        Ok(read(&self.pages, "get page")?
            .iter()
            .find(|page| page.permalink == permalink)
            .cloned())
    }

    /// Make every prefix operation on `prefix` fail
    pub fn fail_prefix(&self, prefix: impl Into<String>) -> StorageResult<()> {
        write(&self.failing_prefixes, "fail prefix")?.insert(prefix.into());
        Ok(())
    }

    fn check_prefix(&self, prefix: &str, operation: &str) -> StorageResult<()> {
        if read(&self.failing_prefixes, operation)?.contains(prefix) {
            return Err(StorageError::new(
                operation,
                format!("simulated failure for prefix '{}'", prefix),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl PageStore for InMemoryPageStore {
    async fn find_by_ids(&self, ids: &[ItemKey]) -> StorageResult<Vec<Page>> {
        Ok(read(&self.pages, "find pages")?
            .iter()
            .filter(|page| ids.iter().any(|id| id.matches(&page.id)))
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: &ItemKey) -> StorageResult<Option<Page>> {
        Ok(read(&self.pages, "find page")?
            .iter()
            .find(|page| page.id.matches(id))
            .cloned())
    }

    async fn update_status(&self, id: &ItemKey, status: &PageStatus) -> StorageResult<()> {
        let mut pages = write(&self.pages, "update page status")?;
        let page = pages
            .iter_mut()
            .find(|page| page.id.matches(id))
            .ok_or_else(|| StorageError::new("update page status", format!("no page {}", id)))?;
        page.status = status.clone();
        Ok(())
    }

    async fn update_status_by_prefix(
        &self,
        prefix: &str,
        status: &PageStatus,
    ) -> StorageResult<Vec<ItemKey>> {
        self.check_prefix(prefix, "cascade page status")?;
        let mut pages = write(&self.pages, "cascade page status")?;

        let ids = select_status_cascade(pages.iter(), prefix, status);
        for page in pages.iter_mut().filter(|page| ids.contains(&page.id)) {
            page.status = status.clone();
        }

        Ok(ids)
    }

    async fn delete_by_prefix_except(&self, prefix: &str) -> StorageResult<Vec<ItemKey>> {
        self.check_prefix(prefix, "cascade page delete")?;
        let mut pages = write(&self.pages, "cascade page delete")?;

        let ids = select_delete_cascade(pages.iter(), prefix);
        pages.retain(|page| !ids.contains(&page.id));

        Ok(ids)
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

#[derive(Default)]
struct SchemaState {
    tables: HashMap<String, BTreeMap<String, ColumnType>>,
    forms: HashMap<(String, ItemKey), String>,
    collections: BTreeMap<String, CollectionMeta>,
    fields: Vec<FieldMeta>,
    failures: HashMap<(String, String), DdlErrorKind>,
    ddl_log: Vec<String>,
}

/// In-memory schema store
///
/// Tables are column maps; every applied DDL statement is appended to a log
/// so tests can check what ran. Failures can be injected per column to
/// exercise the tolerated/fatal classification.
#[derive(Clone, Default)]
pub struct InMemorySchemaStore {
    state: Arc<RwLock<SchemaState>>,
}

impl InMemorySchemaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a form row pointing at its submissions collection
    pub fn insert_form(
        &self,
        forms_collection: &str,
        form_id: impl Into<ItemKey>,
        key: impl Into<String>,
    ) -> StorageResult<()> {
        write(&self.state, "insert form")?
            .forms
            .insert((forms_collection.to_string(), form_id.into()), key.into());
        Ok(())
    }

    /// Make the next DDL statement on `table.column` fail with `kind`
    pub fn fail_column(&self, table: &str, column: &str, kind: DdlErrorKind) -> StorageResult<()> {
        write(&self.state, "fail column")?
            .failures
            .insert((table.to_string(), column.to_string()), kind);
        Ok(())
    }

    /// Physical columns of `table`, identifier included
    pub fn table(&self, table: &str) -> StorageResult<Option<BTreeMap<String, ColumnType>>> {
        Ok(read(&self.state, "get table")?.tables.get(table).cloned())
    }

    pub fn collection_meta(&self, collection: &str) -> StorageResult<Option<CollectionMeta>> {
        Ok(read(&self.state, "get collection meta")?
            .collections
            .get(collection)
            .cloned())
    }

    /// Field metadata of `collection` ordered by sort
    pub fn field_meta(&self, collection: &str) -> StorageResult<Vec<FieldMeta>> {
        let state = read(&self.state, "get field meta")?;
        let mut metas: Vec<FieldMeta> = state
            .fields
            .iter()
            .filter(|meta| meta.collection == collection)
            .cloned()
            .collect();
        metas.sort_by_key(|meta| meta.sort);
        Ok(metas)
    }

    /// Every DDL statement applied so far
    pub fn ddl_log(&self) -> StorageResult<Vec<String>> {
        Ok(read(&self.state, "get ddl log")?.ddl_log.clone())
    }

    fn column_op(
        &self,
        operation: DdlOperation,
        table: &str,
        column: &str,
        apply: impl FnOnce(&mut BTreeMap<String, ColumnType>) -> Result<String, DdlErrorKind>,
    ) -> Result<(), DdlError> {
        let fail = |kind: DdlErrorKind, message: &str| {
            DdlError::new(kind, operation, table, column, message)
        };

        let mut state = self
            .state
            .write()
            .map_err(|e| fail(DdlErrorKind::Other, &e.to_string()))?;

        if let Some(kind) = state
            .failures
            .remove(&(table.to_string(), column.to_string()))
        {
            return Err(fail(kind, "injected failure"));
        }

        let columns = state
            .tables
            .get_mut(table)
            .ok_or_else(|| fail(DdlErrorKind::Other, "relation does not exist"))?;

        match apply(columns) {
            Ok(statement) => {
                state.ddl_log.push(statement);
                Ok(())
            }
            Err(DdlErrorKind::UndefinedColumn) => Err(fail(
                DdlErrorKind::UndefinedColumn,
                "column does not exist",
            )),
            Err(DdlErrorKind::DuplicateColumn) => Err(fail(
                DdlErrorKind::DuplicateColumn,
                "column already exists",
            )),
            Err(kind) => Err(fail(kind, "statement failed")),
        }
    }
}

#[async_trait]
impl SchemaStore for InMemorySchemaStore {
    async fn has_table(&self, table: &str) -> StorageResult<bool> {
        Ok(read(&self.state, "has table")?.tables.contains_key(table))
    }

    async fn create_table(&self, table: &str, columns: &[ColumnDef]) -> StorageResult<()> {
        let mut state = write(&self.state, "create table")?;
        if state.tables.contains_key(table) {
            return Err(StorageError::new(
                "create table",
                format!("relation '{}' already exists", table),
            ));
        }

        let mut definition = BTreeMap::new();
        definition.insert(ID_FIELD.to_string(), ColumnType::String);
        for column in columns {
            definition.insert(column.name.clone(), column.column_type);
        }

        state.tables.insert(table.to_string(), definition);
        state.ddl_log.push(format!("create table {}", table));
        Ok(())
    }

    async fn columns(&self, table: &str) -> StorageResult<ColumnSet> {
        let state = read(&self.state, "list columns")?;
        let columns = state.tables.get(table).ok_or_else(|| {
            StorageError::new("list columns", format!("relation '{}' does not exist", table))
        })?;

        Ok(columns
            .iter()
            .filter(|(name, _)| name.as_str() != ID_FIELD)
            .map(|(name, column_type)| (name.clone(), Some(*column_type)))
            .collect())
    }

    async fn drop_column(&self, table: &str, column: &str) -> Result<(), DdlError> {
        self.column_op(DdlOperation::DropColumn, table, column, |columns| {
            columns
                .remove(column)
                .map(|_| format!("alter table {} drop column {}", table, column))
                .ok_or(DdlErrorKind::UndefinedColumn)
        })
    }

    async fn alter_column(&self, table: &str, column: &ColumnDef) -> Result<(), DdlError> {
        self.column_op(DdlOperation::AlterColumn, table, &column.name, |columns| {
            let existing = columns
                .get_mut(&column.name)
                .ok_or(DdlErrorKind::UndefinedColumn)?;
            *existing = column.column_type;
            Ok(format!(
                "alter table {} alter column {} type {}",
                table, column.name, column.column_type
            ))
        })
    }

    async fn add_column(&self, table: &str, column: &ColumnDef) -> Result<(), DdlError> {
        self.column_op(DdlOperation::AddColumn, table, &column.name, |columns| {
            if columns.contains_key(&column.name) {
                return Err(DdlErrorKind::DuplicateColumn);
            }
            columns.insert(column.name.clone(), column.column_type);
            Ok(format!(
                "alter table {} add column {} {}",
                table, column.name, column.column_type
            ))
        })
    }

    async fn form_collection_key(
        &self,
        forms_collection: &str,
        form_id: &ItemKey,
    ) -> StorageResult<Option<String>> {
        Ok(read(&self.state, "get form key")?
            .forms
            .iter()
            .find(|((collection, id), _)| collection == forms_collection && id.matches(form_id))
            .map(|(_, key)| key.clone()))
    }

    async fn upsert_collection_meta(&self, meta: &CollectionMeta) -> StorageResult<()> {
        write(&self.state, "upsert collection meta")?
            .collections
            .entry(meta.collection.clone())
            .or_insert_with(|| meta.clone());
        Ok(())
    }

    async fn field_meta_names(&self, collection: &str) -> StorageResult<Vec<String>> {
        Ok(read(&self.state, "list field meta")?
            .fields
            .iter()
            .filter(|meta| meta.collection == collection && meta.field != ID_FIELD)
            .map(|meta| meta.field.clone())
            .collect())
    }

    async fn delete_field_meta(&self, collection: &str, fields: &[String]) -> StorageResult<()> {
        write(&self.state, "delete field meta")?
            .fields
            .retain(|meta| meta.collection != collection || !fields.contains(&meta.field));
        Ok(())
    }

    async fn upsert_field_meta(&self, batch: &[FieldMeta]) -> StorageResult<()> {
        let mut state = write(&self.state, "upsert field meta")?;
        for meta in batch {
            let position = state
                .fields
                .iter()
                .position(|m| m.collection == meta.collection && m.field == meta.field);
            match position {
                Some(index) => state.fields[index] = meta.clone(),
                None => state.fields.push(meta.clone()),
            }
        }
        Ok(())
    }
}
