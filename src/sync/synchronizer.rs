//! Applies schema diffs to form collections

use super::diff::{SchemaDiff, normalize_fields};
use crate::core::error::{AutomationError, DdlError};
use crate::core::field::ColumnDef;
use crate::core::form::{CollectionMeta, FieldMeta, Form, FormSchemaField};
use crate::core::service::SchemaStore;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Columns touched by one synchronization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub dropped: Vec<String>,
    pub altered: Vec<String>,
    pub added: Vec<String>,
    /// Operations that failed in a tolerated way (already in the wanted state)
    pub skipped: Vec<String>,
}

impl SyncReport {
    /// No DDL statement changed the table
    pub fn is_noop(&self) -> bool {
        self.dropped.is_empty() && self.altered.is_empty() && self.added.is_empty()
    }
}

/// Creates form collections and keeps their columns and metadata in step
/// with the form schema
#[derive(Clone)]
pub struct SchemaSynchronizer {
    store: Arc<dyn SchemaStore>,
    chunk_size: usize,
}

impl SchemaSynchronizer {
    pub fn new(store: Arc<dyn SchemaStore>, chunk_size: usize) -> Self {
        Self {
            store,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Create the submissions table of `form` and register it
    ///
    /// Returns whether the table had to be created. Metadata is upserted
    /// either way, so calling this again is harmless.
    pub async fn create_collection(&self, form: &Form) -> Result<bool, AutomationError> {
        let fields = normalize_fields(&form.schema);
        let columns: Vec<ColumnDef> = fields.iter().map(FormSchemaField::column).collect();

        let created = if self.store.has_table(&form.key).await? {
            tracing::debug!(collection = %form.key, "Collection table already exists");
            false
        } else {
            self.store.create_table(&form.key, &columns).await?;
            tracing::info!(collection = %form.key, columns = columns.len(), "Created collection table");
            true
        };

        self.store
            .upsert_collection_meta(&CollectionMeta::form_submissions(&form.key))
            .await?;

        let mut metas = vec![FieldMeta::identifier(&form.key)];
        metas.extend(field_metas(&form.key, &fields));
        self.upsert_metas(&metas).await?;

        Ok(created)
    }

    /// Bring `collection`'s columns and field metadata in line with `desired`
    ///
    /// Columns are dropped, then altered, then added. A tolerated DDL failure
    /// (see [`DdlError::is_tolerated`]) is recorded as skipped; any other
    /// failure aborts the synchronization.
    pub async fn sync(
        &self,
        collection: &str,
        desired: &[FormSchemaField],
    ) -> Result<SyncReport, AutomationError> {
        let desired = normalize_fields(desired);
        let columns = self.store.columns(collection).await?;
        let current: BTreeSet<String> = columns.keys().cloned().collect();
        let diff = SchemaDiff::compute(&current, &desired);

        let mut report = SyncReport::default();

        for name in &diff.to_remove {
            let result = self.store.drop_column(collection, name).await;
            record(result, name, &mut report.dropped, &mut report.skipped)?;
        }

        for field in &diff.to_modify {
            let column = field.column();
            if columns.get(&field.name) == Some(&Some(column.column_type)) {
                continue;
            }
            let result = self.store.alter_column(collection, &column).await;
            record(result, &field.name, &mut report.altered, &mut report.skipped)?;
        }

        for field in &diff.to_add {
            let result = self.store.add_column(collection, &field.column()).await;
            record(result, &field.name, &mut report.added, &mut report.skipped)?;
        }

        tracing::info!(
            collection = %collection,
            dropped = ?report.dropped,
            altered = ?report.altered,
            added = ?report.added,
            "Updated schema for the {} table",
            collection
        );

        self.sync_metadata(collection, &desired).await?;

        Ok(report)
    }

    async fn sync_metadata(
        &self,
        collection: &str,
        desired: &[FormSchemaField],
    ) -> Result<(), AutomationError> {
        let desired_names: BTreeSet<&str> = desired.iter().map(|f| f.name.as_str()).collect();
        let stale: Vec<String> = self
            .store
            .field_meta_names(collection)
            .await?
            .into_iter()
            .filter(|name| !desired_names.contains(name.as_str()))
            .collect();

        if !stale.is_empty() {
            self.store.delete_field_meta(collection, &stale).await?;
        }

        self.upsert_metas(&field_metas(collection, desired)).await
    }

    async fn upsert_metas(&self, metas: &[FieldMeta]) -> Result<(), AutomationError> {
        for chunk in metas.chunks(self.chunk_size) {
            self.store.upsert_field_meta(chunk).await?;
        }
        Ok(())
    }
}

fn field_metas(collection: &str, fields: &[FormSchemaField]) -> Vec<FieldMeta> {
    fields
        .iter()
        .enumerate()
        .map(|(index, field)| FieldMeta::for_field(collection, &field.name, index))
        .collect()
}

fn record(
    result: Result<(), DdlError>,
    column: &str,
    applied: &mut Vec<String>,
    skipped: &mut Vec<String>,
) -> Result<(), AutomationError> {
    match result {
        Ok(()) => {
            applied.push(column.to_string());
            Ok(())
        }
        Err(e) if e.is_tolerated() => {
            tracing::debug!(error = %e, "Ignoring DDL error");
            skipped.push(column.to_string());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
