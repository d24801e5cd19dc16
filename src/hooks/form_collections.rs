//! Form submission collections
//!
//! - `forms.items.create` (filter): create and register the submissions
//!   collection named by the form's `key`
//! - `forms.items.update` (action): reconcile every updated form's collection
//!   with its new `schema`

use super::{HookHandler, HookOutcome, ItemResult, registry::HookRegistry};
use crate::core::error::AutomationError;
use crate::core::events::{HookAction, HookEvent, HookEventName, ItemKey};
use crate::core::form::{Form, FormSchemaField};
use crate::core::module::Extension;
use crate::core::service::SchemaStore;
use crate::sync::SchemaSynchronizer;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Extension keeping one table per form in step with the form definition
pub struct FormCollectionsExtension {
    store: Arc<dyn SchemaStore>,
    forms_collection: String,
    chunk_size: usize,
}

impl FormCollectionsExtension {
    pub fn new(
        store: Arc<dyn SchemaStore>,
        forms_collection: impl Into<String>,
        chunk_size: usize,
    ) -> Self {
        Self {
            store,
            forms_collection: forms_collection.into(),
            chunk_size,
        }
    }

    fn synchronizer(&self) -> SchemaSynchronizer {
        SchemaSynchronizer::new(self.store.clone(), self.chunk_size)
    }
}

impl Extension for FormCollectionsExtension {
    fn name(&self) -> &str {
        "automatic-form-collections"
    }

    fn register_hooks(&self, registry: &mut HookRegistry) {
        let create = HookEventName::new(&self.forms_collection, HookAction::Create);
        let update = HookEventName::new(&self.forms_collection, HookAction::Update);

        registry.filter(
            create.to_string(),
            CreateFormCollection {
                synchronizer: self.synchronizer(),
            },
        );
        registry.action(
            update.to_string(),
            SyncFormCollections {
                synchronizer: self.synchronizer(),
                store: self.store.clone(),
            },
        );
    }
}

/// Filter on form creation
pub struct CreateFormCollection {
    synchronizer: SchemaSynchronizer,
}

#[async_trait]
impl HookHandler for CreateFormCollection {
    async fn handle(&self, event: &HookEvent) -> HookOutcome {
        let form: Form = match serde_json::from_value(event.payload.clone()) {
            Ok(form) => form,
            Err(e) => {
                let err = AutomationError::invalid_payload(&event.name, e);
                tracing::error!(error = %err, "Could not read the created form");
                return HookOutcome::filter(
                    event.payload.clone(),
                    vec![ItemResult::failed("form", &err)],
                );
            }
        };

        let result = match self.synchronizer.create_collection(&form).await {
            Ok(created) => {
                let detail = if created {
                    "collection created"
                } else {
                    "collection already existed, metadata registered"
                };
                ItemResult::ok(&form.key, Some(detail.to_string()))
            }
            Err(e) => {
                tracing::error!(error = %e, collection = %form.key, "Failed to create the form collection");
                ItemResult::failed(&form.key, &e)
            }
        };

        HookOutcome::filter(event.payload.clone(), vec![result])
    }
}

/// Action on form update
pub struct SyncFormCollections {
    synchronizer: SchemaSynchronizer,
    store: Arc<dyn SchemaStore>,
}

impl SyncFormCollections {
    async fn sync_one(
        &self,
        forms_collection: &str,
        key: &ItemKey,
        fields: &[FormSchemaField],
    ) -> Result<String, AutomationError> {
        let collection = self
            .store
            .form_collection_key(forms_collection, key)
            .await?
            .ok_or_else(|| AutomationError::not_found("form collection", key))?;

        let report = self.synchronizer.sync(&collection, fields).await?;
        tracing::info!(collection = %collection, "Updated table {}", collection);

        Ok(format!(
            "{}: {} dropped, {} altered, {} added",
            collection,
            report.dropped.len(),
            report.altered.len(),
            report.added.len()
        ))
    }
}

#[async_trait]
impl HookHandler for SyncFormCollections {
    async fn handle(&self, event: &HookEvent) -> HookOutcome {
        let fields: Vec<FormSchemaField> = match event.payload.get("schema") {
            None | Some(Value::Null) => return HookOutcome::action(Vec::new()),
            Some(schema) => match serde_json::from_value(schema.clone()) {
                Ok(fields) => fields,
                Err(e) => {
                    let err = AutomationError::invalid_payload(&event.name, e);
                    tracing::error!(error = %err, "Could not read the updated form schema");
                    return HookOutcome::action(vec![ItemResult::failed("schema", &err)]);
                }
            },
        };

        if fields.is_empty() {
            return HookOutcome::action(Vec::new());
        }

        let mut results = Vec::with_capacity(event.keys.len());
        for key in &event.keys {
            match self.sync_one(&event.name.collection, key, &fields).await {
                Ok(summary) => results.push(ItemResult::ok(key, Some(summary))),
                Err(e) => {
                    tracing::error!(error = %e, form = %key, "Failed to update the form collection");
                    results.push(ItemResult::failed(key, &e));
                }
            }
        }

        HookOutcome::action(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::field::ColumnType;
    use crate::hooks::ItemStatus;
    use crate::storage::InMemorySchemaStore;
    use serde_json::json;

    fn registry(store: &InMemorySchemaStore) -> HookRegistry {
        let mut registry = HookRegistry::new();
        FormCollectionsExtension::new(Arc::new(store.clone()), "forms", 30)
            .register_hooks(&mut registry);
        registry
    }

    #[tokio::test]
    async fn test_create_returns_payload_unchanged() {
        let store = InMemorySchemaStore::new();
        let payload = json!({"key": "contact", "schema": [{"name": "email", "type": "email"}]});

        let outcome = registry(&store)
            .dispatch(HookEvent::new(
                "forms.items.create".parse().unwrap(),
                vec![],
                payload.clone(),
            ))
            .await
            .unwrap();

        assert_eq!(outcome.payload, Some(payload));
        assert_eq!(outcome.results[0].status, ItemStatus::Ok);
        let table = store.table("contact").unwrap().unwrap();
        assert_eq!(table.get("email"), Some(&ColumnType::String));
    }

    #[tokio::test]
    async fn test_update_without_schema_is_noop() {
        let store = InMemorySchemaStore::new();
        let outcome = registry(&store)
            .dispatch(HookEvent::new(
                "forms.items.update".parse().unwrap(),
                vec![ItemKey::Int(1)],
                json!({"title": "Renamed"}),
            ))
            .await
            .unwrap();
        assert!(outcome.results.is_empty());
    }

    #[tokio::test]
    async fn test_update_unknown_form_is_reported() {
        let store = InMemorySchemaStore::new();
        let outcome = registry(&store)
            .dispatch(HookEvent::new(
                "forms.items.update".parse().unwrap(),
                vec![ItemKey::Int(9)],
                json!({"schema": [{"name": "a", "type": "text"}]}),
            ))
            .await
            .unwrap();
        assert_eq!(outcome.results[0].status, ItemStatus::Failed);
        assert_eq!(outcome.results[0].error_code.as_deref(), Some("NOT_FOUND"));
    }
}
