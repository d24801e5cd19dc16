//! # CMS Automation
//!
//! Server-side hooks for a headless CMS, served over HTTP.
//!
//! ## Features
//!
//! - **Form Collections**: every form gets its own submissions table, created
//!   when the form is created and reconciled whenever its schema changes
//! - **Page Cascades**: archiving a root page archives its descendants,
//!   deleting a root page deletes them
//! - **Frontend Webhooks**: page changes are pushed to the frontend so it can
//!   revalidate its cache
//! - **Pluggable Storage**: PostgreSQL through sqlx, or in-memory for tests
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cms_automation::prelude::*;
//!
//! let config = AutomationConfig::from_env()?;
//! let pages = Arc::new(InMemoryPageStore::new());
//! let schema = Arc::new(InMemorySchemaStore::new());
//!
//! ServerBuilder::new()
//!     .with_config(config.clone())
//!     .register_extension(FormCollectionsExtension::new(schema, "forms", 30))
//!     .register_extension(PagesAutomationExtension::new(
//!         pages,
//!         Arc::new(WebhookNotifier::new(&config)),
//!         "pages",
//!         config.cascade_statuses.clone(),
//!     ))
//!     .serve(&config.bind_address)
//!     .await?;
//! ```

pub mod config;
pub mod core;
pub mod hooks;
pub mod notify;
pub mod pages;
pub mod server;
pub mod storage;
pub mod sync;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        error::{AutomationError, ConfigError, DdlError, DdlErrorKind, NotifyError, StorageError},
        events::{HookAction, HookEvent, HookEventName, HookRequest, ItemKey},
        field::{ColumnDef, ColumnType, FormFieldType},
        form::{CollectionMeta, FieldMeta, Form, FormSchemaField},
        module::Extension,
        page::{Page, PageStatus},
        service::{PageStore, SchemaStore},
    };

    // === Hooks ===
    pub use crate::hooks::{
        FormCollectionsExtension, HookHandler, HookOutcome, HookRegistry, ItemResult, ItemStatus,
        PagesAutomationExtension,
    };

    // === Automation ===
    pub use crate::notify::{Notifier, WebhookNotifier, WebhookPayload, WebhookTarget};
    pub use crate::pages::CascadeResolver;
    pub use crate::sync::{SchemaDiff, SchemaSynchronizer, SyncReport};

    // === Storage ===
    pub use crate::storage::{InMemoryPageStore, InMemorySchemaStore};
    #[cfg(feature = "postgres")]
    pub use crate::storage::{PostgresPageStore, PostgresSchemaStore};

    // === Config ===
    pub use crate::config::AutomationConfig;

    // === Server ===
    pub use crate::server::{AutomationHost, ServerBuilder};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};
    pub use std::sync::Arc;
}
