//! Core module containing the domain types and storage traits of the hooks

pub mod error;
pub mod events;
pub mod field;
pub mod form;
pub mod module;
pub mod page;
pub mod service;

pub use error::{
    AutomationError, ConfigError, DdlError, DdlErrorKind, DdlOperation, ErrorResponse,
    NotifyError, StorageError,
};
pub use events::{HookAction, HookEnvelope, HookEvent, HookEventName, HookRequest, ItemKey};
pub use field::{ColumnDef, ColumnType, FormFieldType, ID_FIELD};
pub use form::{CollectionMeta, FieldMeta, Form, FormSchemaField};
pub use module::Extension;
pub use page::{Page, PageStatus, PageSummary};
pub use service::{ColumnSet, PageStore, SchemaStore, StorageResult};
