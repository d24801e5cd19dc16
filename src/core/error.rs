//! Typed error handling for the automation hooks
//!
//! Every failure a hook handler can run into is expressed as an
//! [`AutomationError`]. Handlers catch these per item and turn them into
//! [`ItemResult`](crate::hooks::ItemResult)s, so nothing escapes to the
//! dispatcher; the HTTP surface only ever sees dispatch-level errors
//! (unknown event, malformed body).
//!
//! # Error Categories
//!
//! - [`ConfigError`]: missing or invalid configuration (e.g. `FRONT_END_LINK`)
//! - [`NotifyError`]: webhook transport failures and non-200 answers
//! - [`StorageError`]: generic storage backend failures
//! - [`DdlError`]: column-level DDL failures, classified by [`DdlErrorKind`]
//!
//! # Example
//!
//! ```rust,ignore
//! match synchronizer.sync("contact_form", &fields).await {
//!     Ok(report) => tracing::info!(added = ?report.added, "schema synced"),
//!     Err(AutomationError::Ddl(e)) if e.kind == DdlErrorKind::Other => {
//!         tracing::error!(error = %e, "sync aborted");
//!     }
//!     Err(e) => tracing::error!(error = %e, "sync failed"),
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// The main error type for the automation hooks
#[derive(Debug, Error)]
pub enum AutomationError {
    /// No row matched the requested key
    #[error("{entity} with key '{key}' not found")]
    NotFound { entity: String, key: String },

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Frontend webhook errors
    #[error(transparent)]
    Notify(#[from] NotifyError),

    /// Storage backend errors
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Column DDL errors that were not tolerated
    #[error(transparent)]
    Ddl(#[from] DdlError),

    /// Hook payload could not be interpreted
    #[error("Invalid payload for '{event}': {message}")]
    InvalidPayload { event: String, message: String },

    /// No handler is registered for the event
    #[error("Unknown hook event: {0}")]
    UnknownEvent(String),
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

impl AutomationError {
    /// Shorthand for [`AutomationError::NotFound`]
    pub fn not_found(entity: impl Into<String>, key: impl ToString) -> Self {
        AutomationError::NotFound {
            entity: entity.into(),
            key: key.to_string(),
        }
    }

    /// Shorthand for [`AutomationError::InvalidPayload`]
    pub fn invalid_payload(event: impl ToString, message: impl ToString) -> Self {
        AutomationError::InvalidPayload {
            event: event.to_string(),
            message: message.to_string(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AutomationError::NotFound { .. } => StatusCode::NOT_FOUND,
            AutomationError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AutomationError::Notify(_) => StatusCode::BAD_GATEWAY,
            AutomationError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AutomationError::Ddl(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AutomationError::InvalidPayload { .. } => StatusCode::BAD_REQUEST,
            AutomationError::UnknownEvent(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AutomationError::NotFound { .. } => "NOT_FOUND",
            AutomationError::Config(e) => e.error_code(),
            AutomationError::Notify(e) => e.error_code(),
            AutomationError::Storage(_) => "STORAGE_ERROR",
            AutomationError::Ddl(e) => e.kind.error_code(),
            AutomationError::InvalidPayload { .. } => "INVALID_PAYLOAD",
            AutomationError::UnknownEvent(_) => "UNKNOWN_EVENT",
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
        }
    }
}

impl IntoResponse for AutomationError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `FRONT_END_LINK` is unset or empty
    #[error("The FRONT_END_LINK env variable has not been set")]
    MissingFrontendLink,

    /// A configuration value could not be used
    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

impl ConfigError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ConfigError::MissingFrontendLink => "MISSING_FRONTEND_LINK",
            ConfigError::InvalidValue { .. } => "INVALID_CONFIG_VALUE",
        }
    }
}

// =============================================================================
// Notify Errors
// =============================================================================

/// Errors raised while posting to the frontend webhook
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The endpoint answered with something other than 200
    #[error("Could not send page data to {url}: unexpected status {status}")]
    UnexpectedStatus { url: String, status: u16 },

    /// The request never got an answer
    #[error("Could not send page data to {url}: {message}")]
    Transport { url: String, message: String },
}

impl NotifyError {
    pub fn error_code(&self) -> &'static str {
        match self {
            NotifyError::UnexpectedStatus { .. } => "WEBHOOK_UNEXPECTED_STATUS",
            NotifyError::Transport { .. } => "WEBHOOK_TRANSPORT_ERROR",
        }
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors related to storage backends
#[derive(Debug, Error)]
#[error("Storage operation '{operation}' failed: {message}")]
pub struct StorageError {
    pub operation: String,
    pub message: String,
}

impl StorageError {
    pub fn new(operation: impl Into<String>, message: impl ToString) -> Self {
        Self {
            operation: operation.into(),
            message: message.to_string(),
        }
    }
}

// =============================================================================
// DDL Errors
// =============================================================================

/// Column-level schema operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DdlOperation {
    DropColumn,
    AlterColumn,
    AddColumn,
}

impl DdlOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            DdlOperation::DropColumn => "drop column",
            DdlOperation::AlterColumn => "alter column",
            DdlOperation::AddColumn => "add column",
        }
    }
}

/// Classification of a DDL failure, decided by the storage backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DdlErrorKind {
    /// The column does not exist (PostgreSQL `42703`)
    UndefinedColumn,
    /// The column already exists (PostgreSQL `42701`)
    DuplicateColumn,
    /// Anything else
    Other,
}

impl DdlErrorKind {
    pub fn error_code(&self) -> &'static str {
        match self {
            DdlErrorKind::UndefinedColumn => "UNDEFINED_COLUMN",
            DdlErrorKind::DuplicateColumn => "DUPLICATE_COLUMN",
            DdlErrorKind::Other => "DDL_ERROR",
        }
    }
}

/// A failed column operation
#[derive(Debug, Error)]
#[error("Failed to {} '{column}' on '{table}': {message}", operation.as_str())]
pub struct DdlError {
    pub kind: DdlErrorKind,
    pub operation: DdlOperation,
    pub table: String,
    pub column: String,
    pub message: String,
}

impl DdlError {
    pub fn new(
        kind: DdlErrorKind,
        operation: DdlOperation,
        table: impl Into<String>,
        column: impl Into<String>,
        message: impl ToString,
    ) -> Self {
        Self {
            kind,
            operation,
            table: table.into(),
            column: column.into(),
            message: message.to_string(),
        }
    }

    /// Whether re-running the operation would leave the schema in the wanted state
    ///
    /// A missing column is fine when dropping or altering it; an existing
    /// column is fine when adding it.
    pub fn is_tolerated(&self) -> bool {
        matches!(
            (self.operation, self.kind),
            (DdlOperation::DropColumn, DdlErrorKind::UndefinedColumn)
                | (DdlOperation::AlterColumn, DdlErrorKind::UndefinedColumn)
                | (DdlOperation::AddColumn, DdlErrorKind::DuplicateColumn)
        )
    }
}
