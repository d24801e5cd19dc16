//! Hook handlers and their per-item outcomes
//!
//! Handlers never fail: every error is caught where it happens, logged with
//! the error attached, and recorded as a failed [`ItemResult`] so the loop
//! over keys can move on to the next item.

pub mod form_collections;
pub mod pages;
pub mod registry;

pub use form_collections::FormCollectionsExtension;
pub use pages::PagesAutomationExtension;
pub use registry::HookRegistry;

use crate::core::error::AutomationError;
use crate::core::events::HookEvent;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// When a handler runs relative to the CMS write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HookKind {
    /// Runs before the write and may replace the payload
    Filter,
    /// Runs after the write
    Action,
}

/// A single hook handler
#[async_trait]
pub trait HookHandler: Send + Sync {
    async fn handle(&self, event: &HookEvent) -> HookOutcome;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Ok,
    Skipped,
    Failed,
}

/// Result of processing one item (a key, a root page, a webhook call)
#[derive(Debug, Clone, Serialize)]
pub struct ItemResult {
    pub item: String,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl ItemResult {
    pub fn ok(item: impl ToString, detail: Option<String>) -> Self {
        Self {
            item: item.to_string(),
            status: ItemStatus::Ok,
            detail,
            error_code: None,
        }
    }

    pub fn skipped(item: impl ToString, detail: impl Into<String>) -> Self {
        Self {
            item: item.to_string(),
            status: ItemStatus::Skipped,
            detail: Some(detail.into()),
            error_code: None,
        }
    }

    pub fn failed(item: impl ToString, error: &AutomationError) -> Self {
        Self {
            item: item.to_string(),
            status: ItemStatus::Failed,
            detail: Some(error.to_string()),
            error_code: Some(error.error_code().to_string()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == ItemStatus::Failed
    }
}

/// What a handler produced
#[derive(Debug, Clone, Default, Serialize)]
pub struct HookOutcome {
    /// Payload handed back to the CMS (filters only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    pub results: Vec<ItemResult>,
}

impl HookOutcome {
    /// Outcome of an action
    pub fn action(results: Vec<ItemResult>) -> Self {
        Self {
            payload: None,
            results,
        }
    }

    /// Outcome of a filter, passing `payload` on
    pub fn filter(payload: Value, results: Vec<ItemResult>) -> Self {
        Self {
            payload: Some(payload),
            results,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemResult> {
        self.results.iter().filter(|result| result.is_failed())
    }
}
