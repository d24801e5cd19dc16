//! Frontend webhook notifications
//!
//! Page changes are pushed to `{FRONT_END_LINK}/api/webhooks/{page|pages}`.
//! A call only counts as delivered on HTTP 200; callers treat every failure
//! as non-fatal since the database change has already been applied.

use crate::config::AutomationConfig;
use crate::core::error::{AutomationError, ConfigError, NotifyError};
use crate::hooks::ItemResult;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;

/// Webhook route on the frontend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookTarget {
    /// A single page changed
    Page,
    /// A set of pages changed together
    Pages,
}

impl WebhookTarget {
    pub fn path(&self) -> &'static str {
        match self {
            WebhookTarget::Page => "/api/webhooks/page",
            WebhookTarget::Pages => "/api/webhooks/pages",
        }
    }
}

/// JSON body of a webhook call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slugs: Option<Vec<String>>,
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl WebhookPayload {
    pub fn page(slug: impl Into<String>, event: impl Into<String>, status: Option<String>) -> Self {
        Self {
            slug: Some(slug.into()),
            slugs: None,
            event: event.into(),
            status,
        }
    }

    pub fn pages(slugs: Vec<String>, event: impl Into<String>, status: Option<String>) -> Self {
        Self {
            slug: None,
            slugs: Some(slugs),
            event: event.into(),
            status,
        }
    }
}

/// Sends page change notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        target: WebhookTarget,
        payload: &WebhookPayload,
    ) -> Result<(), AutomationError>;
}

/// [`Notifier`] posting JSON to the frontend with reqwest
pub struct WebhookNotifier {
    http_client: Client,
    frontend_link: Option<String>,
    api_key: Option<String>,
}

impl WebhookNotifier {
    pub fn new(config: &AutomationConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(http_client: Client, config: &AutomationConfig) -> Self {
        Self {
            http_client,
            frontend_link: config.frontend_link().map(str::to_string),
            api_key: config.webhook_api_key.clone(),
        }
    }

    /// Full URL for `target`
    pub fn endpoint(&self, target: WebhookTarget) -> Result<String, ConfigError> {
        let base = self
            .frontend_link
            .as_deref()
            .ok_or(ConfigError::MissingFrontendLink)?;
        Ok(format!("{}{}", base.trim_end_matches('/'), target.path()))
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(
        &self,
        target: WebhookTarget,
        payload: &WebhookPayload,
    ) -> Result<(), AutomationError> {
        let url = self.endpoint(target)?;

        let mut request = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(payload);

        if let Some(api_key) = &self.api_key {
            request = request.header("x-api-key", api_key);
        }

        tracing::info!(url = %url, event = %payload.event, "Sending page data to the frontend");

        let response = request.send().await.map_err(|e| NotifyError::Transport {
            url: url.clone(),
            message: e.to_string(),
        })?;

        if response.status() != StatusCode::OK {
            return Err(NotifyError::UnexpectedStatus {
                url,
                status: response.status().as_u16(),
            }
            .into());
        }

        tracing::info!(url = %url, "Data sent to the frontend");
        Ok(())
    }
}

/// Send a notification, logging instead of failing
///
/// A missing frontend link is logged as a warning, any other failure as an
/// error with the error attached.
pub async fn notify_logged(
    notifier: &dyn Notifier,
    target: WebhookTarget,
    payload: &WebhookPayload,
) -> ItemResult {
    let item = format!("webhook:{}", target.path());

    match notifier.notify(target, payload).await {
        Ok(()) => ItemResult::ok(item, None),
        Err(e @ AutomationError::Config(ConfigError::MissingFrontendLink)) => {
            tracing::warn!(error = %e, event = %payload.event, "Skipping page webhook");
            ItemResult::failed(item, &e)
        }
        Err(e) => {
            tracing::error!(error = %e, event = %payload.event, "Failed to send page data to the frontend");
            ItemResult::failed(item, &e)
        }
    }
}
