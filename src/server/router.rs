//! HTTP routes of the hook server
//!
//! - `GET /health` and `GET /healthz` - liveness
//! - `GET /hooks` - registered events
//! - `POST /hooks/{event}` - deliver one hook event, e.g. `pages.items.update`

use super::host::AutomationHost;
use crate::core::error::AutomationError;
use crate::core::events::{HookEvent, HookEventName, HookRequest};
use crate::hooks::ItemResult;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Response body of a hook delivery
#[derive(Debug, Serialize)]
pub struct HookResponse {
    pub event: String,
    /// Payload to write, present for filter events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    pub results: Vec<ItemResult>,
}

/// Build the router serving `host`, merged with `custom_routes`
pub fn build_router(host: Arc<AutomationHost>, custom_routes: Vec<Router>) -> Router {
    let mut app = Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
        .route("/hooks", get(list_hooks))
        .route("/hooks/{event}", post(deliver_hook))
        .with_state(host);

    for custom_router in custom_routes {
        app = app.merge(custom_router);
    }

    app.layer(TraceLayer::new_for_http())
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn list_hooks(State(host): State<Arc<AutomationHost>>) -> Json<Value> {
    Json(json!({
        "extensions": host.extensions,
        "events": host.events(),
    }))
}

/// Deliver an event to its filters and actions
///
/// Per-item failures are part of a 200 response; only an unknown event or a
/// body that is not a hook request are HTTP errors.
pub async fn deliver_hook(
    State(host): State<Arc<AutomationHost>>,
    Path(event): Path<String>,
    body: Result<Json<HookRequest>, JsonRejection>,
) -> Result<Json<HookResponse>, AutomationError> {
    let name: HookEventName = event.parse()?;
    if !host.registry.handles(&event) {
        return Err(AutomationError::UnknownEvent(event));
    }

    let Json(request) = body.map_err(|e| AutomationError::invalid_payload(&name, e.body_text()))?;
    let outcome = host
        .registry
        .dispatch(HookEvent::from_request(name, request))
        .await?;

    Ok(Json(HookResponse {
        event,
        payload: outcome.payload,
        results: outcome.results,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AutomationConfig;

    fn empty_router() -> Router {
        let host = AutomationHost::from_extensions(AutomationConfig::default(), &[]);
        build_router(Arc::new(host), vec![])
    }

    #[tokio::test]
    async fn test_unknown_event_is_not_found() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, empty_router()).await.unwrap();
        });

        let response = reqwest::Client::new()
            .post(format!("http://{}/hooks/pages.items.update", addr))
            .json(&json!({"keys": [1], "payload": {}}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 404);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["code"], "UNKNOWN_EVENT");
    }
}
