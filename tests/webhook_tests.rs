//! Integration tests for the frontend webhook notifier against a local HTTP
//! server standing in for the frontend.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use cms_automation::prelude::*;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Mutex;

#[derive(Debug, Clone)]
struct Received {
    route: String,
    api_key: Option<String>,
    content_type: Option<String>,
    body: Value,
}

#[derive(Clone)]
struct Frontend {
    status: StatusCode,
    received: Arc<Mutex<Vec<Received>>>,
}

async fn receive(
    State(frontend): State<Frontend>,
    Path(route): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };
    frontend.received.lock().unwrap().push(Received {
        route,
        api_key: header("x-api-key"),
        content_type: header("content-type"),
        body,
    });
    frontend.status
}

/// Start a fake frontend answering every webhook with `status`
async fn start_frontend(status: StatusCode) -> (SocketAddr, Arc<Mutex<Vec<Received>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/api/webhooks/{route}", post(receive))
        .with_state(Frontend {
            status,
            received: received.clone(),
        });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, received)
}

fn config(link: Option<String>, api_key: Option<&str>) -> AutomationConfig {
    AutomationConfig {
        frontend_link: link,
        webhook_api_key: api_key.map(str::to_string),
        ..Default::default()
    }
}

fn page_registry(store: &InMemoryPageStore, notifier: WebhookNotifier) -> HookRegistry {
    let mut registry = HookRegistry::new();
    PagesAutomationExtension::new(
        Arc::new(store.clone()),
        Arc::new(notifier),
        "pages",
        vec![PageStatus::Archived],
    )
    .register_hooks(&mut registry);
    registry
}

// =============================================================================
// Notifier
// =============================================================================

#[tokio::test]
async fn test_page_webhook_sends_key_and_body() {
    let (addr, received) = start_frontend(StatusCode::OK).await;
    let notifier = WebhookNotifier::new(&config(Some(format!("http://{}/", addr)), Some("s3cret")));

    notifier
        .notify(
            WebhookTarget::Page,
            &WebhookPayload::page("/about", "pages.items.create", None),
        )
        .await
        .unwrap();

    let received = received.lock().unwrap().clone();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].route, "page");
    assert_eq!(received[0].api_key.as_deref(), Some("s3cret"));
    assert_eq!(received[0].content_type.as_deref(), Some("application/json"));
    assert_eq!(
        received[0].body,
        json!({"slug": "/about", "event": "pages.items.create"})
    );
}

#[tokio::test]
async fn test_webhook_without_api_key_omits_header() {
    let (addr, received) = start_frontend(StatusCode::OK).await;
    let notifier = WebhookNotifier::new(&config(Some(format!("http://{}", addr)), None));

    notifier
        .notify(
            WebhookTarget::Pages,
            &WebhookPayload::pages(vec!["/a".into()], "pages.items.update", Some("draft".into())),
        )
        .await
        .unwrap();

    let received = received.lock().unwrap().clone();
    assert_eq!(received[0].route, "pages");
    assert!(received[0].api_key.is_none());
}

#[tokio::test]
async fn test_non_200_is_an_error() {
    for status in [StatusCode::INTERNAL_SERVER_ERROR, StatusCode::NO_CONTENT] {
        let (addr, _) = start_frontend(status).await;
        let notifier = WebhookNotifier::new(&config(Some(format!("http://{}", addr)), None));

        let err = notifier
            .notify(
                WebhookTarget::Page,
                &WebhookPayload::page("/a", "pages.items.create", None),
            )
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), "WEBHOOK_UNEXPECTED_STATUS");
        assert!(err.to_string().contains(&status.as_u16().to_string()));
    }
}

#[tokio::test]
async fn test_unreachable_frontend_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let notifier = WebhookNotifier::new(&config(Some(format!("http://{}", addr)), None));
    let err = notifier
        .notify(
            WebhookTarget::Page,
            &WebhookPayload::page("/a", "pages.items.create", None),
        )
        .await
        .unwrap_err();

    assert_eq!(err.error_code(), "WEBHOOK_TRANSPORT_ERROR");
}

// =============================================================================
// Through the page hooks
// =============================================================================

#[tokio::test]
async fn test_failing_frontend_does_not_undo_the_cascade() {
    let (addr, received) = start_frontend(StatusCode::INTERNAL_SERVER_ERROR).await;
    let store = InMemoryPageStore::with_pages(vec![
        Page::new(1, "Blog", "/blog/", "archived"),
        Page::new(2, "Post", "/blog/a", "published"),
    ]);
    let registry = page_registry(
        &store,
        WebhookNotifier::new(&config(Some(format!("http://{}", addr)), None)),
    );

    let outcome = registry
        .dispatch(HookEvent::new(
            "pages.items.update".parse().unwrap(),
            vec![ItemKey::Int(1)],
            json!({"status": "archived"}),
        ))
        .await
        .unwrap();

    assert_eq!(
        store.by_permalink("/blog/a").unwrap().unwrap().status,
        PageStatus::Archived
    );
    let failures: Vec<&ItemResult> = outcome.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].item, "webhook:/api/webhooks/pages");
    assert_eq!(received.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_missing_frontend_link_skips_the_call() {
    let (_, received) = start_frontend(StatusCode::OK).await;
    let registry = page_registry(
        &InMemoryPageStore::new(),
        WebhookNotifier::new(&config(None, Some("s3cret"))),
    );

    let outcome = registry
        .dispatch(HookEvent::new(
            "pages.items.create".parse().unwrap(),
            vec![ItemKey::Int(1)],
            json!({"permalink": "/new"}),
        ))
        .await
        .unwrap();

    assert_eq!(
        outcome.results[0].error_code.as_deref(),
        Some("MISSING_FRONTEND_LINK")
    );
    assert!(received.lock().unwrap().is_empty());
}
