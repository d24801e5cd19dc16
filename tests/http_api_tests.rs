//! End-to-end tests of the hook server using axum_test::TestServer

use axum::http::StatusCode;
use axum_test::TestServer;
use cms_automation::prelude::*;
use serde_json::{Value, json};

struct TestApp {
    server: TestServer,
    pages: InMemoryPageStore,
    schema: InMemorySchemaStore,
}

fn create_test_server() -> TestApp {
    let pages = InMemoryPageStore::with_pages(vec![
        Page::new(1, "Blog", "/blog/", "published"),
        Page::new(2, "Post", "/blog/a", "published"),
        Page::new(3, "About", "/about", "published"),
    ]);
    let schema = InMemorySchemaStore::new();
    let config = AutomationConfig::default();

    let app = ServerBuilder::new()
        .register_extension(FormCollectionsExtension::new(
            Arc::new(schema.clone()),
            "forms",
            config.batch_chunk_size,
        ))
        .register_extension(PagesAutomationExtension::new(
            Arc::new(pages.clone()),
            Arc::new(WebhookNotifier::new(&config)),
            "pages",
            config.cascade_statuses.clone(),
        ))
        .with_config(config)
        .build()
        .expect("Failed to build app");

    let server = TestServer::new(app).expect("Failed to create test server");

    TestApp {
        server,
        pages,
        schema,
    }
}

// =============================================================================
// Health Check Tests
// =============================================================================

mod health_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_test_server();

        let response = app.server.get("/health").await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "cms-automation");
    }

    #[tokio::test]
    async fn test_hooks_listing() {
        let app = create_test_server();

        let body: Value = app.server.get("/hooks").await.json();
        let events: Vec<&str> = body["events"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(
            events,
            vec![
                "forms.items.create",
                "forms.items.update",
                "pages.items.create",
                "pages.items.delete",
                "pages.items.update",
            ]
        );
    }
}

// =============================================================================
// Hook Delivery Tests
// =============================================================================

mod delivery_tests {
    use super::*;

    #[tokio::test]
    async fn test_form_create_filter_returns_payload() {
        let app = create_test_server();
        let payload = json!({
            "key": "contact",
            "schema": [
                {"name": "email", "type": "email"},
                {"name": "message", "type": "textarea"}
            ]
        });

        let response = app
            .server
            .post("/hooks/forms.items.create")
            .json(&json!({"payload": payload}))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["event"], "forms.items.create");
        assert_eq!(body["payload"], payload);
        assert_eq!(body["results"][0]["status"], "ok");

        let table = app.schema.table("contact").unwrap().unwrap();
        assert_eq!(table.get("message"), Some(&ColumnType::Text));
    }

    #[tokio::test]
    async fn test_page_update_archives_descendants() {
        let app = create_test_server();

        let response = app
            .server
            .post("/hooks/pages.items.update")
            .json(&json!({"keys": [1], "payload": {"status": "archived"}}))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert!(body.get("payload").is_none());

        assert_eq!(
            app.pages.by_permalink("/blog/a").unwrap().unwrap().status,
            PageStatus::Archived
        );
        assert_eq!(
            app.pages.by_permalink("/about").unwrap().unwrap().status,
            PageStatus::Published
        );

        // No FRONT_END_LINK in the test config
        let results = body["results"].as_array().unwrap();
        let webhook = results.last().unwrap();
        assert_eq!(webhook["status"], "failed");
        assert_eq!(webhook["error_code"], "MISSING_FRONTEND_LINK");
    }

    #[tokio::test]
    async fn test_string_keys_match_integer_ids() {
        let app = create_test_server();

        let response = app
            .server
            .post("/hooks/pages.items.update")
            .json(&json!({"keys": ["1"], "payload": {"status": "archived"}}))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["results"][0]["item"], "/blog/");
        assert_eq!(body["results"][0]["status"], "ok");
        assert_eq!(
            app.pages.by_permalink("/blog/a").unwrap().unwrap().status,
            PageStatus::Archived
        );
    }

    #[tokio::test]
    async fn test_single_key_is_accepted() {
        let app = create_test_server();

        let response = app
            .server
            .post("/hooks/pages.items.delete")
            .json(&json!({"key": 1, "payload": [1]}))
            .await;

        response.assert_status_ok();
        assert_eq!(app.pages.all().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_event_is_not_found() {
        let app = create_test_server();

        let response = app
            .server
            .post("/hooks/users.items.create")
            .json(&json!({"payload": {}}))
            .expect_failure()
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
        let body: Value = response.json();
        assert_eq!(body["code"], "UNKNOWN_EVENT");
    }

    #[tokio::test]
    async fn test_malformed_event_name_is_not_found() {
        let app = create_test_server();

        let response = app
            .server
            .post("/hooks/pages.update")
            .json(&json!({}))
            .expect_failure()
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_body_is_bad_request() {
        let app = create_test_server();

        let response = app
            .server
            .post("/hooks/pages.items.update")
            .json(&json!({"keys": "not-a-list"}))
            .expect_failure()
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["code"], "INVALID_PAYLOAD");
    }
}
