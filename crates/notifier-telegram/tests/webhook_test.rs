//! Integration tests for the webhook, status page and health routes.

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};

use notifier_core::RecipientKind;
use notifier_runtime::{Dispatcher, RecordingMessenger};
use notifier_store::MemoryDirectory;
use notifier_telegram::{create_router, AppState, Registrar, ServiceStatus};

const TOKEN: &str = "123456:test-token";

struct Harness {
    server: TestServer,
    directory: Arc<MemoryDirectory>,
    messenger: Arc<RecordingMessenger>,
}

fn harness() -> Harness {
    let directory = Arc::new(MemoryDirectory::new());
    let messenger = Arc::new(RecordingMessenger::new());
    let registrar = Registrar::new(
        directory.clone(),
        Dispatcher::new(messenger.clone()),
        "open-sesame",
    );
    let status = ServiceStatus {
        sheet_id: "sheet-key".to_string(),
        product_table: "product".to_string(),
        user_table: "users".to_string(),
        public_url: Some("https://bot.example.com".to_string()),
        telegram_configured: true,
        monitoring_orders: true,
    };
    let app = create_router(AppState::new(registrar, TOKEN, status));

    Harness {
        server: TestServer::new(app).unwrap(),
        directory,
        messenger,
    }
}

fn private_message(chat_id: i64, text: &str) -> Value {
    json!({
        "update_id": 1,
        "message": {
            "message_id": 10,
            "date": 1700000000,
            "chat": { "id": chat_id, "type": "private", "first_name": "Alice" },
            "from": { "id": chat_id, "is_bot": false, "first_name": "Alice" },
            "text": text
        }
    })
}

fn webhook_path() -> String {
    format!("/{TOKEN}")
}

#[tokio::test]
async fn test_login_twice_registers_once() {
    let h = harness();

    for _ in 0..2 {
        let response = h
            .server
            .post(&webhook_path())
            .json(&private_message(42, "/login open-sesame"))
            .await;
        response.assert_status_ok();
        response.assert_text("OK");
    }

    let recipients = h.directory.snapshot().await;
    assert_eq!(recipients.len(), 1);
    assert_eq!(recipients[0].id, "42");
    assert_eq!(recipients[0].name, "Alice");
    assert_eq!(recipients[0].kind, RecipientKind::User);

    let replies = h.messenger.messages_to("42").await;
    assert_eq!(replies.len(), 2);
    assert_ne!(replies[0], replies[1]);
    assert!(replies[1].contains("already registered"));
}

#[tokio::test]
async fn test_wrong_password_is_ignored() {
    let h = harness();

    let response = h
        .server
        .post(&webhook_path())
        .json(&private_message(42, "/login guess"))
        .await;

    response.assert_status_ok();
    assert!(h.directory.snapshot().await.is_empty());
    assert!(h.messenger.attempts().await.is_empty());
}

#[tokio::test]
async fn test_group_message_registers_group() {
    let h = harness();

    let update = json!({
        "update_id": 2,
        "message": {
            "message_id": 11,
            "chat": { "id": -100200, "type": "supergroup", "title": "Shop staff" },
            "from": { "id": 5, "first_name": "Bob" },
            "new_chat_members": [{ "id": 99, "is_bot": true, "first_name": "Notifier" }]
        }
    });
    h.server.post(&webhook_path()).json(&update).await.assert_status_ok();

    let recipients = h.directory.snapshot().await;
    assert_eq!(recipients.len(), 1);
    assert_eq!(recipients[0].name, "Shop staff");
    assert_eq!(recipients[0].kind, RecipientKind::Group);
    assert_eq!(h.messenger.messages_to("-100200").await.len(), 1);
}

#[tokio::test]
async fn test_start_sends_instructions() {
    let h = harness();

    h.server
        .post(&webhook_path())
        .json(&private_message(7, "/start"))
        .await
        .assert_status_ok();

    let replies = h.messenger.messages_to("7").await;
    assert_eq!(replies.len(), 1);
    assert!(replies[0].contains("/login open-sesame"));
}

#[tokio::test]
async fn test_failures_still_answer_ok() {
    let h = harness();

    let response = h.server.post(&webhook_path()).text("not json").await;
    response.assert_status_ok();
    response.assert_text("OK");

    let response = h.server.post(&webhook_path()).json(&json!({ "update_id": 3 })).await;
    response.assert_status_ok();

    h.directory.set_failing(true);
    let response = h
        .server
        .post(&webhook_path())
        .json(&private_message(42, "/login open-sesame"))
        .await;
    response.assert_status_ok();
    response.assert_text("OK");
    assert!(h.messenger.attempts().await.is_empty());
}

#[tokio::test]
async fn test_wrong_token_path_is_not_found() {
    let h = harness();

    let response = h
        .server
        .post("/not-the-token")
        .json(&private_message(42, "/login open-sesame"))
        .expect_failure()
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    assert!(h.directory.snapshot().await.is_empty());
}

#[tokio::test]
async fn test_health_endpoint() {
    let h = harness();

    let response = h.server.get("/health").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["telegram"], "configured");
    assert_eq!(body["monitoring_orders"], true);
    assert!(chrono::DateTime::parse_from_rfc3339(body["timestamp"].as_str().unwrap()).is_ok());
}

#[tokio::test]
async fn test_dashboard_page() {
    let h = harness();

    let response = h.server.get("/").await;
    response.assert_status_ok();

    let page = response.text();
    assert!(page.contains("Shop notifier"));
    assert!(page.contains("sheet-key"));
    assert!(!page.contains("open-sesame"));
}
