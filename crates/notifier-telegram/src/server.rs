//! HTTP surface: Telegram webhook, status page and health check.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::registration::{Registrar, WebhookUpdate};

/// Static facts about this deployment, shown on the status page.
#[derive(Debug, Clone, Default)]
pub struct ServiceStatus {
    pub sheet_id: String,
    pub product_table: String,
    pub user_table: String,
    pub public_url: Option<String>,
    pub telegram_configured: bool,
    pub monitoring_orders: bool,
}

/// Shared state for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    registrar: Arc<Registrar>,
    token: Arc<str>,
    status: Arc<ServiceStatus>,
}

impl AppState {
    pub fn new(registrar: Registrar, token: &str, status: ServiceStatus) -> Self {
        Self {
            registrar: Arc::new(registrar),
            token: Arc::from(token),
            status: Arc::new(status),
        }
    }
}

/// Response body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub telegram: String,
    pub monitoring_orders: bool,
    pub timestamp: String,
}

/// Creates the router with all routes configured.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/health", get(health))
        .route("/:token", post(webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// POST /<bot token> - inbound Telegram update.
///
/// Always answers 200 "OK" on the right path, whatever happened inside, so
/// Telegram never retries an update.
async fn webhook(
    State(state): State<AppState>,
    Path(token): Path<String>,
    body: Bytes,
) -> Response {
    if token != *state.token {
        return StatusCode::NOT_FOUND.into_response();
    }

    match serde_json::from_slice::<WebhookUpdate>(&body) {
        Ok(update) => match update.into_inbound() {
            Some(message) => {
                let chat_id = message.chat_id.clone();
                if let Err(e) = state.registrar.handle(message).await {
                    warn!(chat_id = %chat_id, error = %e, "Failed to handle chat message");
                }
            }
            None => debug!("Ignoring update without a message"),
        },
        Err(e) => debug!(error = %e, "Ignoring unreadable update"),
    }

    (StatusCode::OK, "OK").into_response()
}

/// GET /health - liveness and configuration summary.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        telegram: if state.status.telegram_configured {
            "configured"
        } else {
            "missing"
        }
        .to_string(),
        monitoring_orders: state.status.monitoring_orders,
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// GET / - status page.
async fn dashboard(State(state): State<AppState>) -> Html<String> {
    Html(render_dashboard(&state.status))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "✅ active"
    } else {
        "⏸️ off"
    }
}

pub fn render_dashboard(status: &ServiceStatus) -> String {
    let webhook = status
        .public_url
        .as_deref()
        .map(escape)
        .unwrap_or_else(|| "not configured".to_string());

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Shop notifier</title>
<style>
body {{ font-family: sans-serif; max-width: 40rem; margin: 2rem auto; color: #222; }}
td {{ padding: 0.3rem 1rem 0.3rem 0; }}
code {{ background: #f2f2f2; padding: 0.1rem 0.3rem; }}
</style>
</head>
<body>
<h1>🤖 Shop notifier</h1>
<table>
<tr><td>Spreadsheet</td><td><code>{sheet}</code></td></tr>
<tr><td>Product table</td><td><code>{products}</code></td></tr>
<tr><td>Users table</td><td><code>{users}</code></td></tr>
<tr><td>Public URL</td><td>{webhook}</td></tr>
<tr><td>Telegram</td><td>{telegram}</td></tr>
<tr><td>Order monitoring</td><td>{orders}</td></tr>
</table>
<h2>Register</h2>
<p>Open a private chat with the bot and send <code>/login &lt;password&gt;</code>,
or add the bot to a group.</p>
</body>
</html>
"#,
        sheet = escape(&status.sheet_id),
        products = escape(&status.product_table),
        users = escape(&status.user_table),
        webhook = webhook,
        telegram = on_off(status.telegram_configured),
        orders = on_off(status.monitoring_orders),
    )
}
