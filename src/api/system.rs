//! Health check and client log forwarding
//!
//! - GET /api/health - also pings the database
//! - POST /api/debug/client-logs - console output from the admin frontend,
//!   re-emitted under the `frontend` tracing target

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::middleware::AppState;
use crate::api::responses::{ok, ApiJson, ApiResponse};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/debug/client-logs", post(client_logs))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// `ok` while the database answers, 503 `unavailable` otherwise
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (code, status) = match state.pool.ping().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(e) => {
            tracing::error!("Health check failed: {:#}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    };

    (
        code,
        Json(HealthResponse {
            status,
            timestamp: Utc::now(),
        }),
    )
}

#[derive(Debug, Deserialize)]
pub struct ClientLogs {
    pub logs: Vec<ClientLogEntry>,
}

/// One console call captured in the browser
#[derive(Debug, Deserialize)]
pub struct ClientLogEntry {
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub stacks: Vec<String>,
    #[serde(default)]
    pub extra: Vec<serde_json::Value>,
}

impl ClientLogEntry {
    fn format(&self) -> String {
        let mut message = format!("[{}] {}", self.level, self.message);
        if let Some(url) = &self.url {
            message.push_str(&format!(" ({})", url));
        }
        for stack in &self.stacks {
            for line in stack.lines() {
                message.push_str("\n    ");
                message.push_str(line);
            }
        }
        if !self.extra.is_empty() {
            let extra = serde_json::to_string_pretty(&self.extra).unwrap_or_default();
            message.push_str("\n    Extra data: ");
            message.push_str(&extra.replace('\n', "\n    "));
        }
        message
    }
}

async fn client_logs(ApiJson(body): ApiJson<ClientLogs>) -> Json<ApiResponse<()>> {
    for entry in &body.logs {
        let message = entry.format();
        match entry.level.as_str() {
            "error" => tracing::error!(target: "frontend", "{}", message),
            "warn" => tracing::warn!(target: "frontend", "{}", message),
            "debug" => tracing::debug!(target: "frontend", "{}", message),
            _ => tracing::info!(target: "frontend", "{}", message),
        }
    }
    ok()
}
