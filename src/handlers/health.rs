use std::time::Instant;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::AppState;

/// GET /health
///
/// Reports whether the database answers a ping.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();
    let db_result = crate::db::check_connection(&state.db).await;
    let latency_ms = start.elapsed().as_millis() as u64;

    match db_result {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "up",
                "version": env!("CARGO_PKG_VERSION"),
                "checks": { "database": { "status": "up", "latency_ms": latency_ms } },
                "timestamp": chrono::Utc::now().to_rfc3339()
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "down",
                "version": env!("CARGO_PKG_VERSION"),
                "checks": { "database": { "status": "down", "error": e.to_string() } },
                "timestamp": chrono::Utc::now().to_rfc3339()
            })),
        ),
    }
}
