use axum::Json;
use axum::response::IntoResponse;
use http::StatusCode;

/// Liveness probe; the process answering is the whole check
pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}
