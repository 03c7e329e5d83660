use crate::model::{ApiResponse, HealthResponse};
use axum::Json;

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Heartbeat answering `.` as plain text.
pub async fn ping_handler() -> &'static str {
    "."
}

pub async fn index_handler() -> Json<ApiResponse<()>> {
    Json(ApiResponse {
        error: false,
        message: "Welcome to URL Shortener API".to_string(),
        data: None,
    })
}
