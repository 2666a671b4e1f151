use axum::{http::StatusCode, response::Response};
use serde::Serialize;

use crate::core::http::response_envelope::ApiResponse;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// GET /health
pub async fn health_route() -> Response {
    ApiResponse::success(HealthResponse { status: "ok" }).into_response_with_status(StatusCode::OK)
}
