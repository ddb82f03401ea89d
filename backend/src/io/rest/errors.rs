//! JSON error responses shared by every endpoint.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use shared::ErrorResponse;
use tracing::info;

/// A JSON `{ "error": message }` response with the given status
pub fn json_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// Fallback for unknown routes
pub async fn not_found() -> Response {
    info!("Unknown route requested");
    json_error(StatusCode::NOT_FOUND, "Not found")
}

/// Fallback for unsupported methods on a known route
pub async fn method_not_allowed() -> Response {
    json_error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}
