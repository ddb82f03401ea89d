//! # REST API for Synced State
//!
//! One JSON document per authenticated user, guarded by revision tokens.
//! The revision is sent as the `ETag` header and echoed back by clients in
//! `If-Match`; a stale `If-Match` gets 409 unless `force=1` is passed.

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, QueryRejection},
        DefaultBodyLimit, Query, State,
    },
    http::{header, HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Extension, Router,
};
use serde_json::Value;
use shared::{ConflictResponse, PutStateResponse, Revision, StateResponse};
use tracing::{error, info};

use crate::domain::{SyncError, UserIdentity};
use crate::io::rest::errors::{json_error, method_not_allowed};
use crate::AppState;

const NO_STORE: &str = "no-store";

/// Largest accepted PUT body
pub const MAX_STATE_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Create a router for state sync APIs. Identity is enforced by the `/api` router.
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/state",
        get(get_state)
            .put(put_state)
            .fallback(method_not_allowed)
            .layer(DefaultBodyLimit::max(MAX_STATE_BODY_BYTES)),
    )
}

/// `force` from the query string; the first occurrence wins
fn is_forced(params: &[(String, String)]) -> bool {
    params
        .iter()
        .find(|(key, _)| key == "force")
        .is_some_and(|(_, value)| matches!(value.as_str(), "1" | "true"))
}

/// Get the caller's stored document
pub async fn get_state(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> Response {
    info!("GET /api/state - user: {}", user.user_id);

    match state.sync_service.fetch(&user).await {
        Ok(Some(document)) => (
            StatusCode::OK,
            revision_headers(document.updated_at),
            Json(StateResponse {
                state: document.state,
                updated_at: document.updated_at,
            }),
        )
            .into_response(),
        Ok(None) => (StatusCode::NO_CONTENT, [(header::CACHE_CONTROL, NO_STORE)]).into_response(),
        Err(e) => sync_error_response(e),
    }
}

/// Replace the caller's stored document
pub async fn put_state(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let force = match query {
        Ok(Query(params)) => is_forced(&params),
        Err(rejection) => return json_error(StatusCode::BAD_REQUEST, &rejection.body_text()),
    };
    info!("PUT /api/state - user: {}, force: {}", user.user_id, force);

    let body = match body {
        Ok(body) => body,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return json_error(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large")
        }
        Err(rejection) => return json_error(rejection.status(), &rejection.body_text()),
    };

    let candidate: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(_) => return json_error(StatusCode::BAD_REQUEST, "Invalid JSON body"),
    };
    if !candidate.is_object() {
        return json_error(StatusCode::BAD_REQUEST, "Body must be an object");
    }

    let expected = match headers.get(header::IF_MATCH) {
        None => None,
        Some(value) => match value.to_str().ok().and_then(parse_if_match) {
            Some(expected) => expected,
            None => return json_error(StatusCode::BAD_REQUEST, "Invalid If-Match header"),
        },
    };

    match state.sync_service.replace(&user, candidate, expected, force).await {
        Ok(revision) => (
            StatusCode::OK,
            revision_headers(revision),
            Json(PutStateResponse {
                ok: true,
                updated_at: revision,
            }),
        )
            .into_response(),
        Err(e) => sync_error_response(e),
    }
}

/// Parse an `If-Match` value: `123`, `"123"` or `W/"123"`.
///
/// `*` matches any stored revision and yields `Some(None)`; `None` means unparseable.
pub fn parse_if_match(value: &str) -> Option<Option<Revision>> {
    let value = value.trim();
    if value == "*" {
        return Some(None);
    }
    let value = value.strip_prefix("W/").unwrap_or(value);
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);
    value.parse().ok().map(Some)
}

fn revision_headers(revision: Revision) -> [(HeaderName, String); 2] {
    [
        (header::ETAG, revision.to_string()),
        (header::CACHE_CONTROL, NO_STORE.to_string()),
    ]
}

fn sync_error_response(e: SyncError) -> Response {
    match e {
        SyncError::Conflict { current } => (
            StatusCode::CONFLICT,
            [(header::ETAG, current.to_string())],
            Json(ConflictResponse {
                error: "Conflict".to_string(),
                current_updated_at: current,
            }),
        )
            .into_response(),
        SyncError::MalformedInput(message) => json_error(StatusCode::BAD_REQUEST, &message),
        SyncError::Storage(e) => {
            error!("State storage failure: {:?}", e);
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    }
}
