//! # Caller Identity
//!
//! The server sits behind an access proxy that authenticates users and
//! forwards who they are in request headers. Requests without them are
//! rejected before routing reaches a handler, whatever the method.

use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::domain::UserIdentity;
use crate::io::rest::errors::json_error;

pub const EMAIL_HEADER: &str = "cf-access-authenticated-user-email";
pub const USER_ID_HEADER: &str = "cf-access-authenticated-user-id";
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized (identity headers missing)";

/// Identity from the proxy headers. The user id falls back to the email.
pub fn identity_from_headers(headers: &HeaderMap) -> Option<UserIdentity> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let email = header(EMAIL_HEADER)?;
    let user_id = header(USER_ID_HEADER).unwrap_or_else(|| email.clone());
    Some(UserIdentity { user_id, email })
}

/// Middleware: attach the caller's [`UserIdentity`] or answer 401
pub async fn require_identity(mut request: Request, next: Next) -> Response {
    match identity_from_headers(request.headers()) {
        Some(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        None => {
            warn!("{} {} rejected: identity headers missing", request.method(), request.uri().path());
            json_error(StatusCode::UNAUTHORIZED, UNAUTHORIZED_MESSAGE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_identity_requires_email() {
        let mut headers = HeaderMap::new();
        assert!(identity_from_headers(&headers).is_none());

        headers.insert(USER_ID_HEADER, HeaderValue::from_static("user-1"));
        assert!(identity_from_headers(&headers).is_none());

        headers.insert(EMAIL_HEADER, HeaderValue::from_static("   "));
        assert!(identity_from_headers(&headers).is_none());
    }

    #[test]
    fn test_user_id_falls_back_to_email() {
        let mut headers = HeaderMap::new();
        headers.insert(EMAIL_HEADER, HeaderValue::from_static("a@example.com"));

        let identity = identity_from_headers(&headers).unwrap();
        assert_eq!(identity.user_id, "a@example.com");
        assert_eq!(identity.email, "a@example.com");

        headers.insert(USER_ID_HEADER, HeaderValue::from_static("user-1"));
        assert_eq!(identity_from_headers(&headers).unwrap().user_id, "user-1");
    }
}
