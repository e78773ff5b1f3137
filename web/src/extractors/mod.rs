use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};

pub(crate) mod authenticated_user;

pub(crate) type RejectionType = (StatusCode, String);

/// Pulls the bearer token out of the Authorization header, if any.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}
