use crate::error::{Error, Result};
use crate::extractors::bearer_token;
use crate::params::user_session::Credentials;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use log::*;
use serde_json::json;
use service::AppState;

/// POST exchange credentials for a bearer token
#[utoipa::path(
    post,
    path = "/login",
    request_body = Credentials,
    responses(
        (status = 200, description = "Session created; body carries the bearer token and the user"),
        (status = 401, description = "Unknown email or wrong password")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<impl IntoResponse> {
    match app_state
        .sessions
        .login(&credentials.email, &credentials.password)
    {
        Some((token, recipient)) => {
            info!("user {} logged in", recipient.id);
            Ok(Json(json!({"token": token, "user": recipient})))
        }
        None => Err(Error::Unauthorized),
    }
}

/// DELETE revoke the presented session token
#[utoipa::path(
    delete,
    path = "/logout",
    responses(
        (status = 204, description = "Session revoked (or was already gone)")
    ),
    security(("bearer_auth" = []))
)]
pub async fn logout(State(app_state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(token) = bearer_token(&headers) {
        app_state.sessions.revoke(token);
    }
    StatusCode::NO_CONTENT
}
