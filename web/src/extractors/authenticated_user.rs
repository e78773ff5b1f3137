use crate::extractors::{bearer_token, RejectionType};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use events::Recipient;
use service::AppState;

/// Resolves the caller through the session registry (the auth collaborator).
/// No user behind the token means 401 and nothing further is allocated.
pub(crate) struct AuthenticatedUser(pub Recipient);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = RejectionType;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let unauthorized = || (StatusCode::UNAUTHORIZED, "Unauthorized".to_string());

        let token = bearer_token(&parts.headers).ok_or_else(unauthorized)?;
        match state.sessions.resolve(token) {
            Some(recipient) => Ok(AuthenticatedUser(recipient)),
            None => Err(unauthorized()),
        }
    }
}
