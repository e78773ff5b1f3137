//! Ticket CRUD glue. Each mutation completes its store write first, then
//! fires best-effort broadcasts through `service::realtime`; delivery can
//! never fail the request.

use crate::error::{Error, Result};
use crate::extractors::authenticated_user::AuthenticatedUser;
use crate::params::ticket::{
    AssignParams, CreateCommentParams, CreateParams, UpdateParams, UpdateStatusParams,
};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use service::{realtime, AppState};

/// POST open a new ticket
#[utoipa::path(
    post,
    path = "/tickets",
    request_body = CreateParams,
    responses(
        (status = 201, description = "Ticket created", body = service::store::Ticket),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
    Json(params): Json<CreateParams>,
) -> Result<impl IntoResponse> {
    if params.subject.trim().is_empty() {
        return Err(Error::Invalid("subject must not be empty".to_string()));
    }
    let ticket = app_state
        .tickets
        .create_ticket(&user.id, &params.subject, &params.body);
    realtime::ticket_created(&app_state.broker, &ticket);
    Ok((StatusCode::CREATED, Json(ticket)))
}

/// GET tickets visible to the caller
#[utoipa::path(
    get,
    path = "/tickets",
    responses(
        (status = 200, description = "Own tickets, or all tickets for admins",
            body = [service::store::Ticket]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn index(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
) -> impl IntoResponse {
    let mut tickets = app_state.tickets.list();
    if !user.role.is_admin() {
        tickets.retain(|t| t.owner_id == user.id);
    }
    Json(tickets)
}

/// PUT edit a ticket's subject or body (owner or admin)
#[utoipa::path(
    put,
    path = "/tickets/{id}",
    request_body = UpdateParams,
    responses(
        (status = 200, description = "Ticket updated", body = service::store::Ticket),
        (status = 403, description = "Caller neither owns the ticket nor is an admin"),
        (status = 404, description = "No such ticket")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    Json(params): Json<UpdateParams>,
) -> Result<impl IntoResponse> {
    let existing = app_state.tickets.get(&id).ok_or(Error::NotFound)?;
    if !user.role.is_admin() && existing.owner_id != user.id {
        return Err(Error::Forbidden);
    }
    if let Some(subject) = &params.subject {
        if subject.trim().is_empty() {
            return Err(Error::Invalid("subject must not be empty".to_string()));
        }
    }
    let ticket = app_state
        .tickets
        .update_ticket(&id, params.subject.as_deref(), params.body.as_deref())
        .ok_or(Error::NotFound)?;
    realtime::ticket_updated(&app_state.broker, &ticket, &user.id);
    Ok(Json(ticket))
}

/// POST add a comment to a ticket
#[utoipa::path(
    post,
    path = "/tickets/{id}/comments",
    request_body = CreateCommentParams,
    responses(
        (status = 201, description = "Comment created", body = service::store::Comment),
        (status = 404, description = "No such ticket")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_comment(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    Json(params): Json<CreateCommentParams>,
) -> Result<impl IntoResponse> {
    let (ticket, comment) = app_state
        .tickets
        .add_comment(&id, &user.id, &params.body)
        .ok_or(Error::NotFound)?;
    realtime::comment_created(&app_state.broker, &ticket, &comment);
    Ok((StatusCode::CREATED, Json(comment)))
}

/// PUT change a ticket's status (admins only)
#[utoipa::path(
    put,
    path = "/tickets/{id}/status",
    request_body = UpdateStatusParams,
    responses(
        (status = 200, description = "Status updated", body = service::store::Ticket),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "No such ticket")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_status(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    Json(params): Json<UpdateStatusParams>,
) -> Result<impl IntoResponse> {
    if !user.role.is_admin() {
        return Err(Error::Forbidden);
    }
    let ticket = app_state
        .tickets
        .set_status(&id, params.status)
        .ok_or(Error::NotFound)?;
    realtime::status_changed(&app_state.broker, &ticket);
    Ok(Json(ticket))
}

/// PUT assign a ticket to an agent (admins only)
#[utoipa::path(
    put,
    path = "/tickets/{id}/assignee",
    request_body = AssignParams,
    responses(
        (status = 200, description = "Ticket assigned", body = service::store::Ticket),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "No such ticket")
    ),
    security(("bearer_auth" = []))
)]
pub async fn assign(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    Json(params): Json<AssignParams>,
) -> Result<impl IntoResponse> {
    if !user.role.is_admin() {
        return Err(Error::Forbidden);
    }
    let ticket = app_state
        .tickets
        .assign(&id, &params.assignee_id)
        .ok_or(Error::NotFound)?;
    realtime::ticket_assigned(&app_state.broker, &ticket);
    Ok(Json(ticket))
}
