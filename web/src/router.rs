use crate::controller::{
    health_check_controller, ticket_controller, user_session_controller,
};
use crate::params;
use axum::http::HeaderValue;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use service::config::RustEnv;
use service::AppState;
use tower_http::cors::{Any, CorsLayer};

use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Helpdesk API"
        ),
        paths(
            health_check_controller::health_check,
            user_session_controller::login,
            user_session_controller::logout,
            crate::sse::handler::stream,
            ticket_controller::create,
            ticket_controller::index,
            ticket_controller::update,
            ticket_controller::create_comment,
            ticket_controller::update_status,
            ticket_controller::assign,
        ),
        components(
            schemas(
                service::store::Ticket,
                service::store::Comment,
                service::store::TicketStatus,
                params::ticket::CreateParams,
                params::ticket::UpdateParams,
                params::ticket::CreateCommentParams,
                params::ticket::UpdateStatusParams,
                params::ticket::AssignParams,
                params::user_session::Credentials,
            )
        ),
        modifiers(&SecurityAddon),
        tags(
            (name = "helpdesk", description = "Helpdesk ticketing & real-time event API")
        )
    )]
struct ApiDoc;

struct SecurityAddon;

// Defines our bearer token authentication requirement for gaining access to our
// API endpoints for OpenAPI.
impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

pub fn define_routes(app_state: AppState) -> Router {
    let cors = cors_layer(&app_state);

    Router::new()
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/rapidoc"))
        .route("/health", get(health_check_controller::health_check))
        .route("/login", post(user_session_controller::login))
        .route("/logout", delete(user_session_controller::logout))
        .route("/events/stream", get(crate::sse::handler::stream))
        .route(
            "/tickets",
            post(ticket_controller::create).get(ticket_controller::index),
        )
        .route("/tickets/:id", put(ticket_controller::update))
        .route(
            "/tickets/:id/comments",
            post(ticket_controller::create_comment),
        )
        .route("/tickets/:id/status", put(ticket_controller::update_status))
        .route("/tickets/:id/assignee", put(ticket_controller::assign))
        .layer(cors)
        .with_state(app_state)
}

fn cors_layer(app_state: &AppState) -> CorsLayer {
    if app_state.config.runtime_env == RustEnv::Development {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = app_state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}
