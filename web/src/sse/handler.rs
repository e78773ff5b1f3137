use crate::extractors::authenticated_user::AuthenticatedUser;
use async_stream::stream;
use axum::extract::State;
use axum::http::{header, HeaderName};
use axum::response::sse::{Event as SseFrame, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use events::{epoch_millis, Connected};
use log::*;
use service::AppState;
use sse::ConnectionId;
use tokio::sync::mpsc;

/// GET the event stream. One long-lived connection per request; events
/// arrive pre-filtered for the authenticated recipient.
#[utoipa::path(
    get,
    path = "/events/stream",
    responses(
        (status = 200, description = "text/event-stream of events visible to the caller"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub(crate) async fn stream(
    AuthenticatedUser(recipient): AuthenticatedUser,
    State(app_state): State<AppState>,
) -> Response {
    debug!("establishing event stream for user {}", recipient.id);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let connection_id = ConnectionId::new(&recipient.id);

    // Acknowledge the stream before anything can be broadcast on it
    let hello = Connected {
        connection_id: connection_id.as_str().to_string(),
        timestamp: epoch_millis(),
    };
    match serde_json::to_string(&hello) {
        Ok(json) => {
            let _ = tx.send(Ok(SseFrame::default().data(json)));
        }
        Err(e) => error!("failed to serialize connected frame: {e}"),
    }

    let unregister = app_state.broker.register(
        connection_id,
        super::delivery_callback(recipient.clone(), tx),
    );

    let user_id = recipient.id;
    let stream = stream! {
        // Owned by the generator: dropped (and therefore unregistered,
        // exactly once) whether the channel drains or the client goes away
        // mid-stream.
        let _cleanup = unregister;
        while let Some(frame) = rx.recv().await {
            yield frame;
        }
        debug!("event stream closed for user {user_id}");
    };

    let sse = Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(app_state.config.sse_keepalive_interval()));

    (
        [
            (header::CACHE_CONTROL, "no-cache, no-transform"),
            (header::CONNECTION, "keep-alive"),
            // nginx: do not buffer this response
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        sse,
    )
        .into_response()
}
