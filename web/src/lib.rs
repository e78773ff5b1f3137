//! HTTP layer: router, auth extractor, the SSE transport adapter and the
//! producer controllers. All state comes in through [`service::AppState`].

use log::*;
use service::AppState;

pub mod controller;
pub mod error;
pub(crate) mod extractors;
pub mod params;
pub mod router;
pub mod sse;

pub use error::{Error, Result};

pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let addr = format!(
        "{}:{}",
        app_state.config.interface, app_state.config.port
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on {addr}");

    axum::serve(listener, router::define_routes(app_state)).await
}
