use std::sync::Arc;
use std::time::Duration;

use config::Config;
use session::SessionRegistry;
use sse::Broker;
use store::TicketStore;

pub mod config;
pub mod logging;
pub mod realtime;
pub mod session;
pub mod store;

// Service-level state containing only infrastructure concerns.
// Needs to implement Clone to be able to be passed into Router as State.
#[derive(Clone)]
pub struct AppState {
    /// The single broker instance for this process. Producers and the SSE
    /// transport share this registry; it never outlives the process.
    pub broker: Broker,
    pub sessions: Arc<SessionRegistry>,
    pub tickets: Arc<TicketStore>,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let session_expiry = Duration::from_secs(config.session_expiry_secs);
        Self {
            broker: Broker::new(),
            sessions: Arc::new(SessionRegistry::new(session_expiry)),
            tickets: Arc::new(TicketStore::new()),
            config,
        }
    }
}
