use events::{Connected, Event, CONNECTED_TYPE};
use futures_util::StreamExt;
use log::*;
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::subscription::{SubscriberRegistry, Subscription, Topic};
use crate::transport::{RawFrame, Transport};

pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(3);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Where the connector currently stands. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Reconnecting { attempt: u32 },
    Closed,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        matches!(self, ConnectionState::Open)
    }
}

#[derive(Debug, Clone)]
pub struct Options {
    /// Delay unit for linear backoff: the Nth reconnect waits `N * base_delay`.
    pub base_delay: Duration,
    /// Reconnect attempts before giving up for good.
    pub max_attempts: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

struct Shared {
    subscribers: Arc<SubscriberRegistry>,
    state_tx: watch::Sender<ConnectionState>,
    state_rx: watch::Receiver<ConnectionState>,
    connection_id: Mutex<Option<String>>,
}

impl Shared {
    fn set_state(&self, state: ConnectionState) {
        self.state_tx.send_replace(state);
    }

    fn handle_data(&self, data: &str) {
        let value: Value = match serde_json::from_str(data) {
            Ok(value) => value,
            Err(e) => {
                warn!("dropping malformed frame: {e}");
                return;
            }
        };

        // The control frame only updates local state; subscribers never see it
        if value.get("type").and_then(Value::as_str) == Some(CONNECTED_TYPE) {
            match serde_json::from_value::<Connected>(value) {
                Ok(frame) => {
                    debug!("stream acknowledged as connection {}", frame.connection_id);
                    *self
                        .connection_id
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner) = Some(frame.connection_id);
                }
                Err(e) => warn!("dropping malformed connected frame: {e}"),
            }
            return;
        }

        match serde_json::from_value::<Event>(value) {
            Ok(event) => self.subscribers.dispatch(&event),
            Err(e) => warn!("dropping malformed frame: {e}"),
        }
    }
}

/// One logical stream to the server. Construct with [`Connector::connect`],
/// register interest with [`Connector::subscribe`], tear down with
/// [`Connector::close`] (also safe before the first connection succeeds).
pub struct Connector {
    shared: Arc<Shared>,
    cancel: CancellationToken,
}

impl Connector {
    pub fn connect(transport: impl Transport, options: Options) -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Idle);
        let shared = Arc::new(Shared {
            subscribers: Arc::new(SubscriberRegistry::new()),
            state_tx,
            state_rx,
            connection_id: Mutex::new(None),
        });
        let cancel = CancellationToken::new();

        tokio::spawn(run_loop(
            Arc::clone(&shared),
            Arc::new(transport),
            options,
            cancel.clone(),
        ));

        Self { shared, cancel }
    }

    pub fn subscribe(
        &self,
        topic: Topic,
        callback: impl Fn(&Event) + Send + Sync + 'static,
    ) -> Subscription {
        let token = self.shared.subscribers.add(topic, Arc::new(callback));
        Subscription::new(Arc::downgrade(&self.shared.subscribers), topic, token)
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state_rx.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Observe state transitions, e.g. to render reconnect feedback.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_rx.clone()
    }

    /// Server-assigned id of the current stream, once acknowledged.
    pub fn connection_id(&self) -> Option<String> {
        self.shared
            .connection_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Cancel any pending reconnect and close the active stream. Idempotent.
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for Connector {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_loop(
    shared: Arc<Shared>,
    transport: Arc<dyn Transport>,
    options: Options,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        shared.set_state(ConnectionState::Connecting);

        let opened = tokio::select! {
            _ = cancel.cancelled() => break,
            opened = transport.open() => opened,
        };

        match opened {
            Ok(mut stream) => {
                // A successful open restarts the backoff ladder, whether or
                // not the stream ever yields a frame.
                attempt = 0;
                shared.set_state(ConnectionState::Open);
                debug!("event stream open");
                loop {
                    let item = tokio::select! {
                        _ = cancel.cancelled() => {
                            shared.set_state(ConnectionState::Closed);
                            return;
                        }
                        item = stream.next() => item,
                    };
                    match item {
                        Some(Ok(frame)) => match frame {
                            RawFrame::Comment => {} // keep-alive
                            RawFrame::Data(data) => shared.handle_data(&data),
                        },
                        Some(Err(e)) => {
                            warn!("event stream error: {e}");
                            break;
                        }
                        None => {
                            debug!("event stream ended");
                            break;
                        }
                    }
                }
            }
            Err(e) => warn!("failed to open event stream: {e}"),
        }

        attempt += 1;
        if attempt > options.max_attempts {
            error!(
                "giving up after {} reconnect attempts; manual restart required",
                options.max_attempts
            );
            break;
        }

        let delay = options.base_delay * attempt;
        info!(
            "reconnecting in {:?} (attempt {}/{})",
            delay, attempt, options.max_attempts
        );
        shared.set_state(ConnectionState::Reconnecting { attempt });

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    shared.set_state(ConnectionState::Closed);
}
