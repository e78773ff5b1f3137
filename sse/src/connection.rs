use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Weak;

use events::{epoch_millis, Event};

use crate::broker::Registry;

/// Unique identifier for one stream, derived from the recipient identity and
/// the creation instant. Opaque beyond registry lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new(recipient_id: &str) -> Self {
        Self(format!("{}-{}", recipient_id, epoch_millis()))
    }

    /// Build an id from a raw string. Useful in tests that need stable ids.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error surfaced by a delivery callback. The broker logs it and moves on;
/// it never aborts delivery to other connections.
#[derive(Debug)]
pub struct DeliveryError {
    message: String,
}

impl DeliveryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for DeliveryError {}

/// Per-connection delivery side effect, built by the transport layer. The
/// closure owns the visibility filtering plus the frame write.
pub type DeliveryCallback = Box<dyn Fn(&Event) -> Result<(), DeliveryError> + Send + Sync>;

/// Removes exactly one registered callback. Idempotent: the second and later
/// calls are no-ops, and dropping the guard unregisters as well.
pub struct Unregister {
    registry: Weak<Registry>,
    connection_id: ConnectionId,
    seq: u64,
    done: AtomicBool,
}

impl Unregister {
    pub(crate) fn new(registry: Weak<Registry>, connection_id: ConnectionId, seq: u64) -> Self {
        Self {
            registry,
            connection_id,
            seq,
            done: AtomicBool::new(false),
        }
    }

    pub fn connection_id(&self) -> &ConnectionId {
        &self.connection_id
    }

    pub fn call(&self) {
        if self.done.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.connection_id, self.seq);
        }
    }
}

impl Drop for Unregister {
    fn drop(&mut self) {
        self.call();
    }
}
