//! Event model for the helpdesk real-time subsystem.
//!
//! This crate defines the values that flow between producers, the broker and
//! connected clients:
//!
//! - **Event**: a tagged union with one variant per wire event type, plus the
//!   delivery envelope (`userId`, `adminOnly`, `timestamp`).
//! - **Recipient**: `{ id, role }` captured once when a stream opens.
//! - **Connected**: the control frame sent first on every new stream.
//! - **should_forward**: the pure visibility predicate deciding whether a
//!   given event may be delivered to a given recipient.
//!
//! The crate has no dependencies on the broker or the web layer so both the
//! server and the client connector can share these types. Entity data is
//! carried as `serde_json::Value` to avoid coupling to any storage schema.

mod event;
mod policy;

pub use event::{Connected, Event, EventKind, EventPayload, ParseEventKindError, CONNECTED_TYPE};
pub use policy::should_forward;

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// User identifiers are opaque strings issued by the auth collaborator.
pub type UserId = String;

/// The role a recipient holds for the lifetime of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// Identity attached to a connection, captured at stream open. A role change
/// elsewhere in the system only takes effect after reconnecting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: UserId,
    pub role: Role,
}

impl Recipient {
    pub fn new(id: impl Into<UserId>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }
}

/// Milliseconds since the Unix epoch, the timestamp unit used on the wire.
pub fn epoch_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
