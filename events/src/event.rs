use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::UserId;

/// Wire type of the control frame sent once when a stream opens.
pub const CONNECTED_TYPE: &str = "connected";

/// Everything that can happen in the helpdesk and be pushed to clients.
///
/// Serialized adjacently tagged: `{"type": "<tag>", "data": {...}}`. The tag
/// names are the wire contract and must stay stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum EventPayload {
    /// A new ticket was opened. Carries the full serialized ticket so the
    /// frontend can render it without a follow-up fetch.
    #[serde(rename = "ticket:created")]
    #[serde(rename_all = "camelCase")]
    TicketCreated { ticket: Value },

    /// A ticket's fields were edited. Carries the full serialized ticket,
    /// like `ticket:created`.
    #[serde(rename = "ticket:updated")]
    #[serde(rename_all = "camelCase")]
    TicketUpdated { ticket: Value },

    /// A ticket moved to a new status.
    #[serde(rename = "ticket:status_changed")]
    #[serde(rename_all = "camelCase")]
    TicketStatusChanged { ticket_id: String, status: String },

    /// A ticket was assigned to an agent.
    #[serde(rename = "ticket:assigned")]
    #[serde(rename_all = "camelCase")]
    TicketAssigned {
        ticket_id: String,
        assignee_id: String,
    },

    /// A comment was added to a ticket.
    #[serde(rename = "comment:created")]
    #[serde(rename_all = "camelCase")]
    CommentCreated { ticket_id: String, comment: Value },

    /// Dashboard counter tick: a ticket entered the system.
    #[serde(rename = "kpi:ticket_created")]
    #[serde(rename_all = "camelCase")]
    KpiTicketCreated { ticket_id: String },

    /// Dashboard counter tick: a ticket was resolved.
    #[serde(rename = "kpi:ticket_resolved")]
    #[serde(rename_all = "camelCase")]
    KpiTicketResolved { ticket_id: String },
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::TicketCreated { .. } => EventKind::TicketCreated,
            EventPayload::TicketUpdated { .. } => EventKind::TicketUpdated,
            EventPayload::TicketStatusChanged { .. } => EventKind::TicketStatusChanged,
            EventPayload::TicketAssigned { .. } => EventKind::TicketAssigned,
            EventPayload::CommentCreated { .. } => EventKind::CommentCreated,
            EventPayload::KpiTicketCreated { .. } => EventKind::KpiTicketCreated,
            EventPayload::KpiTicketResolved { .. } => EventKind::KpiTicketResolved,
        }
    }
}

/// Field-less mirror of [`EventPayload`], used as a subscription key by the
/// client connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    TicketCreated,
    TicketUpdated,
    TicketStatusChanged,
    TicketAssigned,
    CommentCreated,
    KpiTicketCreated,
    KpiTicketResolved,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::TicketCreated => "ticket:created",
            EventKind::TicketUpdated => "ticket:updated",
            EventKind::TicketStatusChanged => "ticket:status_changed",
            EventKind::TicketAssigned => "ticket:assigned",
            EventKind::CommentCreated => "comment:created",
            EventKind::KpiTicketCreated => "kpi:ticket_created",
            EventKind::KpiTicketResolved => "kpi:ticket_resolved",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseEventKindError(pub String);

impl fmt::Display for ParseEventKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown event type: {}", self.0)
    }
}

impl std::error::Error for ParseEventKindError {}

impl FromStr for EventKind {
    type Err = ParseEventKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ticket:created" => Ok(EventKind::TicketCreated),
            "ticket:updated" => Ok(EventKind::TicketUpdated),
            "ticket:status_changed" => Ok(EventKind::TicketStatusChanged),
            "ticket:assigned" => Ok(EventKind::TicketAssigned),
            "comment:created" => Ok(EventKind::CommentCreated),
            "kpi:ticket_created" => Ok(EventKind::KpiTicketCreated),
            "kpi:ticket_resolved" => Ok(EventKind::KpiTicketResolved),
            other => Err(ParseEventKindError(other.to_string())),
        }
    }
}

/// A payload plus its delivery envelope. Immutable once broadcast; the broker
/// overwrites `timestamp` at broadcast time regardless of what the producer
/// set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(flatten)]
    pub payload: EventPayload,

    /// When present, the event targets exactly this recipient.
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,

    /// When true, only admin recipients may receive the event.
    #[serde(rename = "adminOnly", default, skip_serializing_if = "is_false")]
    pub admin_only: bool,

    /// Epoch milliseconds, stamped by the broker.
    #[serde(default)]
    pub timestamp: i64,
}

fn is_false(v: &bool) -> bool {
    !*v
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            payload,
            user_id: None,
            admin_only: false,
            timestamp: 0,
        }
    }

    /// Target the event at a single recipient.
    pub fn for_user(mut self, user_id: impl Into<UserId>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Restrict the event to admin recipients.
    pub fn for_admins(mut self) -> Self {
        self.admin_only = true;
        self
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }
}

/// Control frame acknowledging a new stream. Never enters the broker and is
/// never dispatched to client subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "connected", rename_all = "camelCase")]
pub struct Connected {
    pub connection_id: String,
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_wire_shape_matches_contract() {
        let event = Event::new(EventPayload::CommentCreated {
            ticket_id: "T-7".to_string(),
            comment: json!({"body": "any update?"}),
        })
        .for_user("u-1");

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "comment:created",
                "data": {"ticketId": "T-7", "comment": {"body": "any update?"}},
                "userId": "u-1",
                "timestamp": 0
            })
        );
    }

    #[test]
    fn admin_only_is_absent_unless_set() {
        let plain = serde_json::to_value(Event::new(EventPayload::KpiTicketCreated {
            ticket_id: "T-1".to_string(),
        }))
        .unwrap();
        assert!(plain.get("adminOnly").is_none());
        assert!(plain.get("userId").is_none());

        let restricted = serde_json::to_value(
            Event::new(EventPayload::KpiTicketCreated {
                ticket_id: "T-1".to_string(),
            })
            .for_admins(),
        )
        .unwrap();
        assert_eq!(restricted["adminOnly"], json!(true));
    }

    #[test]
    fn event_round_trips_through_json() {
        let event = Event::new(EventPayload::TicketStatusChanged {
            ticket_id: "T-2".to_string(),
            status: "resolved".to_string(),
        })
        .for_admins();

        let json = serde_json::to_string(&event).unwrap();
        let parsed: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn connected_frame_wire_shape() {
        let frame = Connected {
            connection_id: "u-1-1700000000000".to_string(),
            timestamp: 1_700_000_000_000,
        };
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "connected",
                "connectionId": "u-1-1700000000000",
                "timestamp": 1_700_000_000_000_i64
            })
        );
    }

    #[test]
    fn event_kind_parses_its_own_wire_names() {
        for kind in [
            EventKind::TicketCreated,
            EventKind::TicketUpdated,
            EventKind::TicketStatusChanged,
            EventKind::TicketAssigned,
            EventKind::CommentCreated,
            EventKind::KpiTicketCreated,
            EventKind::KpiTicketResolved,
        ] {
            assert_eq!(kind.as_str().parse::<EventKind>(), Ok(kind));
        }
        assert!("ticket:exploded".parse::<EventKind>().is_err());
    }
}
