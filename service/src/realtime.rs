//! Producer-side bridge from store mutations to broker broadcasts.
//!
//! Controllers call these functions after their own write completes. Every
//! broadcast is best-effort: serialization failures are logged and swallowed,
//! absent connections drop the event, and nothing here can fail the caller's
//! operation.
//!
//! Routing convention: a copy targeted at the affected user (when that user
//! is not the actor), plus an admin-only copy so the back office sees all
//! activity.

use log::*;
use serde_json::Value;
use sse::Broker;

use crate::store::{Comment, Ticket, TicketStatus};
use events::{Event, EventPayload};

fn to_value<T: serde::Serialize>(entity: &T, what: &str) -> Option<Value> {
    match serde_json::to_value(entity) {
        Ok(value) => Some(value),
        Err(e) => {
            error!("failed to serialize {what} for broadcast: {e}");
            None
        }
    }
}

/// A ticket was opened. Admins see the full ticket and a KPI tick; the owner
/// already has the response body in hand and gets nothing.
pub fn ticket_created(broker: &Broker, ticket: &Ticket) {
    let Some(value) = to_value(ticket, "ticket") else {
        return;
    };
    broker.broadcast(Event::new(EventPayload::TicketCreated { ticket: value }).for_admins());
    broker.broadcast(
        Event::new(EventPayload::KpiTicketCreated {
            ticket_id: ticket.id.clone(),
        })
        .for_admins(),
    );
}

/// A ticket's fields were edited. The owner is notified unless they made the
/// edit themselves; admins always get a copy.
pub fn ticket_updated(broker: &Broker, ticket: &Ticket, actor_id: &str) {
    let Some(value) = to_value(ticket, "ticket") else {
        return;
    };
    if actor_id != ticket.owner_id {
        broker.broadcast(
            Event::new(EventPayload::TicketUpdated {
                ticket: value.clone(),
            })
            .for_user(ticket.owner_id.clone()),
        );
    }
    broker.broadcast(Event::new(EventPayload::TicketUpdated { ticket: value }).for_admins());
}

/// A comment landed on a ticket. The owner is notified unless they wrote it
/// themselves; admins always get a copy.
pub fn comment_created(broker: &Broker, ticket: &Ticket, comment: &Comment) {
    let Some(value) = to_value(comment, "comment") else {
        return;
    };
    if comment.author_id != ticket.owner_id {
        broker.broadcast(
            Event::new(EventPayload::CommentCreated {
                ticket_id: ticket.id.clone(),
                comment: value.clone(),
            })
            .for_user(ticket.owner_id.clone()),
        );
    }
    broker.broadcast(
        Event::new(EventPayload::CommentCreated {
            ticket_id: ticket.id.clone(),
            comment: value,
        })
        .for_admins(),
    );
}

/// A ticket changed status. The owner and admins are told; a resolution also
/// ticks the KPI counter.
pub fn status_changed(broker: &Broker, ticket: &Ticket) {
    let payload = EventPayload::TicketStatusChanged {
        ticket_id: ticket.id.clone(),
        status: ticket.status.to_string(),
    };
    broker.broadcast(Event::new(payload.clone()).for_user(ticket.owner_id.clone()));
    broker.broadcast(Event::new(payload).for_admins());

    if ticket.status == TicketStatus::Resolved {
        broker.broadcast(
            Event::new(EventPayload::KpiTicketResolved {
                ticket_id: ticket.id.clone(),
            })
            .for_admins(),
        );
    }
}

/// A ticket was handed to an agent. The assignee is notified directly.
pub fn ticket_assigned(broker: &Broker, ticket: &Ticket) {
    let Some(assignee_id) = ticket.assignee_id.clone() else {
        return;
    };
    let payload = EventPayload::TicketAssigned {
        ticket_id: ticket.id.clone(),
        assignee_id: assignee_id.clone(),
    };
    broker.broadcast(Event::new(payload.clone()).for_user(assignee_id));
    broker.broadcast(Event::new(payload).for_admins());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TicketStore;
    use sse::{ConnectionId, DeliveryCallback};
    use std::sync::{Arc, Mutex};

    fn recording(broker: &Broker, id: &str) -> (sse::Unregister, Arc<Mutex<Vec<Event>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: DeliveryCallback = Box::new(move |event| {
            sink.lock().unwrap().push(event.clone());
            Ok(())
        });
        (broker.register(ConnectionId::from_raw(id), callback), seen)
    }

    #[test]
    fn comment_by_someone_else_produces_targeted_and_admin_copies() {
        let broker = Broker::new();
        let store = TicketStore::new();
        let ticket = store.create_ticket("u-A", "subject", "body");
        let (_, comment) = store.add_comment(&ticket.id, "u-B", "on it").unwrap();

        let (_guard, seen) = recording(&broker, "c-1");
        comment_created(&broker, &ticket, &comment);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].user_id.as_deref(), Some("u-A"));
        assert!(!seen[0].admin_only);
        assert!(seen[1].admin_only);
        assert!(seen[1].user_id.is_none());
    }

    #[test]
    fn own_comment_skips_the_targeted_copy() {
        let broker = Broker::new();
        let store = TicketStore::new();
        let ticket = store.create_ticket("u-A", "subject", "body");
        let (_, comment) = store.add_comment(&ticket.id, "u-A", "nevermind").unwrap();

        let (_guard, seen) = recording(&broker, "c-1");
        comment_created(&broker, &ticket, &comment);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].admin_only);
    }

    #[test]
    fn admin_edit_produces_targeted_and_admin_copies() {
        let broker = Broker::new();
        let store = TicketStore::new();
        let ticket = store.create_ticket("u-A", "subject", "body");
        let updated = store
            .update_ticket(&ticket.id, Some("better subject"), None)
            .unwrap();

        let (_guard, seen) = recording(&broker, "c-1");
        ticket_updated(&broker, &updated, "u-admin");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].kind(), events::EventKind::TicketUpdated);
        assert_eq!(seen[0].user_id.as_deref(), Some("u-A"));
        assert!(seen[1].admin_only);
    }

    #[test]
    fn own_edit_skips_the_targeted_copy() {
        let broker = Broker::new();
        let store = TicketStore::new();
        let ticket = store.create_ticket("u-A", "subject", "body");

        let (_guard, seen) = recording(&broker, "c-1");
        ticket_updated(&broker, &ticket, "u-A");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].admin_only);
    }

    #[test]
    fn resolving_a_ticket_ticks_the_kpi_counter() {
        let broker = Broker::new();
        let store = TicketStore::new();
        let ticket = store.create_ticket("u-A", "subject", "body");
        let resolved = store.set_status(&ticket.id, TicketStatus::Resolved).unwrap();

        let (_guard, seen) = recording(&broker, "c-1");
        status_changed(&broker, &resolved);

        let kinds: Vec<_> = seen.lock().unwrap().iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                events::EventKind::TicketStatusChanged,
                events::EventKind::TicketStatusChanged,
                events::EventKind::KpiTicketResolved,
            ]
        );
    }
}
