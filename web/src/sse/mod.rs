//! SSE transport adapter.
//!
//! Turns one authenticated HTTP request into one long-lived, filtered event
//! stream. The handler lives in `handler`; this module builds the delivery
//! callback registered with the broker: visibility predicate first, then a
//! JSON frame write into the connection's channel.

use axum::response::sse::Event as SseFrame;
use events::{Event, Recipient};
use sse::{DeliveryCallback, DeliveryError};
use std::convert::Infallible;
use tokio::sync::mpsc::UnboundedSender;

pub mod handler;

pub(crate) type FrameSender = UnboundedSender<Result<SseFrame, Infallible>>;

/// Build the per-connection delivery callback. The closure owns the captured
/// recipient for the life of the connection; role changes elsewhere take
/// effect only after a reconnect.
pub(crate) fn delivery_callback(recipient: Recipient, tx: FrameSender) -> DeliveryCallback {
    Box::new(move |event: &Event| {
        if !events::should_forward(event, &recipient) {
            return Ok(());
        }
        let json = serde_json::to_string(event)
            .map_err(|e| DeliveryError::new(format!("failed to serialize event: {e}")))?;
        tx.send(Ok(SseFrame::default().data(json)))
            .map_err(|_| DeliveryError::new("connection channel closed"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use events::{EventPayload, Role};
    use serde_json::json;
    use sse::{Broker, ConnectionId};
    use tokio::sync::mpsc;
    use tokio::sync::mpsc::UnboundedReceiver;

    type FrameReceiver = UnboundedReceiver<Result<SseFrame, Infallible>>;

    fn open_connection(
        broker: &Broker,
        id: &str,
        role: Role,
    ) -> (sse::Unregister, FrameReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let recipient = Recipient::new(id, role);
        let guard = broker.register(
            ConnectionId::new(id),
            delivery_callback(recipient, tx),
        );
        (guard, rx)
    }

    fn drain(rx: &mut FrameReceiver) -> usize {
        let mut count = 0;
        while rx.try_recv().is_ok() {
            count += 1;
        }
        count
    }

    // One admin and one regular user are connected; a ticket is created and
    // announced admin-only. The admin sees it, the ticket owner does not.
    #[test]
    fn admin_only_ticket_created_reaches_only_the_admin() {
        let broker = Broker::new();
        let (_admin_guard, mut admin_rx) = open_connection(&broker, "u-admin", Role::Admin);
        let (_owner_guard, mut owner_rx) = open_connection(&broker, "u-owner", Role::User);

        broker.broadcast(
            Event::new(EventPayload::TicketCreated {
                ticket: json!({"id": "T-1", "ownerId": "u-owner"}),
            })
            .for_admins(),
        );

        assert_eq!(drain(&mut admin_rx), 1);
        assert_eq!(drain(&mut owner_rx), 0);
    }

    // User B comments on user A's ticket: one broadcast targeted at A, one
    // admin-only. A gets exactly one frame, the admin exactly one, B none.
    #[test]
    fn comment_fan_out_matches_the_visibility_table() {
        let broker = Broker::new();
        let (_a_guard, mut a_rx) = open_connection(&broker, "u-A", Role::User);
        let (_b_guard, mut b_rx) = open_connection(&broker, "u-B", Role::User);
        let (_admin_guard, mut admin_rx) = open_connection(&broker, "u-admin", Role::Admin);

        let comment = EventPayload::CommentCreated {
            ticket_id: "T-1".to_string(),
            comment: json!({"body": "looking into it"}),
        };
        broker.broadcast(Event::new(comment.clone()).for_user("u-A"));
        broker.broadcast(Event::new(comment).for_admins());

        assert_eq!(drain(&mut a_rx), 1);
        assert_eq!(drain(&mut admin_rx), 1);
        assert_eq!(drain(&mut b_rx), 0);
    }

    #[test]
    fn dropped_receiver_surfaces_as_a_delivery_error() {
        let broker = Broker::new();
        let (guard, rx) = open_connection(&broker, "u-admin", Role::Admin);
        drop(rx);

        // The broker logs and carries on; the registration itself survives
        // until the transport unregisters.
        broker.broadcast(
            Event::new(EventPayload::KpiTicketCreated {
                ticket_id: "T-1".to_string(),
            })
            .for_admins(),
        );
        assert_eq!(broker.connection_count(), 1);
        guard.call();
        assert_eq!(broker.connection_count(), 0);
    }
}
