use dashmap::DashMap;
use log::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use events::{epoch_millis, Event};

use crate::connection::{ConnectionId, DeliveryCallback, Unregister};

struct Slot {
    seq: u64,
    callback: Arc<DeliveryCallback>,
}

pub(crate) struct Registry {
    connections: DashMap<ConnectionId, Vec<Slot>>,
    next_seq: AtomicU64,
}

impl Registry {
    fn new() -> Self {
        Self {
            connections: DashMap::new(),
            next_seq: AtomicU64::new(0),
        }
    }

    pub(crate) fn remove(&self, connection_id: &ConnectionId, seq: u64) {
        if let Some(mut slots) = self.connections.get_mut(connection_id) {
            slots.retain(|slot| slot.seq != seq);
        }
        // Drop the id once its last callback is gone
        self.connections
            .remove_if(connection_id, |_, slots| slots.is_empty());
    }
}

/// Process-wide fan-out registry. Cheap to clone; all clones share one
/// registry.
#[derive(Clone)]
pub struct Broker {
    inner: Arc<Registry>,
}

impl Broker {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Registry::new()),
        }
    }

    /// Store `callback` under `connection_id` and return the guard that
    /// removes exactly that callback. Multiple callbacks may share an id;
    /// removing the last one deletes the id from the registry.
    pub fn register(&self, connection_id: ConnectionId, callback: DeliveryCallback) -> Unregister {
        let seq = self.inner.next_seq.fetch_add(1, Ordering::Relaxed);
        self.inner
            .connections
            .entry(connection_id.clone())
            .or_default()
            .push(Slot {
                seq,
                callback: Arc::new(callback),
            });
        info!("registered connection {connection_id}");
        Unregister::new(Arc::downgrade(&self.inner), connection_id, seq)
    }

    /// Stamp the event and deliver it to every registered callback in
    /// registration order. A failing callback is logged and skipped. With no
    /// registrations the event is dropped silently.
    pub fn broadcast(&self, mut event: Event) {
        event.timestamp = epoch_millis();

        let mut slots: Vec<(u64, ConnectionId, Arc<DeliveryCallback>)> = Vec::new();
        for entry in self.inner.connections.iter() {
            for slot in entry.value() {
                slots.push((slot.seq, entry.key().clone(), Arc::clone(&slot.callback)));
            }
        }

        if slots.is_empty() {
            trace!("no connections registered, dropping {} event", event.kind());
            return;
        }

        // Snapshot taken above: callbacks run without holding registry locks,
        // so a callback may itself register or unregister.
        slots.sort_by_key(|(seq, _, _)| *seq);

        debug!(
            "broadcasting {} event to {} callback(s)",
            event.kind(),
            slots.len()
        );

        for (_, connection_id, callback) in slots {
            if let Err(e) = callback(&event) {
                warn!(
                    "failed to deliver {} event to connection {}: {}",
                    event.kind(),
                    connection_id,
                    e
                );
            }
        }
    }

    pub fn connection_count(&self) -> usize {
        self.inner.connections.len()
    }

    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.inner
            .connections
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::DeliveryError;
    use events::EventPayload;
    use serde_json::json;
    use std::sync::Mutex;

    fn ticket_created() -> Event {
        Event::new(EventPayload::TicketCreated {
            ticket: json!({"id": "T-1"}),
        })
    }

    fn recording_callback() -> (DeliveryCallback, Arc<Mutex<Vec<Event>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: DeliveryCallback = Box::new(move |event| {
            sink.lock().unwrap().push(event.clone());
            Ok(())
        });
        (callback, seen)
    }

    #[test]
    fn broadcast_with_no_connections_is_a_quiet_no_op() {
        let broker = Broker::new();
        broker.broadcast(ticket_created());
        assert_eq!(broker.connection_count(), 0);
    }

    #[test]
    fn broadcast_overwrites_the_caller_supplied_timestamp() {
        let broker = Broker::new();
        let (callback, seen) = recording_callback();
        let _guard = broker.register(ConnectionId::from_raw("c-1"), callback);

        let mut event = ticket_created();
        event.timestamp = -42;
        broker.broadcast(event);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].timestamp > 0);
    }

    #[test]
    fn unregister_is_idempotent_and_removes_only_its_callback() {
        let broker = Broker::new();
        let id = ConnectionId::from_raw("c-1");
        let (first, first_seen) = recording_callback();
        let (second, second_seen) = recording_callback();
        let first_guard = broker.register(id.clone(), first);
        let _second_guard = broker.register(id.clone(), second);

        first_guard.call();
        first_guard.call();

        broker.broadcast(ticket_created());

        assert!(first_seen.lock().unwrap().is_empty());
        assert_eq!(second_seen.lock().unwrap().len(), 1);
        // The id stays in the registry while it still has a callback
        assert_eq!(broker.connection_count(), 1);
    }

    #[test]
    fn removing_the_last_callback_deletes_the_id() {
        let broker = Broker::new();
        let (callback, _) = recording_callback();
        let guard = broker.register(ConnectionId::from_raw("c-1"), callback);
        assert_eq!(broker.connection_ids(), vec![ConnectionId::from_raw("c-1")]);

        guard.call();
        assert_eq!(broker.connection_count(), 0);
        assert!(broker.connection_ids().is_empty());
    }

    #[test]
    fn dropping_the_guard_unregisters() {
        let broker = Broker::new();
        {
            let (callback, _) = recording_callback();
            let _guard = broker.register(ConnectionId::from_raw("c-1"), callback);
            assert_eq!(broker.connection_count(), 1);
        }
        assert_eq!(broker.connection_count(), 0);
    }

    #[test]
    fn a_failing_callback_does_not_abort_fan_out() {
        let broker = Broker::new();
        let failing: DeliveryCallback =
            Box::new(|_| Err(DeliveryError::new("connection channel closed")));
        let (recording, seen) = recording_callback();
        let _a = broker.register(ConnectionId::from_raw("c-1"), failing);
        let _b = broker.register(ConnectionId::from_raw("c-2"), recording);

        broker.broadcast(ticket_created());

        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn callbacks_run_in_registration_order() {
        let broker = Broker::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut guards = Vec::new();
        for label in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            let callback: DeliveryCallback = Box::new(move |_| {
                order.lock().unwrap().push(label);
                Ok(())
            });
            guards.push(broker.register(ConnectionId::from_raw(label), callback));
        }

        broker.broadcast(ticket_created());

        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }
}
