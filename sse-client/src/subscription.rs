use events::{Event, EventKind};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// What a subscriber wants to hear about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    /// Every event, regardless of type.
    All,
    /// Only events of one type.
    Kind(EventKind),
}

pub(crate) type SubscriberFn = Arc<dyn Fn(&Event) + Send + Sync>;

#[derive(Default)]
struct Slots {
    wildcard: Vec<(u64, SubscriberFn)>,
    by_kind: HashMap<EventKind, Vec<(u64, SubscriberFn)>>,
}

pub(crate) struct SubscriberRegistry {
    slots: Mutex<Slots>,
    next_token: AtomicU64,
}

impl SubscriberRegistry {
    pub(crate) fn new() -> Self {
        Self {
            slots: Mutex::new(Slots::default()),
            next_token: AtomicU64::new(0),
        }
    }

    pub(crate) fn add(&self, topic: Topic, callback: SubscriberFn) -> u64 {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        match topic {
            Topic::All => slots.wildcard.push((token, callback)),
            Topic::Kind(kind) => slots.by_kind.entry(kind).or_default().push((token, callback)),
        }
        token
    }

    pub(crate) fn remove(&self, topic: Topic, token: u64) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        match topic {
            Topic::All => slots.wildcard.retain(|(t, _)| *t != token),
            Topic::Kind(kind) => {
                if let Some(list) = slots.by_kind.get_mut(&kind) {
                    list.retain(|(t, _)| *t != token);
                    if list.is_empty() {
                        slots.by_kind.remove(&kind);
                    }
                }
            }
        }
    }

    /// Wildcard subscribers first, then the type-specific ones. Callbacks run
    /// outside the lock so a subscriber may subscribe or unsubscribe.
    pub(crate) fn dispatch(&self, event: &Event) {
        let (wildcard, typed) = {
            let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            let wildcard: Vec<SubscriberFn> =
                slots.wildcard.iter().map(|(_, cb)| Arc::clone(cb)).collect();
            let typed: Vec<SubscriberFn> = slots
                .by_kind
                .get(&event.kind())
                .map(|list| list.iter().map(|(_, cb)| Arc::clone(cb)).collect())
                .unwrap_or_default();
            (wildcard, typed)
        };
        for callback in wildcard.iter().chain(typed.iter()) {
            callback(event);
        }
    }
}

/// Handle for one registered callback. Unsubscribing twice is a no-op, and
/// dropping the handle unsubscribes, so keep it alive for as long as the
/// callback should fire.
pub struct Subscription {
    registry: Weak<SubscriberRegistry>,
    topic: Topic,
    token: u64,
    active: AtomicBool,
}

impl Subscription {
    pub(crate) fn new(registry: Weak<SubscriberRegistry>, topic: Topic, token: u64) -> Self {
        Self {
            registry,
            topic,
            token,
            active: AtomicBool::new(true),
        }
    }

    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.topic, self.token);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use events::EventPayload;
    use serde_json::json;

    fn ticket_created() -> Event {
        Event::new(EventPayload::TicketCreated {
            ticket: json!({"id": "T-1"}),
        })
    }

    fn subscription(registry: &Arc<SubscriberRegistry>, topic: Topic, log: Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> Subscription {
        let token = registry.add(
            topic,
            Arc::new(move |_| log.lock().unwrap().push(tag)),
        );
        Subscription::new(Arc::downgrade(registry), topic, token)
    }

    #[test]
    fn wildcard_subscribers_run_before_typed_ones() {
        let registry = Arc::new(SubscriberRegistry::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let _typed = subscription(
            &registry,
            Topic::Kind(EventKind::TicketCreated),
            Arc::clone(&log),
            "typed",
        );
        let _wildcard = subscription(&registry, Topic::All, Arc::clone(&log), "wildcard");
        let _other = subscription(
            &registry,
            Topic::Kind(EventKind::CommentCreated),
            Arc::clone(&log),
            "other",
        );

        registry.dispatch(&ticket_created());

        assert_eq!(*log.lock().unwrap(), vec!["wildcard", "typed"]);
    }

    #[test]
    fn unsubscribe_stops_delivery_and_is_idempotent() {
        let registry = Arc::new(SubscriberRegistry::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let sub = subscription(&registry, Topic::All, Arc::clone(&log), "wildcard");

        registry.dispatch(&ticket_created());
        sub.unsubscribe();
        sub.unsubscribe();
        registry.dispatch(&ticket_created());

        assert_eq!(*log.lock().unwrap(), vec!["wildcard"]);
    }

    #[test]
    fn dropping_the_handle_unsubscribes() {
        let registry = Arc::new(SubscriberRegistry::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let sub = subscription(
            &registry,
            Topic::Kind(EventKind::TicketCreated),
            Arc::clone(&log),
            "typed",
        );
        drop(sub);

        registry.dispatch(&ticket_created());

        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn unsubscribe_after_the_registry_is_gone_is_a_no_op() {
        let registry = Arc::new(SubscriberRegistry::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let sub = subscription(&registry, Topic::All, Arc::clone(&log), "wildcard");
        drop(registry);

        sub.unsubscribe();
    }
}
