//! Event bus for broadcasting monitoring events to subscribers
//!
//! Uses a tokio broadcast channel. Publishing never blocks the caller, so
//! the polling path cannot be held up by a slow consumer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::events::{Event, EventMessage};

const DEFAULT_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventMessage>,
    subscriber_count: Arc<AtomicUsize>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            subscriber_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Publish an event. Returns how many subscribers received it.
    pub fn publish(&self, event: Event) -> usize {
        let event_type = event.event_type();
        let endpoint_id = event.endpoint_id();
        let message = EventMessage::new(event);
        let event_id = message.id.clone();

        match self.sender.send(message) {
            Ok(count) => {
                debug!(%event_id, event_type, endpoint_id, subscribers = count, "Event published");
                count
            }
            Err(_) => {
                debug!(%event_id, event_type, endpoint_id, "Event published (no subscribers)");
                0
            }
        }
    }

    pub fn subscribe(&self) -> EventSubscriber {
        let receiver = self.sender.subscribe();
        let total = self.subscriber_count.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(total, "New event subscriber");

        EventSubscriber {
            receiver,
            subscriber_count: self.subscriber_count.clone(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriber_count.load(Ordering::SeqCst)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

pub struct EventSubscriber {
    receiver: broadcast::Receiver<EventMessage>,
    subscriber_count: Arc<AtomicUsize>,
}

impl EventSubscriber {
    /// Receive the next event. Returns `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<EventMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(msg) => return Some(msg),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "Event subscriber lagged, events dropped");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking receive, for draining in tests and shutdown paths
    pub fn try_recv(&mut self) -> Option<EventMessage> {
        loop {
            match self.receiver.try_recv() {
                Ok(msg) => return Some(msg),
                Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                    warn!(missed, "Event subscriber lagged, events dropped");
                    continue;
                }
                Err(_) => return None,
            }
        }
    }
}

impl Drop for EventSubscriber {
    fn drop(&mut self) {
        self.subscriber_count.fetch_sub(1, Ordering::SeqCst);
    }
}

pub type SharedEventBus = Arc<EventBus>;

pub fn create_event_bus() -> SharedEventBus {
    Arc::new(EventBus::new())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::notifications::events::TickCompletedEvent;

    fn tick_event() -> Event {
        Event::TickCompleted(TickCompletedEvent {
            tick: 1,
            probed: 2,
            reachable: 1,
            unreachable: 1,
            transitions: 1,
            notifications: 1,
            failures: 0,
            duration_ms: 12,
        })
    }

    #[tokio::test]
    async fn publish_reaches_subscriber() {
        let bus = EventBus::new();
        let mut subscriber = bus.subscribe();

        assert_eq!(bus.publish(tick_event()), 1);

        let received = tokio::time::timeout(Duration::from_millis(100), subscriber.recv())
            .await
            .expect("Timeout")
            .expect("No message");
        assert_eq!(received.event.event_type(), "tick_completed");
    }

    #[test]
    fn each_message_gets_its_own_id() {
        let bus = EventBus::new();
        let mut subscriber = bus.subscribe();
        bus.publish(tick_event());
        bus.publish(tick_event());

        let first = subscriber.try_recv().unwrap();
        let second = subscriber.try_recv().unwrap();
        assert_ne!(first.id, second.id);
        assert!(second.timestamp >= first.timestamp);
    }

    #[test]
    fn publish_without_subscribers_is_fine() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(tick_event()), 0);
    }

    #[test]
    fn subscriber_count_tracks_drops() {
        let bus = EventBus::new();
        let first = bus.subscribe();
        let _second = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        drop(first);
        assert_eq!(bus.subscriber_count(), 1);
    }
}
