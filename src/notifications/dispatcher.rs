//! Fire-and-forget delivery of alert events
//!
//! The dispatcher owns the only path from the event bus to a [`Notifier`].
//! Delivery outcomes are logged and counted; they never feed back into the
//! registry or the scheduler.

use std::sync::Arc;

use metrics::counter;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::event_bus::EventBus;
use crate::domain::{IdentityId, Notification, Notifier};
use crate::shared::shutdown::ShutdownSignal;

pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    /// Single-admin deployments send every alert here instead of to the
    /// endpoint's owner.
    admin_override: Option<IdentityId>,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, admin_override: Option<IdentityId>) -> Self {
        Self {
            notifier,
            admin_override,
        }
    }

    pub fn recipient_for(&self, notification: &Notification) -> IdentityId {
        self.admin_override.unwrap_or(notification.owner)
    }

    /// Subscribe to `bus` and deliver alerts until shutdown. The
    /// subscription is taken before this returns, so no event published
    /// afterwards is missed.
    pub fn start(self: Arc<Self>, bus: &EventBus, shutdown: ShutdownSignal) -> JoinHandle<()> {
        let mut subscriber = bus.subscribe();

        tokio::spawn(async move {
            info!(
                admin_override = ?self.admin_override,
                "🔔 Notification dispatcher started"
            );

            loop {
                let notified = shutdown.notified();
                tokio::select! {
                    message = subscriber.recv() => {
                        let Some(message) = message else { break };
                        if let Some(notification) = message.event.notification() {
                            let this = self.clone();
                            tokio::spawn(async move {
                                this.deliver(notification).await;
                            });
                        }
                    }
                    _ = notified.wait() => break,
                }
            }

            info!("🔔 Notification dispatcher stopped");
        })
    }

    /// Deliver one notification. Returns whether the notifier accepted it;
    /// failures are logged and dropped.
    pub async fn deliver(&self, notification: Notification) -> bool {
        let recipient = self.recipient_for(&notification);

        match self.notifier.notify(recipient, &notification).await {
            Ok(()) => {
                counter!("uptime_notifications_total", "result" => "delivered").increment(1);
                debug!(
                    recipient = %recipient,
                    endpoint_id = notification.endpoint_id,
                    url = %notification.url,
                    "Notification delivered"
                );
                true
            }
            Err(e) => {
                counter!("uptime_notifications_total", "result" => "failed").increment(1);
                warn!(
                    recipient = %recipient,
                    endpoint_id = notification.endpoint_id,
                    url = %notification.url,
                    error = %e,
                    "Notification delivery failed"
                );
                false
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;

    use super::testing::RecordingNotifier;
    use super::*;
    use crate::domain::{EndpointStatus, NotificationKind};
    use crate::notifications::events::{AlertEvent, Event, StatusChangedEvent};

    fn down(id: i32, owner: i64) -> Event {
        Event::EndpointDown(AlertEvent {
            endpoint_id: id,
            url: format!("https://site{}.example", id),
            owner: IdentityId(owner),
            timestamp: Utc::now(),
        })
    }

    async fn wait_for(notifier: &RecordingNotifier, count: usize) {
        for _ in 0..100 {
            if notifier.delivered().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {} deliveries, got {}", count, notifier.delivered().len());
    }

    #[tokio::test]
    async fn delivers_to_owner_by_default() {
        let notifier = Arc::new(RecordingNotifier::default());
        let dispatcher = Arc::new(NotificationDispatcher::new(notifier.clone(), None));
        let bus = EventBus::new();
        let shutdown = ShutdownSignal::new();
        let handle = dispatcher.start(&bus, shutdown.clone());

        bus.publish(down(1, 77));
        wait_for(&notifier, 1).await;

        let delivered = notifier.delivered();
        assert_eq!(delivered[0].0, IdentityId(77));
        assert_eq!(delivered[0].1.kind, NotificationKind::Outage);

        shutdown.trigger();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn admin_override_wins() {
        let notifier = Arc::new(RecordingNotifier::default());
        let dispatcher = NotificationDispatcher::new(notifier.clone(), Some(IdentityId(1)));

        let notification = down(1, 77).notification().unwrap();
        assert_eq!(dispatcher.recipient_for(&notification), IdentityId(1));
        assert!(dispatcher.deliver(notification).await);
        assert_eq!(notifier.delivered()[0].0, IdentityId(1));
    }

    #[tokio::test]
    async fn failures_are_swallowed_and_later_events_still_flow() {
        let notifier = Arc::new(RecordingNotifier::failing_first(1));
        let dispatcher = Arc::new(NotificationDispatcher::new(notifier.clone(), None));
        let bus = EventBus::new();
        let shutdown = ShutdownSignal::new();
        let handle = dispatcher.start(&bus, shutdown.clone());

        bus.publish(down(1, 10));
        tokio::time::sleep(Duration::from_millis(50)).await;
        bus.publish(down(2, 20));
        wait_for(&notifier, 1).await;

        let delivered = notifier.delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].1.endpoint_id, 2);

        shutdown.trigger();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn status_changes_alone_do_not_notify() {
        let notifier = Arc::new(RecordingNotifier::default());
        let dispatcher = Arc::new(NotificationDispatcher::new(notifier.clone(), None));
        let bus = EventBus::new();
        let shutdown = ShutdownSignal::new();
        let handle = dispatcher.start(&bus, shutdown.clone());

        bus.publish(Event::EndpointStatusChanged(StatusChangedEvent {
            endpoint_id: 1,
            url: "https://a.example".into(),
            owner: IdentityId(5),
            previous: EndpointStatus::Unknown,
            current: EndpointStatus::Online,
            timestamp: Utc::now(),
        }));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(notifier.delivered().is_empty());

        shutdown.trigger();
        handle.await.unwrap();
    }
}
