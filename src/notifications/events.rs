//! Monitoring events
//!
//! Everything the transition engine and the scheduler announce on the
//! event bus.

use chrono::{DateTime, Utc};

use crate::domain::{EndpointId, EndpointStatus, IdentityId, Notification, NotificationKind};

#[derive(Debug, Clone)]
pub enum Event {
    /// Any persisted status change, including silent ones
    EndpointStatusChanged(StatusChangedEvent),
    /// Endpoint went offline; always notifies
    EndpointDown(AlertEvent),
    /// Endpoint came back from offline; published only when recovery
    /// notifications are enabled
    EndpointRecovered(AlertEvent),
    /// A non-empty tick finished
    TickCompleted(TickCompletedEvent),
}

impl Event {
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::EndpointStatusChanged(_) => "endpoint_status_changed",
            Event::EndpointDown(_) => "endpoint_down",
            Event::EndpointRecovered(_) => "endpoint_recovered",
            Event::TickCompleted(_) => "tick_completed",
        }
    }

    pub fn endpoint_id(&self) -> Option<EndpointId> {
        match self {
            Event::EndpointStatusChanged(e) => Some(e.endpoint_id),
            Event::EndpointDown(e) | Event::EndpointRecovered(e) => Some(e.endpoint_id),
            Event::TickCompleted(_) => None,
        }
    }

    /// The notification this event asks for, if any
    pub fn notification(&self) -> Option<Notification> {
        let (kind, alert) = match self {
            Event::EndpointDown(e) => (NotificationKind::Outage, e),
            Event::EndpointRecovered(e) => (NotificationKind::Recovery, e),
            _ => return None,
        };
        Some(Notification {
            kind,
            endpoint_id: alert.endpoint_id,
            url: alert.url.clone(),
            owner: alert.owner,
            timestamp: alert.timestamp,
        })
    }
}

#[derive(Debug, Clone)]
pub struct StatusChangedEvent {
    pub endpoint_id: EndpointId,
    pub url: String,
    pub owner: IdentityId,
    pub previous: EndpointStatus,
    pub current: EndpointStatus,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AlertEvent {
    pub endpoint_id: EndpointId,
    pub url: String,
    pub owner: IdentityId,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TickCompletedEvent {
    pub tick: u64,
    pub probed: usize,
    pub reachable: usize,
    pub unreachable: usize,
    pub transitions: usize,
    pub notifications: usize,
    pub failures: usize,
    pub duration_ms: u64,
}

/// Envelope carried on the bus. `id` tags the event in logs.
#[derive(Debug, Clone)]
pub struct EventMessage {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub event: Event,
}

impl EventMessage {
    pub fn new(event: Event) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event,
        }
    }
}
