//! Outbound notification port

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::endpoint::EndpointId;
use crate::domain::identity::IdentityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// Endpoint became unreachable
    Outage,
    /// Endpoint came back after an outage
    Recovery,
}

/// A transition worth telling a human about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub endpoint_id: EndpointId,
    pub url: String,
    pub owner: IdentityId,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    /// Chat-ready message text
    pub fn message(&self) -> String {
        match self.kind {
            NotificationKind::Outage => format!("⚠️ Site {} is unavailable!", self.url),
            NotificationKind::Recovery => format!("✅ Site {} is back online.", self.url),
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Recipient {recipient} rejected the message: {reason}")]
    Rejected { recipient: IdentityId, reason: String },
}

/// Delivers a notification to a chat identity.
///
/// Callers treat delivery as fire-and-forget: an `Err` is logged and
/// dropped, never retried.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        recipient: IdentityId,
        notification: &Notification,
    ) -> Result<(), NotifyError>;
}
