//! Telegram delivery for alerts

use std::sync::Arc;

use async_trait::async_trait;

use super::client::{TelegramClient, TelegramError};
use crate::domain::{IdentityId, Notification, Notifier, NotifyError};

/// Sends each notification as a chat message to the recipient's id.
pub struct TelegramNotifier {
    client: Arc<TelegramClient>,
}

impl TelegramNotifier {
    pub fn new(client: Arc<TelegramClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(
        &self,
        recipient: IdentityId,
        notification: &Notification,
    ) -> Result<(), NotifyError> {
        self.client
            .send_message(recipient.0, &notification.message())
            .await
            .map_err(|e| match e {
                TelegramError::Api { description, .. } => NotifyError::Rejected {
                    recipient,
                    reason: description,
                },
                TelegramError::Http(e) => NotifyError::Delivery(e.to_string()),
            })
    }
}
