//! Fallback notifier used when no bot token is configured

use async_trait::async_trait;
use tracing::info;

use crate::domain::{IdentityId, Notification, Notifier, NotifyError};

/// Writes notifications to the log instead of a chat.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(
        &self,
        recipient: IdentityId,
        notification: &Notification,
    ) -> Result<(), NotifyError> {
        info!(
            recipient = %recipient,
            endpoint_id = notification.endpoint_id,
            url = %notification.url,
            kind = ?notification.kind,
            "{}",
            notification.message()
        );
        Ok(())
    }
}
