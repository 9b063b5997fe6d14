//! Long-polling loop feeding chat messages to the command handler

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::client::{TelegramClient, Update};
use crate::application::commands::CommandHandler;
use crate::domain::Identity;
use crate::shared::shutdown::ShutdownSignal;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

pub struct UpdatePoller {
    client: Arc<TelegramClient>,
    handler: Arc<CommandHandler>,
    poll_timeout: Duration,
    /// Next `update_id` to ask for
    offset: i64,
}

impl UpdatePoller {
    pub fn new(
        client: Arc<TelegramClient>,
        handler: Arc<CommandHandler>,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            client,
            handler,
            poll_timeout,
            offset: 0,
        }
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn start(mut self, shutdown: ShutdownSignal) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                poll_timeout_secs = self.poll_timeout.as_secs(),
                "💬 Telegram update poller started"
            );
            let mut backoff = INITIAL_BACKOFF;

            loop {
                let notified = shutdown.notified();
                tokio::select! {
                    result = self.poll_once() => match result {
                        Ok(_) => backoff = INITIAL_BACKOFF,
                        Err(e) => {
                            warn!(
                                error = %e,
                                retry_in_secs = backoff.as_secs(),
                                "getUpdates failed"
                            );
                            let notified = shutdown.notified();
                            tokio::select! {
                                _ = tokio::time::sleep(backoff) => {}
                                _ = notified.wait() => break,
                            }
                            backoff = (backoff * 2).min(MAX_BACKOFF);
                        }
                    },
                    _ = notified.wait() => break,
                }
            }

            info!("💬 Telegram update poller stopped");
        })
    }

    /// Fetch one batch, handle every update in order and advance the
    /// offset past it. Returns the batch size.
    pub async fn poll_once(&mut self) -> Result<usize, super::TelegramError> {
        let updates = self
            .client
            .get_updates(self.offset, self.poll_timeout)
            .await?;

        for update in &updates {
            self.offset = self.offset.max(update.update_id + 1);
            self.handle_update(update).await;
        }
        Ok(updates.len())
    }

    /// Run the command carried by `update` and send the reply. Returns the
    /// reply, or `None` for updates that are not text messages.
    pub async fn handle_update(&self, update: &Update) -> Option<String> {
        let message = update.message.as_ref()?;
        let text = message.text.as_deref()?;
        let from = message.from.as_ref()?;

        let mut identity = Identity::new(from.id, from.display_name());
        if let Some(username) = &from.username {
            identity = identity.with_username(username.as_str());
        }

        debug!(update_id = update.update_id, chat_id = message.chat.id, "Handling message");
        let reply = self.handler.handle(&identity, text).await;

        if let Err(e) = self.client.send_message(message.chat.id, &reply).await {
            warn!(chat_id = message.chat.id, error = %e, "Failed to send reply");
        }
        Some(reply)
    }
}
