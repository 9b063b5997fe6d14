//! Telegram Bot API adapter

pub mod client;
pub mod notifier;
pub mod poller;

pub use client::{TelegramClient, TelegramError, DEFAULT_API_BASE_URL};
pub use notifier::TelegramNotifier;
pub use poller::UpdatePoller;
