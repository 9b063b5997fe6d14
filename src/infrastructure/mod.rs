//! Infrastructure layer: persistence, outbound HTTP and the chat adapter

pub mod database;
pub mod http;
pub mod log_notifier;
pub mod storage;
pub mod telegram;

pub use database::{init_database, DatabaseConfig, SeaOrmRepositoryProvider};
pub use http::{HttpProber, ProbeMethod};
pub use log_notifier::LogNotifier;
pub use storage::{
    InMemoryEndpointRepository, InMemoryIdentityRepository, InMemoryRepositoryProvider,
};
pub use telegram::{TelegramClient, TelegramError, TelegramNotifier, UpdatePoller};
