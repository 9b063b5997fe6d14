//! # Uptime Watch
//!
//! Periodically probes registered websites and tells their owners over
//! Telegram when one goes down.
//!
//! ## Architecture
//!
//! - **domain**: endpoints, identities and the ports the engine talks to
//! - **application**: chat commands, the poll scheduler and the status
//!   transition engine
//! - **infrastructure**: SeaORM/SQLite and in-memory registries, the HTTP
//!   prober and the Telegram adapter
//! - **notifications**: event bus and the alert dispatcher
//! - **server**: process bootstrap and graceful shutdown

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod notifications;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig, ConfigError};

// Re-export database types for easy access
pub use infrastructure::{init_database, DatabaseConfig, SeaOrmRepositoryProvider};

pub use notifications::{create_event_bus, Event, EventBus, SharedEventBus};
