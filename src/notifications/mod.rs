//! Notifications module
//!
//! The transition engine publishes [`Event`]s on the [`EventBus`]; the
//! [`NotificationDispatcher`] turns alert events into [`crate::domain::Notifier`]
//! calls.
//!
//! ```ignore
//! let bus = create_event_bus();
//! let dispatcher = Arc::new(NotificationDispatcher::new(notifier, None));
//! dispatcher.start(&bus, shutdown.clone());
//! ```

pub mod dispatcher;
pub mod event_bus;
pub mod events;

pub use dispatcher::NotificationDispatcher;
pub use event_bus::{create_event_bus, EventBus, EventSubscriber, SharedEventBus};
pub use events::*;
