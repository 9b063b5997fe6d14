//! Ports to the outside world: probing endpoints and delivering
//! notifications.

pub mod notifier;
pub mod prober;

pub use notifier::{Notification, NotificationKind, Notifier, NotifyError};
pub use prober::{HealthProber, ProbeOutcome};
