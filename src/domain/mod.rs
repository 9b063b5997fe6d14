pub mod endpoint;
pub mod identity;
pub mod ports;
pub mod repositories;

pub use endpoint::{Endpoint, EndpointId, EndpointRepository, EndpointStatus};
pub use identity::{Identity, IdentityId, IdentityRepository};
pub use ports::{HealthProber, Notification, NotificationKind, Notifier, NotifyError, ProbeOutcome};
pub use repositories::{DomainResult, RepositoryProvider};

pub use crate::shared::errors::DomainError;
