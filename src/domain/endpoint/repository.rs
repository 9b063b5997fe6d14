//! Endpoint registry interface

use async_trait::async_trait;

use super::model::{Endpoint, EndpointId, EndpointStatus};
use crate::domain::identity::IdentityId;
use crate::domain::DomainResult;

/// Persistent registry of monitored endpoints.
///
/// Every mutation is atomic with respect to concurrent readers. `url`
/// arguments are validated (see [`crate::shared::validate_url`]) before
/// anything is written.
#[async_trait]
pub trait EndpointRepository: Send + Sync {
    /// Register `url` for `owner` with status `unknown`.
    ///
    /// Fails with `Validation` for a malformed URL and `Duplicate` if the
    /// owner already watches it.
    async fn add(&self, owner: IdentityId, url: &str) -> DomainResult<Endpoint>;

    /// Returns true if a row was deleted.
    async fn remove(&self, owner: IdentityId, url: &str) -> DomainResult<bool>;

    /// Point an existing endpoint at a new URL and reset its status to
    /// `unknown`. Returns false if `old_url` is not registered for `owner`.
    async fn rename(&self, owner: IdentityId, old_url: &str, new_url: &str)
        -> DomainResult<bool>;

    async fn list_for(&self, owner: IdentityId) -> DomainResult<Vec<Endpoint>>;

    /// Snapshot of every endpoint, taken in a single read.
    async fn list_all(&self) -> DomainResult<Vec<Endpoint>>;

    /// Single-row read-modify-write. Returns the status the row held
    /// before the write.
    async fn set_status(&self, id: EndpointId, status: EndpointStatus)
        -> DomainResult<EndpointStatus>;

    /// [`set_status`](Self::set_status) guarded by the row's URL. Returns
    /// `None` without writing if the row has been renamed away from `url`.
    async fn set_status_if_url(
        &self,
        id: EndpointId,
        url: &str,
        status: EndpointStatus,
    ) -> DomainResult<Option<EndpointStatus>>;
}
