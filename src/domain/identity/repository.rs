//! Identity repository interface

use async_trait::async_trait;

use super::model::{Identity, IdentityId};
use crate::domain::DomainResult;

#[async_trait]
pub trait IdentityRepository: Send + Sync {
    /// Insert the identity or refresh its username and display name.
    async fn upsert(&self, identity: Identity) -> DomainResult<()>;
    async fn find(&self, id: IdentityId) -> DomainResult<Option<Identity>>;
}
