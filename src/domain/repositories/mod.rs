//! Repository traits for the domain layer

use super::endpoint::EndpointRepository;
use super::identity::IdentityRepository;
use crate::shared::errors::DomainError;

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Provides access to all domain repositories.
///
/// ```ignore
/// async fn handle(repos: &dyn RepositoryProvider) {
///     let mine = repos.endpoints().list_for(owner).await?;
/// }
/// ```
pub trait RepositoryProvider: Send + Sync {
    fn endpoints(&self) -> &dyn EndpointRepository;
    fn identities(&self) -> &dyn IdentityRepository;
}
