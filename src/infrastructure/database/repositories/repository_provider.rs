//! SeaORM implementation of RepositoryProvider

use sea_orm::DatabaseConnection;

use crate::domain::endpoint::EndpointRepository;
use crate::domain::identity::IdentityRepository;
use crate::domain::repositories::RepositoryProvider;

use super::endpoint_repository::SeaOrmEndpointRepository;
use super::identity_repository::SeaOrmIdentityRepository;

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository accessors.
pub struct SeaOrmRepositoryProvider {
    endpoints: SeaOrmEndpointRepository,
    identities: SeaOrmIdentityRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            endpoints: SeaOrmEndpointRepository::new(db.clone()),
            identities: SeaOrmIdentityRepository::new(db),
        }
    }
}

impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn endpoints(&self) -> &dyn EndpointRepository {
        &self.endpoints
    }

    fn identities(&self) -> &dyn IdentityRepository {
        &self.identities
    }
}
