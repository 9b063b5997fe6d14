//! SeaORM repository implementations

pub mod endpoint_repository;
pub mod identity_repository;
pub mod repository_provider;

pub use endpoint_repository::SeaOrmEndpointRepository;
pub use identity_repository::SeaOrmIdentityRepository;
pub use repository_provider::SeaOrmRepositoryProvider;
