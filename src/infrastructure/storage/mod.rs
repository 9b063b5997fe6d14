pub mod memory;

pub use memory::{
    InMemoryEndpointRepository, InMemoryIdentityRepository, InMemoryRepositoryProvider,
};
