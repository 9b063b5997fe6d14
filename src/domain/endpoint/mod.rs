//! Endpoint aggregate
//!
//! Contains the Endpoint entity, its status enum, and the registry interface.

pub mod model;
pub mod repository;

pub use model::{Endpoint, EndpointId, EndpointStatus};
pub use repository::EndpointRepository;
