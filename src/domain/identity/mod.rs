//! Identity aggregate

pub mod model;
pub mod repository;

pub use model::{Identity, IdentityId};
pub use repository::IdentityRepository;
