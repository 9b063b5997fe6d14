//! Database entities module

pub mod endpoint;
pub mod identity;

pub use endpoint::Entity as Endpoint;
pub use identity::Entity as Identity;
