//! Chat command interface
//!
//! Thin glue between a messenger and the endpoint registry.

pub mod command;
pub mod handler;

pub use command::Command;
pub use handler::CommandHandler;
