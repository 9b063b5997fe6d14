//! Application layer: chat commands and the monitoring engine

pub mod commands;
pub mod monitoring;

pub use commands::{Command, CommandHandler};
pub use monitoring::{
    NotifyPolicy, PollScheduler, SchedulerConfig, SchedulerState, TickReport, TransitionEngine,
};
