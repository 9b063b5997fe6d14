//! Polling-and-state-transition engine

pub mod scheduler;
pub mod transition;

pub use scheduler::{PollScheduler, SchedulerConfig, SchedulerState, TickReport};
pub use transition::{decide, transition, Applied, Decision, NotifyPolicy, TransitionEngine};
