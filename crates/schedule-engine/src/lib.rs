//! Schedule engine for the home butler
//!
//! Stores reminders and deferred device actions, answers "what is due",
//! advances recurring tasks, and runs a polling driver that executes due
//! tasks against the device layer.

pub mod error;
pub mod evaluator;
pub mod executor;
pub mod model;
pub mod scheduler;
pub mod store;
pub mod time_parse;

pub use error::ScheduleError;
pub use executor::{ActionExecutor, TaskOutcome};
pub use model::*;
pub use scheduler::{Scheduler, SchedulerEvent};
pub use store::ScheduleStore;
pub use time_parse::parse_time_expression;
