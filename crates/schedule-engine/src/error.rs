//! Error types for the schedule engine

use thiserror::Error;

/// Errors that can occur when building tasks
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ScheduleError {
    /// Unknown repeat name
    #[error("Invalid repeat: {0}")]
    InvalidRepeat(String),

    /// Task is missing its type-specific fields
    #[error("Invalid task: {0}")]
    InvalidTask(String),
}
