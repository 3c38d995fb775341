//! Data models for scheduled tasks

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::ScheduleError;

/// Kind of scheduled task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    DeviceControl,
    Reminder,
}

/// Recurrence of a task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Repeat {
    #[default]
    Once,
    Daily,
    Weekly,
}

impl Repeat {
    /// Interval a recurring task advances by after firing
    #[must_use]
    pub fn period(&self) -> Option<Duration> {
        match self {
            Self::Once => None,
            Self::Daily => Some(Duration::days(1)),
            Self::Weekly => Some(Duration::weeks(1)),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Once => "once",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
        }
    }
}

impl fmt::Display for Repeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Repeat {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "once" => Ok(Self::Once),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            _ => Err(ScheduleError::InvalidRepeat(s.to_string())),
        }
    }
}

/// Lifecycle state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Completed,
    Cancelled,
}

/// Device action carried by a device-control task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceAction {
    /// light, ac or speaker
    pub device_type: String,
    pub room: String,
    /// Verb understood by the device controller (turn_on, dim, set_temp, ...)
    pub action: String,
    /// Extra parameters (brightness, temperature, mode, song, volume)
    #[serde(flatten)]
    pub parameters: Map<String, Value>,
}

/// Type-specific task payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task_type", rename_all = "snake_case")]
pub enum TaskPayload {
    DeviceControl { action: DeviceAction },
    Reminder { message: String },
}

/// A scheduled reminder or deferred device action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTask {
    /// Short unique id, never reused
    pub id: String,
    /// Local wall-clock time at which the task becomes due
    pub trigger_time: NaiveDateTime,
    pub repeat: Repeat,
    pub description: String,
    #[serde(flatten)]
    pub payload: TaskPayload,
    pub status: TaskStatus,
    pub created_at: NaiveDateTime,
}

impl ScheduledTask {
    #[must_use]
    pub fn task_type(&self) -> TaskType {
        match self.payload {
            TaskPayload::DeviceControl { .. } => TaskType::DeviceControl,
            TaskPayload::Reminder { .. } => TaskType::Reminder,
        }
    }

    /// Device action, empty for reminders
    #[must_use]
    pub fn action(&self) -> Option<&DeviceAction> {
        match &self.payload {
            TaskPayload::DeviceControl { action } => Some(action),
            TaskPayload::Reminder { .. } => None,
        }
    }

    /// Reminder text, empty for device-control tasks
    #[must_use]
    pub fn message(&self) -> &str {
        match &self.payload {
            TaskPayload::Reminder { message } => message,
            TaskPayload::DeviceControl { .. } => "",
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == TaskStatus::Pending
    }
}

/// Request to create a new task
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub trigger_time: NaiveDateTime,
    pub repeat: Repeat,
    pub description: String,
    pub payload: TaskPayload,
}

impl NewTask {
    /// A reminder; the description defaults to `Reminder: {message}`.
    /// A blank message is rejected.
    pub fn reminder(
        message: impl Into<String>,
        trigger_time: NaiveDateTime,
        repeat: Repeat,
    ) -> Result<Self, ScheduleError> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(ScheduleError::InvalidTask(
                "reminder task requires a message".into(),
            ));
        }
        Ok(Self {
            trigger_time,
            repeat,
            description: format!("Reminder: {message}"),
            payload: TaskPayload::Reminder { message },
        })
    }

    /// A deferred device action
    pub fn device_control(
        description: impl Into<String>,
        trigger_time: NaiveDateTime,
        repeat: Repeat,
        action: DeviceAction,
    ) -> Self {
        Self {
            trigger_time,
            repeat,
            description: description.into(),
            payload: TaskPayload::DeviceControl { action },
        }
    }
}
