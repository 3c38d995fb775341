//! Executes the payload of a due task

use home_state::DeviceController;

use crate::model::{ScheduledTask, TaskPayload};

/// What running a task produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// A reminder to surface to the user
    Reminder { message: String },
    /// A device action ran; `result` is the controller's confirmation
    Action { result: String },
}

/// Executor for scheduled task payloads
#[derive(Clone)]
pub struct ActionExecutor {
    controller: DeviceController,
}

impl ActionExecutor {
    pub fn new(controller: DeviceController) -> Self {
        Self { controller }
    }

    /// Run a task's payload. Device actions are best-effort: failures are
    /// reported in the result text, never raised.
    pub async fn execute(&self, task: &ScheduledTask) -> TaskOutcome {
        match &task.payload {
            TaskPayload::Reminder { message } => {
                tracing::info!(target: "reminder", "[{}] {}", task.id, message);
                TaskOutcome::Reminder {
                    message: message.clone(),
                }
            }
            TaskPayload::DeviceControl { action } => {
                let result = self
                    .controller
                    .execute(
                        &action.device_type,
                        &action.room,
                        &action.action,
                        &action.parameters,
                    )
                    .await;
                tracing::info!("Scheduled task {} ({}): {}", task.id, task.description, result);
                TaskOutcome::Action { result }
            }
        }
    }
}
