//! Polling driver for due tasks

use crate::executor::{ActionExecutor, TaskOutcome};
use crate::store::ScheduleStore;
use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Events emitted when due tasks run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchedulerEvent {
    /// A reminder fired
    ReminderDue { task_id: String, message: String },
    /// A scheduled device action ran
    ActionExecuted {
        task_id: String,
        description: String,
        result: String,
    },
}

/// Periodically executes due tasks and advances or retires them
pub struct Scheduler {
    store: Arc<ScheduleStore>,
    executor: ActionExecutor,
    poll_interval: Duration,
    event_tx: broadcast::Sender<SchedulerEvent>,
}

impl Scheduler {
    /// Create a new scheduler
    pub fn new(store: Arc<ScheduleStore>, executor: ActionExecutor, poll_interval: Duration) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            store,
            executor,
            poll_interval,
            event_tx,
        }
    }

    /// Subscribe to scheduler events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.event_tx.subscribe()
    }

    /// Execute every task due at `now`, then complete it.
    ///
    /// A task is completed even when its action failed, so it cannot
    /// re-fire on every poll.
    pub async fn run_due(&self, now: NaiveDateTime) -> Vec<SchedulerEvent> {
        let due = self.store.get_due_tasks(now);
        let mut events = Vec::with_capacity(due.len());

        for task in due {
            let event = match self.executor.execute(&task).await {
                TaskOutcome::Reminder { message } => SchedulerEvent::ReminderDue {
                    task_id: task.id.clone(),
                    message,
                },
                TaskOutcome::Action { result } => SchedulerEvent::ActionExecuted {
                    task_id: task.id.clone(),
                    description: task.description.clone(),
                    result,
                },
            };

            if !self.store.complete_task(&task.id) {
                tracing::debug!("Task {} was cancelled or removed while running", task.id);
            }

            let _ = self.event_tx.send(event.clone());
            events.push(event);
        }

        events
    }

    /// Start the polling loop
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        tracing::info!(
            "Starting scheduler (polling every {:?})",
            scheduler.poll_interval
        );

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(scheduler.poll_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                let events = scheduler.run_due(Local::now().naive_local()).await;
                if !events.is_empty() {
                    tracing::debug!("Scheduler ran {} due tasks", events.len());
                }
            }
        })
    }
}
