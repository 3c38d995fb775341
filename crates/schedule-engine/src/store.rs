//! In-memory schedule registry

use chrono::{Local, NaiveDateTime};
use dashmap::{DashMap, DashSet};

use crate::evaluator;
use crate::model::{NewTask, ScheduledTask, TaskPayload, TaskStatus};

/// Registry of scheduled tasks keyed by id.
///
/// Each mutating call holds the entry's shard lock for its whole
/// read-modify-write, so concurrent callers cannot tear a transition.
#[derive(Default)]
pub struct ScheduleStore {
    tasks: DashMap<String, ScheduledTask>,
    /// Every id ever handed out, including deleted ones
    issued: DashSet<String>,
}

impl ScheduleStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a short id that has never been issued before
    fn allocate_id(&self) -> String {
        loop {
            let id = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();
            if self.issued.insert(id.clone()) {
                return id;
            }
        }
    }

    /// Register a new pending task
    pub fn create_task(&self, request: NewTask) -> ScheduledTask {
        let task = ScheduledTask {
            id: self.allocate_id(),
            trigger_time: request.trigger_time,
            repeat: request.repeat,
            description: request.description,
            payload: request.payload,
            status: TaskStatus::Pending,
            created_at: Local::now().naive_local(),
        };
        self.tasks.insert(task.id.clone(), task.clone());
        tracing::info!(
            "Scheduled {:?} task {} at {} ({})",
            task.task_type(),
            task.id,
            task.trigger_time,
            task.repeat
        );
        task
    }

    /// Get a task by id
    #[must_use]
    pub fn get_task(&self, id: &str) -> Option<ScheduledTask> {
        self.tasks.get(id).map(|r| r.value().clone())
    }

    /// Every task regardless of status
    #[must_use]
    pub fn all_tasks(&self) -> Vec<ScheduledTask> {
        self.tasks.iter().map(|r| r.value().clone()).collect()
    }

    /// Pending tasks whose trigger time is at or before `now` (unordered)
    #[must_use]
    pub fn get_due_tasks(&self, now: NaiveDateTime) -> Vec<ScheduledTask> {
        self.tasks
            .iter()
            .filter(|r| evaluator::is_due(r.value(), now))
            .map(|r| r.value().clone())
            .collect()
    }

    /// All pending tasks (unordered)
    #[must_use]
    pub fn get_pending_tasks(&self) -> Vec<ScheduledTask> {
        self.tasks
            .iter()
            .filter(|r| r.value().is_pending())
            .map(|r| r.value().clone())
            .collect()
    }

    /// Mark a fired task done (advance if recurring). False when the id is
    /// unknown or the task is no longer pending.
    pub fn complete_task(&self, id: &str) -> bool {
        let Some(mut task) = self.tasks.get_mut(id) else {
            return false;
        };
        let done = evaluator::complete(&mut task);
        if done {
            tracing::debug!(
                "Task {} completed (status {:?}, next trigger {})",
                id,
                task.status,
                task.trigger_time
            );
        }
        done
    }

    /// Cancel a pending task; the record is kept
    pub fn cancel_task(&self, id: &str) -> bool {
        let Some(mut task) = self.tasks.get_mut(id) else {
            return false;
        };
        let cancelled = evaluator::cancel(&mut task);
        if cancelled {
            tracing::info!("Cancelled task {}", id);
        }
        cancelled
    }

    /// Remove a task outright
    pub fn delete_task(&self, id: &str) -> bool {
        let removed = self.tasks.remove(id).is_some();
        if removed {
            tracing::info!("Deleted task {}", id);
        }
        removed
    }

    /// Pending tasks sorted by trigger time
    #[must_use]
    pub fn pending_sorted(&self) -> Vec<ScheduledTask> {
        let mut tasks = self.get_pending_tasks();
        evaluator::sort_by_trigger(&mut tasks);
        tasks
    }

    /// Render pending tasks as text for the reasoning layer
    #[must_use]
    pub fn render_context(&self) -> String {
        let pending = self.pending_sorted();
        if pending.is_empty() {
            return "[Scheduled Tasks]\nNo scheduled tasks.".to_string();
        }

        let mut lines = vec!["[Scheduled Tasks]".to_string()];
        for task in pending {
            let time = task.trigger_time.format("%Y-%m-%d %H:%M");
            let repeat = match task.repeat.period() {
                Some(_) => format!(" ({})", task.repeat),
                None => String::new(),
            };
            let summary = match &task.payload {
                TaskPayload::Reminder { message } => format!("Reminder - {message}"),
                TaskPayload::DeviceControl { .. } => task.description.clone(),
            };
            lines.push(format!("- [{}] {}{}: {}", task.id, time, repeat, summary));
        }
        lines.join("\n")
    }
}
