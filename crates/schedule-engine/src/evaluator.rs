//! Task state transitions and due-time queries
//!
//! Pure functions over [`ScheduledTask`]; the store applies them under its
//! per-entry lock.

use chrono::NaiveDateTime;

use crate::model::{ScheduledTask, TaskStatus};

/// A task is due when it is pending and its trigger time has passed
#[must_use]
pub fn is_due(task: &ScheduledTask, now: NaiveDateTime) -> bool {
    task.is_pending() && task.trigger_time <= now
}

/// Mark a fired task done.
///
/// One-shot tasks become completed; recurring tasks stay pending with the
/// trigger advanced by exactly one period. Returns false for tasks that are
/// not pending.
pub fn complete(task: &mut ScheduledTask) -> bool {
    if !task.is_pending() {
        return false;
    }
    match task.repeat.period() {
        Some(period) => task.trigger_time += period,
        None => task.status = TaskStatus::Completed,
    }
    true
}

/// Cancel a pending task. Completed and cancelled tasks are terminal.
pub fn cancel(task: &mut ScheduledTask) -> bool {
    if !task.is_pending() {
        return false;
    }
    task.status = TaskStatus::Cancelled;
    true
}

/// Presentation order: trigger time, then id for stable ties
pub fn sort_by_trigger(tasks: &mut [ScheduledTask]) {
    tasks.sort_by(|a, b| {
        a.trigger_time
            .cmp(&b.trigger_time)
            .then_with(|| a.id.cmp(&b.id))
    });
}
