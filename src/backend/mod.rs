pub mod queries;
pub mod rest;

#[cfg(test)]
pub mod fake;

use crate::model::{
    CompletionRecord, Habit, HabitPatch, NewHabit, NewReminder, NewTask, Reminder, Task, TaskPatch,
};
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Remote datastore holding the four collections.
///
/// Creates return the stored record including the server-assigned id and
/// creation timestamp.
#[allow(async_fn_in_trait)]
pub trait Backend {
    async fn list_tasks(&self) -> Result<Vec<Task>>;
    async fn create_task(&self, task: &NewTask) -> Result<Task>;
    async fn update_task(&self, id: i64, patch: &TaskPatch) -> Result<()>;
    async fn delete_task(&self, id: i64) -> Result<()>;
    async fn delete_tasks_expired_before(&self, now: DateTime<Utc>) -> Result<()>;

    async fn list_habits(&self) -> Result<Vec<Habit>>;
    async fn create_habit(&self, habit: &NewHabit) -> Result<Habit>;
    async fn update_habit(&self, id: i64, patch: &HabitPatch) -> Result<()>;
    async fn delete_habit(&self, id: i64) -> Result<()>;

    /// Only reminders that are not completed, earliest trigger first.
    async fn list_reminders(&self) -> Result<Vec<Reminder>>;
    async fn create_reminder(&self, reminder: &NewReminder) -> Result<Reminder>;
    async fn delete_reminder(&self, id: i64) -> Result<()>;

    async fn list_completions(&self) -> Result<Vec<CompletionRecord>>;
    /// Insert, or overwrite the record that has the same date key.
    async fn upsert_completion(&self, record: &CompletionRecord) -> Result<()>;
    async fn delete_completion(&self, date: &str) -> Result<()>;
}
