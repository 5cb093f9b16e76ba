use crate::backend::Backend;
use crate::engine::expiry::is_expired;
use crate::model::{
    CompletionRecord, Habit, HabitPatch, NewHabit, NewReminder, NewTask, Reminder, Task, TaskPatch,
};
use anyhow::{Result, bail};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

/// In-memory backend with switchable failure for store tests.
#[derive(Debug, Default)]
pub struct FakeBackend {
    pub tasks: Mutex<Vec<Task>>,
    pub habits: Mutex<Vec<Habit>>,
    pub reminders: Mutex<Vec<Reminder>>,
    pub completions: Mutex<Vec<CompletionRecord>>,
    pub calls: Mutex<Vec<String>>,
    failing: AtomicBool,
    failing_call: Mutex<Option<String>>,
    next_id: AtomicI64,
}

impl FakeBackend {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Fails only the call recorded exactly as `call`, e.g. `"delete_task 4"`.
    pub fn fail_call(&self, call: &str) {
        *self.failing_call.lock().expect("failing call lock") = Some(call.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn record(&self, call: impl Into<String>) -> Result<()> {
        let call = call.into();
        self.calls.lock().expect("calls lock").push(call.clone());

        let targeted = self
            .failing_call
            .lock()
            .expect("failing call lock")
            .as_deref()
            == Some(call.as_str());
        if targeted || self.failing.load(Ordering::SeqCst) {
            bail!("injected backend failure: {call}");
        }

        Ok(())
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 100
    }

    fn created_at() -> Option<DateTime<Utc>> {
        Utc.with_ymd_and_hms(2026, 10, 17, 6, 0, 0).single()
    }
}

impl Backend for FakeBackend {
    async fn list_tasks(&self) -> Result<Vec<Task>> {
        self.record("list_tasks")?;
        Ok(self.tasks.lock().expect("tasks lock").clone())
    }

    async fn create_task(&self, task: &NewTask) -> Result<Task> {
        self.record("create_task")?;
        let created = Task {
            id: self.next_id(),
            text: task.text.clone(),
            original_text: task.original_text.clone(),
            time: task.time.clone(),
            category: task.category,
            completed: task.completed,
            created_at: Self::created_at(),
            expires_at: task.expires_at,
            is_daily_tracking: task.is_daily_tracking,
            daily_completions: task.daily_completions.clone(),
        };
        self.tasks.lock().expect("tasks lock").push(created.clone());
        Ok(created)
    }

    async fn update_task(&self, id: i64, patch: &TaskPatch) -> Result<()> {
        self.record(format!("update_task {id}"))?;
        let mut tasks = self.tasks.lock().expect("tasks lock");
        if let Some(task) = tasks.iter_mut().find(|task| task.id == id) {
            if let Some(completed) = patch.completed {
                task.completed = completed;
            }
            if let Some(daily) = &patch.daily_completions {
                task.daily_completions = daily.clone();
            }
        }
        Ok(())
    }

    async fn delete_task(&self, id: i64) -> Result<()> {
        self.record(format!("delete_task {id}"))?;
        self.tasks
            .lock()
            .expect("tasks lock")
            .retain(|task| task.id != id);
        Ok(())
    }

    async fn delete_tasks_expired_before(&self, now: DateTime<Utc>) -> Result<()> {
        self.record("delete_tasks_expired_before")?;
        self.tasks
            .lock()
            .expect("tasks lock")
            .retain(|task| !is_expired(task.expires_at, now));
        Ok(())
    }

    async fn list_habits(&self) -> Result<Vec<Habit>> {
        self.record("list_habits")?;
        Ok(self.habits.lock().expect("habits lock").clone())
    }

    async fn create_habit(&self, habit: &NewHabit) -> Result<Habit> {
        self.record("create_habit")?;
        let created = Habit {
            id: self.next_id(),
            text: habit.text.clone(),
            original_text: habit.original_text.clone(),
            time: habit.time.clone(),
            streak: habit.streak,
            last_completed: habit.last_completed,
            created_at: Self::created_at(),
        };
        self.habits.lock().expect("habits lock").push(created.clone());
        Ok(created)
    }

    async fn update_habit(&self, id: i64, patch: &HabitPatch) -> Result<()> {
        self.record(format!("update_habit {id}"))?;
        let mut habits = self.habits.lock().expect("habits lock");
        if let Some(habit) = habits.iter_mut().find(|habit| habit.id == id) {
            habit.streak = patch.streak;
            habit.last_completed = patch.last_completed;
        }
        Ok(())
    }

    async fn delete_habit(&self, id: i64) -> Result<()> {
        self.record(format!("delete_habit {id}"))?;
        self.habits
            .lock()
            .expect("habits lock")
            .retain(|habit| habit.id != id);
        Ok(())
    }

    async fn list_reminders(&self) -> Result<Vec<Reminder>> {
        self.record("list_reminders")?;
        let mut active = self
            .reminders
            .lock()
            .expect("reminders lock")
            .iter()
            .filter(|reminder| !reminder.completed)
            .cloned()
            .collect::<Vec<_>>();
        active.sort_by_key(|reminder| reminder.trigger_at);
        Ok(active)
    }

    async fn create_reminder(&self, reminder: &NewReminder) -> Result<Reminder> {
        self.record("create_reminder")?;
        let created = Reminder {
            id: self.next_id(),
            text: reminder.text.clone(),
            trigger_at: reminder.trigger_at,
            completed: reminder.completed,
            notified: reminder.notified,
        };
        self.reminders
            .lock()
            .expect("reminders lock")
            .push(created.clone());
        Ok(created)
    }

    async fn delete_reminder(&self, id: i64) -> Result<()> {
        self.record(format!("delete_reminder {id}"))?;
        self.reminders
            .lock()
            .expect("reminders lock")
            .retain(|reminder| reminder.id != id);
        Ok(())
    }

    async fn list_completions(&self) -> Result<Vec<CompletionRecord>> {
        self.record("list_completions")?;
        Ok(self.completions.lock().expect("completions lock").clone())
    }

    async fn upsert_completion(&self, record: &CompletionRecord) -> Result<()> {
        self.record(format!("upsert_completion {}", record.date))?;
        let mut completions = self.completions.lock().expect("completions lock");
        completions.retain(|existing| existing.date != record.date);
        completions.push(record.clone());
        Ok(())
    }

    async fn delete_completion(&self, date: &str) -> Result<()> {
        self.record(format!("delete_completion {date}"))?;
        self.completions
            .lock()
            .expect("completions lock")
            .retain(|existing| existing.date != date);
        Ok(())
    }
}
