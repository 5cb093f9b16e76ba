use crate::backend::Backend;
use crate::cache::SnapshotCache;
use crate::engine::calendar::{display_text, parse_hhmm};
use crate::engine::daily::{pending_completion_record, task_completed_on, toggle_task_on};
use crate::engine::expiry::{expires_at, is_expired};
use crate::engine::streak::{self, HabitProgress};
use crate::error::{StoreError, StoreResult};
use crate::model::{
    AppState, Category, CompletionRecord, DateKeyMap, Habit, HabitPatch, NewHabit, NewReminder,
    NewTask, Reminder, Task,
};
use crate::view::{self, Dashboard, Stats};
use anyhow::Context;
use chrono::{DateTime, Local, NaiveTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

pub type Clock = Arc<dyn Fn() -> DateTime<Local> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Backend,
    Cache,
    Empty,
}

/// Owns the in-memory mirror and applies every user intent to it and to the
/// backend.
///
/// Adds and deletes touch local state only after the backend confirms.
/// Toggles are applied first and rolled back if the backend call fails.
pub struct AppStore<B> {
    backend: B,
    cache: Option<SnapshotCache>,
    state: AppState,
    clock: Clock,
}

impl<B: Backend> AppStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            cache: None,
            state: AppState::default(),
            clock: Arc::new(Local::now),
        }
    }

    pub fn with_cache(mut self, cache: SnapshotCache) -> Self {
        self.cache = Some(cache);
        self
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn now(&self) -> DateTime<Local> {
        (self.clock)()
    }

    pub async fn load_all(&mut self) -> LoadSource {
        let backend = &self.backend;
        let loaded = tokio::try_join!(
            backend.list_tasks(),
            backend.list_habits(),
            backend.list_reminders(),
            backend.list_completions(),
        );
        let cached = self.cached_state();

        match loaded {
            Ok((tasks, habits, reminders, completions)) => {
                let mut state = AppState::from_records(tasks, habits, reminders, completions);
                if let Some(previous) = &cached {
                    state.carry_notified_from(previous);
                }

                info!(
                    tasks = state.task_count(),
                    habits = state.habits.len(),
                    reminders = state.reminders.len(),
                    "state loaded from backend"
                );
                self.state = state;
                self.persist_snapshot();
                LoadSource::Backend
            }
            Err(error) => {
                warn!(error = %error, "failed to load from backend. falling back to cached snapshot");

                match cached {
                    Some(state) => {
                        self.state = state;
                        LoadSource::Cache
                    }
                    None => {
                        self.state = AppState::default();
                        LoadSource::Empty
                    }
                }
            }
        }
    }

    pub async fn remove_expired_tasks(&mut self) -> StoreResult<usize> {
        let now = self.now().with_timezone(&Utc);
        self.backend.delete_tasks_expired_before(now).await?;

        let before = self.state.task_count();
        Category::ALL.into_iter().for_each(|category| {
            self.state
                .tasks_mut(category)
                .retain(|task| !is_expired(task.expires_at, now));
        });
        let removed = before - self.state.task_count();

        if removed > 0 {
            info!(removed, "expired tasks removed");
            self.persist_snapshot();
        }

        Ok(removed)
    }

    pub async fn add_task(
        &mut self,
        category: Category,
        text: &str,
        time: Option<&str>,
        daily_tracking: bool,
    ) -> StoreResult<Task> {
        let text = required_text(text, "task")?;
        let time = parse_optional_time(time)?;
        let expiry = expires_at(category, &self.now()).map_err(StoreError::Time)?;

        let new_task = NewTask {
            text: display_text(&text, time),
            original_text: text,
            time: time.map(format_hhmm),
            category,
            completed: false,
            expires_at: Some(expiry),
            is_daily_tracking: daily_tracking,
            daily_completions: DateKeyMap::new(),
        };

        let mut task = self.backend.create_task(&new_task).await?;
        task.category = category;
        self.state.tasks_mut(category).push(task.clone());

        info!(id = task.id, category = %category, "task added");
        self.persist_snapshot();
        Ok(task)
    }

    /// Returns whether the task counts as completed today after the toggle.
    pub async fn toggle_task(&mut self, id: i64) -> StoreResult<bool> {
        let today = self.now().date_naive();
        let task = self
            .state
            .find_task_mut(id)
            .ok_or(StoreError::NotFound { kind: "task", id })?;

        let previous = task.clone();
        let patch = toggle_task_on(task, today);
        let completed = task_completed_on(task, today);

        if let Err(error) = self.backend.update_task(id, &patch).await {
            if let Some(task) = self.state.find_task_mut(id) {
                *task = previous;
            }
            warn!(id, error = %error, "task toggle reverted");
            return Err(error.into());
        }

        info!(id, completed, "task toggled");
        self.persist_snapshot();
        Ok(completed)
    }

    pub async fn delete_task(&mut self, id: i64) -> StoreResult<Task> {
        let category = self
            .state
            .find_task(id)
            .map(|task| task.category)
            .ok_or(StoreError::NotFound { kind: "task", id })?;

        self.backend.delete_task(id).await?;

        let tasks = self.state.tasks_mut(category);
        let position = tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or(StoreError::NotFound { kind: "task", id })?;
        let removed = tasks.remove(position);

        info!(id, "task deleted");
        self.persist_snapshot();
        Ok(removed)
    }

    /// Deletes every completed task that is not tracked per day. Stops at the
    /// first backend failure; tasks deleted before it stay deleted.
    pub async fn clear_completed(&mut self) -> StoreResult<usize> {
        let targets = self
            .state
            .all_tasks()
            .filter(|task| !task.is_daily_tracking && task.completed)
            .map(|task| (task.category, task.id))
            .collect::<Vec<_>>();

        let mut cleared = 0;
        let mut outcome = Ok(());

        for (category, id) in targets {
            if let Err(error) = self.backend.delete_task(id).await {
                outcome = Err(StoreError::from(error));
                break;
            }
            self.state
                .tasks_mut(category)
                .retain(|task| task.id != id);
            cleared += 1;
        }

        if cleared > 0 {
            info!(cleared, "completed tasks cleared");
            self.persist_snapshot();
        }

        outcome.map(|_| cleared)
    }

    pub async fn add_habit(&mut self, text: &str, time: Option<&str>) -> StoreResult<Habit> {
        let text = required_text(text, "habit")?;
        let time = parse_optional_time(time)?;

        let new_habit = NewHabit {
            text: display_text(&text, time),
            original_text: text,
            time: time.map(format_hhmm),
            streak: 0,
            last_completed: None,
        };

        let habit = self.backend.create_habit(&new_habit).await?;
        self.state.habits.push(habit.clone());

        info!(id = habit.id, "habit added");
        self.persist_snapshot();
        Ok(habit)
    }

    pub async fn toggle_habit(&mut self, id: i64) -> StoreResult<Habit> {
        let now = self.now();
        let habit = self
            .state
            .find_habit_mut(id)
            .ok_or(StoreError::NotFound { kind: "habit", id })?;

        let previous = HabitProgress::from(&*habit);
        let next = streak::toggle_habit(previous, &now);
        next.apply_to(habit);
        let updated = habit.clone();

        if let Err(error) = self.backend.update_habit(id, &HabitPatch::from(next)).await {
            if let Some(habit) = self.state.find_habit_mut(id) {
                previous.apply_to(habit);
            }
            warn!(id, error = %error, "habit toggle reverted");
            return Err(error.into());
        }

        info!(id, streak = updated.streak, "habit toggled");
        self.persist_snapshot();
        Ok(updated)
    }

    pub async fn delete_habit(&mut self, id: i64) -> StoreResult<Habit> {
        let position = self
            .state
            .habits
            .iter()
            .position(|habit| habit.id == id)
            .ok_or(StoreError::NotFound { kind: "habit", id })?;

        self.backend.delete_habit(id).await?;
        let removed = self.state.habits.remove(position);

        info!(id, "habit deleted");
        self.persist_snapshot();
        Ok(removed)
    }

    pub async fn add_reminder(
        &mut self,
        text: &str,
        trigger_at: DateTime<Utc>,
    ) -> StoreResult<Reminder> {
        let text = required_text(text, "reminder")?;

        let new_reminder = NewReminder {
            text,
            trigger_at,
            completed: false,
            notified: false,
        };

        let reminder = self.backend.create_reminder(&new_reminder).await?;
        self.state.reminders.push(reminder.clone());

        info!(id = reminder.id, trigger_at = %reminder.trigger_at, "reminder added");
        self.persist_snapshot();
        Ok(reminder)
    }

    pub async fn delete_reminder(&mut self, id: i64) -> StoreResult<Reminder> {
        let position = self
            .state
            .reminders
            .iter()
            .position(|reminder| reminder.id == id)
            .ok_or(StoreError::NotFound {
                kind: "reminder",
                id,
            })?;

        self.backend.delete_reminder(id).await?;
        let removed = self.state.reminders.remove(position);

        info!(id, "reminder deleted");
        self.persist_snapshot();
        Ok(removed)
    }

    /// Upserts today's completion record when the aggregate changed, then
    /// returns fresh statistics. A failed upsert restores the previous record
    /// so the next refresh retries it.
    pub async fn sync_daily_completion(&mut self) -> StoreResult<Stats> {
        let today = self.now().date_naive();

        if let Some(record) = pending_completion_record(&self.state, today) {
            let previous = self
                .state
                .completions
                .insert(record.date.clone(), record.completed);

            if let Err(error) = self.backend.upsert_completion(&record).await {
                match previous {
                    Some(value) => {
                        self.state.completions.insert(record.date.clone(), value);
                    }
                    None => {
                        self.state.completions.remove(&record.date);
                    }
                }
                warn!(date = %record.date, error = %error, "daily completion upsert reverted");
                return Err(error.into());
            }

            info!(date = %record.date, completed = record.completed, "daily completion recorded");
            self.persist_snapshot();
        }

        Ok(self.stats())
    }

    pub fn stats(&self) -> Stats {
        view::stats(&self.state, self.now().date_naive())
    }

    pub fn dashboard(&self) -> Dashboard {
        view::build_dashboard(&self.state, &self.now())
    }

    /// Marks reminders whose trigger time has passed as notified and returns
    /// them. Each reminder is returned at most once.
    pub fn take_due_reminders(&mut self) -> Vec<Reminder> {
        let now = self.now().with_timezone(&Utc);

        let due = self
            .state
            .reminders
            .iter_mut()
            .filter(|reminder| reminder.trigger_at <= now && !reminder.completed && !reminder.notified)
            .map(|reminder| {
                reminder.notified = true;
                reminder.clone()
            })
            .collect::<Vec<_>>();

        if !due.is_empty() {
            self.persist_snapshot();
        }

        due
    }

    pub fn export_document(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(&self.state).context("Failed to serialize export document")
    }

    pub fn export_file_name(&self) -> String {
        format!("productivity-data-{}.json", self.now().format("%Y-%m-%d"))
    }

    pub fn parse_document(content: &str) -> StoreResult<AppState> {
        Ok(serde_json::from_str::<AppState>(content)?.normalized())
    }

    /// Replaces everything stored in the backend with an imported document.
    /// Callers confirm with the user first.
    ///
    /// Imported records are created before the previous ones are deleted, so
    /// a failure part way never loses data. Stops at the first backend
    /// failure; records written before it stay written and are mirrored
    /// locally. The backend assigns fresh ids to every imported record.
    pub async fn import_state(&mut self, imported: AppState) -> StoreResult<()> {
        let imported = imported.normalized();
        let outcome = self.write_imported(&imported).await;
        self.persist_snapshot();

        match &outcome {
            Ok(()) => info!(
                tasks = imported.task_count(),
                habits = imported.habits.len(),
                reminders = imported.reminders.len(),
                completions = imported.completions.len(),
                "state replaced from import"
            ),
            Err(error) => warn!(error = %error, "import stopped part way"),
        }

        outcome
    }

    async fn write_imported(&mut self, imported: &AppState) -> StoreResult<()> {
        let stale_tasks = self
            .state
            .all_tasks()
            .map(|task| (task.category, task.id))
            .collect::<Vec<_>>();
        let stale_habits = self.state.habits.iter().map(|habit| habit.id).collect::<Vec<_>>();
        let stale_reminders = self
            .state
            .reminders
            .iter()
            .map(|reminder| reminder.id)
            .collect::<Vec<_>>();
        let stale_dates = self
            .state
            .completions
            .keys()
            .filter(|date| !imported.completions.contains_key(*date))
            .cloned()
            .collect::<Vec<_>>();

        for task in imported.all_tasks() {
            let mut created = self.backend.create_task(&NewTask::from(task)).await?;
            created.category = task.category;
            self.state.tasks_mut(task.category).push(created);
        }
        for habit in &imported.habits {
            let created = self.backend.create_habit(&NewHabit::from(habit)).await?;
            self.state.habits.push(created);
        }
        for reminder in &imported.reminders {
            let created = self
                .backend
                .create_reminder(&NewReminder::from(reminder))
                .await?;
            self.state.reminders.push(created);
        }
        for (date, completed) in &imported.completions {
            let record = CompletionRecord {
                date: date.clone(),
                completed: *completed,
            };
            self.backend.upsert_completion(&record).await?;
            self.state.completions.insert(record.date, record.completed);
        }

        for (category, id) in stale_tasks {
            self.backend.delete_task(id).await?;
            self.state.tasks_mut(category).retain(|task| task.id != id);
        }
        for id in stale_habits {
            self.backend.delete_habit(id).await?;
            self.state.habits.retain(|habit| habit.id != id);
        }
        for id in stale_reminders {
            self.backend.delete_reminder(id).await?;
            self.state.reminders.retain(|reminder| reminder.id != id);
        }
        for date in stale_dates {
            self.backend.delete_completion(&date).await?;
            self.state.completions.remove(&date);
        }

        Ok(())
    }

    fn cached_state(&self) -> Option<AppState> {
        let cache = self.cache.as_ref()?;

        cache
            .load()
            .map_err(|error| {
                warn!(error = %error, "failed to read snapshot cache");
                error
            })
            .ok()
            .flatten()
            .map(|snapshot| snapshot.state)
    }

    fn persist_snapshot(&self) {
        if let Some(cache) = &self.cache {
            if let Err(error) = cache.save(&self.state) {
                warn!(error = %error, "failed to write snapshot cache");
            }
        }
    }
}

fn required_text(text: &str, kind: &str) -> StoreResult<String> {
    let trimmed = text.trim();

    if trimmed.is_empty() {
        return Err(StoreError::InvalidInput(format!("{kind} text is empty")));
    }

    Ok(trimmed.to_string())
}

fn parse_optional_time(time: Option<&str>) -> StoreResult<Option<NaiveTime>> {
    time.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| parse_hhmm(value).map_err(|error| StoreError::InvalidInput(format!("{error:#}"))))
        .transpose()
}

fn format_hhmm(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}
