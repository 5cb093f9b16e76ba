use anyhow::{Error, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Calendar-date key (see `engine::calendar::date_key`) to completion flag.
pub type DateKeyMap = BTreeMap<String, bool>;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Today,
    Fullweek,
    Fullmonth,
    Weekdays,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Today,
        Category::Fullweek,
        Category::Fullmonth,
        Category::Weekdays,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Today => "today",
            Category::Fullweek => "fullweek",
            Category::Fullmonth => "fullmonth",
            Category::Weekdays => "weekdays",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Category::Today => "Today Tasks",
            Category::Fullweek => "Full Week Tasks",
            Category::Fullmonth => "Full Month Tasks",
            Category::Weekdays => "Weekdays Tasks",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Category::Today => "Tasks that expire at end of day",
            Category::Fullweek => "Tasks that run until end of current week",
            Category::Fullmonth => "Tasks that run until end of current month",
            Category::Weekdays => "Tasks that run Monday through Friday only",
        }
    }

    pub fn tips(self) -> &'static [&'static str] {
        match self {
            Category::Today => &[
                "Today tasks expire at the end of the day to maintain focus.",
                "Keep today tasks simple and achievable.",
                "Perfect for urgent or daily routine items.",
            ],
            Category::Fullweek => &[
                "Full week tasks run until Sunday of the current week.",
                "Great for weekly goals and objectives.",
                "Tasks created mid-week still expire on Sunday.",
                "Use daily tracking to complete the same task each day of the week.",
            ],
            Category::Fullmonth => &[
                "Full month tasks run until the end of the current month.",
                "Perfect for monthly projects and larger goals.",
                "Tasks created mid-month still expire at month end.",
                "Enable daily tracking to track daily progress throughout the month.",
            ],
            Category::Weekdays => &[
                "Weekdays tasks run Monday through Friday only.",
                "Perfect for work-related or business day tasks.",
                "Tasks created mid-week run until Friday.",
                "Use daily tracking for tasks you need to complete every workday.",
            ],
        }
    }
}

pub const HABIT_TIPS: &[&str] = &[
    "Start with small, easy habits to build consistency.",
    "Track habits daily to maintain accountability.",
    "Celebrate streaks to reinforce positive behaviors.",
];

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "today" | "daily" | "day" => Ok(Category::Today),
            "fullweek" | "weekly" | "week" => Ok(Category::Fullweek),
            "fullmonth" | "monthly" | "month" => Ok(Category::Fullmonth),
            "weekdays" | "weekday" | "workdays" => Ok(Category::Weekdays),
            other => bail!(
                "Unsupported category: {other}. Supported categories: today, fullweek, fullmonth, weekdays"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub text: String,
    #[serde(default, alias = "originalText")]
    pub original_text: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub time: Option<String>,
    #[serde(rename = "type", default)]
    pub category: Category,
    #[serde(default, deserialize_with = "null_as_default")]
    pub completed: bool,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "expiresAt")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        alias = "isDailyTracking",
        deserialize_with = "null_as_default"
    )]
    pub is_daily_tracking: bool,
    #[serde(
        default,
        alias = "dailyCompletions",
        deserialize_with = "null_as_default"
    )]
    pub daily_completions: DateKeyMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: i64,
    pub text: String,
    #[serde(default, alias = "originalText")]
    pub original_text: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub time: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub streak: u32,
    #[serde(default, alias = "lastCompleted")]
    pub last_completed: Option<DateTime<Utc>>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: i64,
    pub text: String,
    #[serde(rename = "time")]
    pub trigger_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub completed: bool,
    /// Set once when the reminder fires; never cleared.
    #[serde(default, deserialize_with = "null_as_default")]
    pub notified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub date: String,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTask {
    pub text: String,
    pub original_text: String,
    pub time: Option<String>,
    #[serde(rename = "type")]
    pub category: Category,
    pub completed: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_daily_tracking: bool,
    pub daily_completions: DateKeyMap,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewHabit {
    pub text: String,
    pub original_text: String,
    pub time: Option<String>,
    pub streak: u32,
    pub last_completed: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewReminder {
    pub text: String,
    #[serde(rename = "time")]
    pub trigger_at: DateTime<Utc>,
    pub completed: bool,
    pub notified: bool,
}

impl From<&Task> for NewTask {
    fn from(task: &Task) -> Self {
        Self {
            text: task.text.clone(),
            original_text: task.original_text.clone(),
            time: task.time.clone(),
            category: task.category,
            completed: task.completed,
            expires_at: task.expires_at,
            is_daily_tracking: task.is_daily_tracking,
            daily_completions: task.daily_completions.clone(),
        }
    }
}

impl From<&Habit> for NewHabit {
    fn from(habit: &Habit) -> Self {
        Self {
            text: habit.text.clone(),
            original_text: habit.original_text.clone(),
            time: habit.time.clone(),
            streak: habit.streak,
            last_completed: habit.last_completed,
        }
    }
}

impl From<&Reminder> for NewReminder {
    fn from(reminder: &Reminder) -> Self {
        Self {
            text: reminder.text.clone(),
            trigger_at: reminder.trigger_at,
            completed: reminder.completed,
            notified: reminder.notified,
        }
    }
}

/// Partial update for a task: exactly one completion representation is sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_completions: Option<DateKeyMap>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HabitPatch {
    pub streak: u32,
    pub last_completed: Option<DateTime<Utc>>,
}

/// In-memory mirror of every collection. Also the export/import document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppState {
    #[serde(alias = "daily")]
    pub today: Vec<Task>,
    #[serde(alias = "weekly")]
    pub fullweek: Vec<Task>,
    #[serde(alias = "monthly")]
    pub fullmonth: Vec<Task>,
    pub weekdays: Vec<Task>,
    pub habits: Vec<Habit>,
    pub reminders: Vec<Reminder>,
    pub completions: DateKeyMap,
}

impl AppState {
    pub fn from_records(
        tasks: Vec<Task>,
        habits: Vec<Habit>,
        reminders: Vec<Reminder>,
        completions: Vec<CompletionRecord>,
    ) -> Self {
        let mut state = Self {
            habits,
            reminders,
            completions: completions
                .into_iter()
                .map(|record| (record.date, record.completed))
                .collect(),
            ..Self::default()
        };

        tasks
            .into_iter()
            .for_each(|task| state.tasks_mut(task.category).push(task));

        state
    }

    pub fn tasks(&self, category: Category) -> &[Task] {
        match category {
            Category::Today => &self.today,
            Category::Fullweek => &self.fullweek,
            Category::Fullmonth => &self.fullmonth,
            Category::Weekdays => &self.weekdays,
        }
    }

    pub fn tasks_mut(&mut self, category: Category) -> &mut Vec<Task> {
        match category {
            Category::Today => &mut self.today,
            Category::Fullweek => &mut self.fullweek,
            Category::Fullmonth => &mut self.fullmonth,
            Category::Weekdays => &mut self.weekdays,
        }
    }

    pub fn all_tasks(&self) -> impl Iterator<Item = &Task> {
        Category::ALL
            .into_iter()
            .flat_map(move |category| self.tasks(category).iter())
    }

    pub fn find_task(&self, id: i64) -> Option<&Task> {
        self.all_tasks().find(|task| task.id == id)
    }

    pub fn find_task_mut(&mut self, id: i64) -> Option<&mut Task> {
        let category = self.find_task(id)?.category;
        self.tasks_mut(category).iter_mut().find(|task| task.id == id)
    }

    pub fn find_habit_mut(&mut self, id: i64) -> Option<&mut Habit> {
        self.habits.iter_mut().find(|habit| habit.id == id)
    }

    pub fn task_count(&self) -> usize {
        Category::ALL
            .into_iter()
            .map(|category| self.tasks(category).len())
            .sum()
    }

    /// Keeps `notified` monotonic across reloads: a reminder that already fired
    /// in an earlier session stays notified even if the backend row says otherwise.
    pub fn carry_notified_from(&mut self, previous: &AppState) {
        let notified = previous
            .reminders
            .iter()
            .filter(|reminder| reminder.notified)
            .map(|reminder| reminder.id)
            .collect::<HashSet<_>>();

        self.reminders
            .iter_mut()
            .filter(|reminder| notified.contains(&reminder.id))
            .for_each(|reminder| reminder.notified = true);
    }

    /// Imported documents may omit the task type; the list a task sits in wins.
    pub fn normalized(mut self) -> Self {
        Category::ALL.into_iter().for_each(|category| {
            self.tasks_mut(category)
                .iter_mut()
                .for_each(|task| task.category = category);
        });
        self
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)
        .map(|value| value.filter(|inner| !inner.trim().is_empty()))
}
