use crate::engine::calendar::date_key;
use crate::engine::daily::{daily_aggregate, days_completed, due_tasks, task_completed_on};
use crate::engine::streak::{habit_completed_on, overall_streak};
use crate::model::{AppState, Category, HABIT_TIPS, Task};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskView {
    pub id: i64,
    pub text: String,
    pub category: Category,
    pub time: Option<String>,
    pub completed_today: bool,
    pub daily_tracking: bool,
    pub days_completed: usize,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HabitView {
    pub id: i64,
    pub text: String,
    pub time: Option<String>,
    pub streak: u32,
    pub completed_today: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReminderView {
    pub id: i64,
    pub text: String,
    pub trigger_at: DateTime<Utc>,
    pub local_time: String,
    pub notified: bool,
    pub overdue: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub completed_today: usize,
    pub total_today: usize,
    pub overall_streak: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewRow {
    pub key: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub tips: &'static [&'static str],
    pub completed: usize,
    pub pending: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub date: String,
    pub stats: Stats,
    pub due_today: Vec<TaskView>,
    pub habits: Vec<HabitView>,
    pub reminders: Vec<ReminderView>,
    pub categories: Vec<OverviewRow>,
}

pub fn task_view(task: &Task, date: NaiveDate) -> TaskView {
    TaskView {
        id: task.id,
        text: task.text.clone(),
        category: task.category,
        time: task.time.clone(),
        completed_today: task_completed_on(task, date),
        daily_tracking: task.is_daily_tracking,
        days_completed: days_completed(task),
        expires_at: task.expires_at,
    }
}

pub fn category_list(state: &AppState, category: Category, date: NaiveDate) -> Vec<TaskView> {
    state
        .tasks(category)
        .iter()
        .map(|task| task_view(task, date))
        .collect()
}

pub fn habit_list<Tz: TimeZone>(state: &AppState, now: &DateTime<Tz>) -> Vec<HabitView> {
    state
        .habits
        .iter()
        .map(|habit| HabitView {
            id: habit.id,
            text: habit.text.clone(),
            time: habit.time.clone(),
            streak: habit.streak,
            completed_today: habit_completed_on(habit.last_completed, now),
        })
        .collect()
}

/// Reminders not yet completed, earliest trigger first.
pub fn active_reminders<Tz: TimeZone>(state: &AppState, now: &DateTime<Tz>) -> Vec<ReminderView> {
    let tz = now.timezone();
    let instant = now.with_timezone(&Utc);

    let mut reminders = state
        .reminders
        .iter()
        .filter(|reminder| !reminder.completed)
        .map(|reminder| ReminderView {
            id: reminder.id,
            text: reminder.text.clone(),
            trigger_at: reminder.trigger_at,
            local_time: reminder
                .trigger_at
                .with_timezone(&tz)
                .naive_local()
                .format("%Y-%m-%d %H:%M")
                .to_string(),
            notified: reminder.notified,
            overdue: reminder.trigger_at <= instant,
        })
        .collect::<Vec<_>>();

    reminders.sort_by(|left, right| {
        left.trigger_at
            .cmp(&right.trigger_at)
            .then_with(|| left.id.cmp(&right.id))
    });
    reminders
}

pub fn stats(state: &AppState, date: NaiveDate) -> Stats {
    let aggregate = daily_aggregate(state, date);

    Stats {
        completed_today: aggregate.completed,
        total_today: aggregate.total,
        overall_streak: overall_streak(&state.completions, date),
    }
}

/// One row per category plus a trailing habits row.
pub fn category_overview<Tz: TimeZone>(state: &AppState, now: &DateTime<Tz>) -> Vec<OverviewRow> {
    let date = now.date_naive();

    let task_rows = Category::ALL.into_iter().map(|category| {
        let tasks = state.tasks(category);
        let completed = tasks
            .iter()
            .filter(|task| task_completed_on(task, date))
            .count();

        OverviewRow {
            key: category.as_str(),
            title: category.title(),
            description: category.description(),
            tips: category.tips(),
            completed,
            pending: tasks.len() - completed,
        }
    });

    let habits_completed = state
        .habits
        .iter()
        .filter(|habit| habit_completed_on(habit.last_completed, now))
        .count();
    let habit_row = OverviewRow {
        key: "habits",
        title: "Habit Tracker",
        description: "Build consistent daily habits",
        tips: HABIT_TIPS,
        completed: habits_completed,
        pending: state.habits.len() - habits_completed,
    };

    task_rows.chain(std::iter::once(habit_row)).collect()
}

pub fn build_dashboard<Tz: TimeZone>(state: &AppState, now: &DateTime<Tz>) -> Dashboard {
    let date = now.date_naive();

    Dashboard {
        date: date_key(date),
        stats: stats(state, date),
        due_today: due_tasks(state, date)
            .map(|task| task_view(task, date))
            .collect(),
        habits: habit_list(state, now),
        reminders: active_reminders(state, now),
        categories: category_overview(state, now),
    }
}

pub fn render_text(dashboard: &Dashboard) -> String {
    let category_rows = dashboard
        .categories
        .iter()
        .map(|row| format!("| {} | {} | {} |", row.title, row.completed, row.pending))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "# DayTracker - {}\n\n## Summary\n- Completed today: {}/{}\n- Overall streak: {} day(s)\n\n## Due Today\n{}\n\n## Habits\n{}\n\n## Reminders\n{}\n\n## Categories\n| Category | Completed | Pending |\n|----------|-----------|---------|\n{}\n",
        dashboard.date,
        dashboard.stats.completed_today,
        dashboard.stats.total_today,
        dashboard.stats.overall_streak,
        render_tasks(&dashboard.due_today),
        render_habits(&dashboard.habits),
        render_reminders(&dashboard.reminders),
        category_rows
    )
}

pub fn render_tasks(tasks: &[TaskView]) -> String {
    if tasks.is_empty() {
        return "- No tasks".to_string();
    }

    tasks
        .iter()
        .map(|task| {
            let tracking = if task.daily_tracking {
                format!(", {} days completed", task.days_completed)
            } else {
                String::new()
            };

            format!(
                "{} #{} {} ({}{})",
                checkbox(task.completed_today),
                task.id,
                task.text,
                task.category,
                tracking
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_habits(habits: &[HabitView]) -> String {
    if habits.is_empty() {
        return "- No habits".to_string();
    }

    habits
        .iter()
        .map(|habit| {
            format!(
                "{} #{} {} - streak {}",
                checkbox(habit.completed_today),
                habit.id,
                habit.text,
                habit.streak
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_reminders(reminders: &[ReminderView]) -> String {
    if reminders.is_empty() {
        return "- No reminders".to_string();
    }

    reminders
        .iter()
        .map(|reminder| {
            let marker = if reminder.overdue { " (due)" } else { "" };
            format!(
                "- #{} {} at {}{}",
                reminder.id, reminder.text, reminder.local_time, marker
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn checkbox(done: bool) -> &'static str {
    if done { "[x]" } else { "[ ]" }
}

#[cfg(test)]
mod tests {
    use super::{active_reminders, build_dashboard, category_overview, render_text};
    use crate::engine::calendar::date_key;
    use crate::model::{AppState, Category, HABIT_TIPS, Habit, Reminder, Task};
    use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};

    fn saturday_evening() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(9 * 3600)
            .expect("offset")
            .with_ymd_and_hms(2026, 10, 17, 21, 0, 0)
            .single()
            .expect("instant")
    }

    fn task(id: i64, category: Category, completed: bool) -> Task {
        Task {
            id,
            text: format!("task {id}"),
            original_text: format!("task {id}"),
            time: None,
            category,
            completed,
            created_at: None,
            expires_at: None,
            is_daily_tracking: false,
            daily_completions: Default::default(),
        }
    }

    fn reminder(id: i64, trigger_at: DateTime<Utc>, completed: bool) -> Reminder {
        Reminder {
            id,
            text: format!("reminder {id}"),
            trigger_at,
            completed,
            notified: false,
        }
    }

    fn sample_state(now: &DateTime<FixedOffset>) -> AppState {
        let mut tracked = Task {
            is_daily_tracking: true,
            ..task(3, Category::Fullmonth, false)
        };
        tracked
            .daily_completions
            .insert(date_key(now.date_naive()), true);
        tracked
            .daily_completions
            .insert(date_key(now.date_naive() - Duration::days(2)), true);

        AppState {
            today: vec![task(1, Category::Today, true), task(2, Category::Today, false)],
            fullmonth: vec![tracked],
            weekdays: vec![task(4, Category::Weekdays, true)],
            habits: vec![Habit {
                id: 9,
                text: "Read - 9:00 PM".to_string(),
                original_text: "Read".to_string(),
                time: Some("21:00".to_string()),
                streak: 5,
                last_completed: Some(now.with_timezone(&Utc) - Duration::hours(1)),
                created_at: None,
            }],
            ..AppState::default()
        }
    }

    #[test]
    fn dashboard_lists_due_tasks_for_the_day() {
        let now = saturday_evening();
        let dashboard = build_dashboard(&sample_state(&now), &now);

        assert_eq!(dashboard.date, "Sat Oct 17 2026");
        assert_eq!(
            dashboard.due_today.iter().map(|task| task.id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(dashboard.stats.completed_today, 2);
        assert_eq!(dashboard.stats.total_today, 3);
        assert_eq!(dashboard.due_today[2].days_completed, 2);
        assert!(dashboard.habits[0].completed_today);
    }

    #[test]
    fn reminders_are_sorted_and_completed_ones_hidden() {
        let now = saturday_evening();
        let base = now.with_timezone(&Utc);
        let state = AppState {
            reminders: vec![
                reminder(1, base + Duration::hours(3), false),
                reminder(2, base - Duration::minutes(10), false),
                reminder(3, base + Duration::hours(1), true),
            ],
            ..AppState::default()
        };

        let reminders = active_reminders(&state, &now);

        assert_eq!(
            reminders.iter().map(|reminder| reminder.id).collect::<Vec<_>>(),
            vec![2, 1]
        );
        assert!(reminders[0].overdue);
        assert!(!reminders[1].overdue);
        assert_eq!(reminders[1].local_time, "2026-10-18 00:00");
    }

    #[test]
    fn overview_counts_completed_today() {
        let now = saturday_evening();
        let rows = category_overview(&sample_state(&now), &now);

        let counts = rows
            .iter()
            .map(|row| (row.key, row.completed, row.pending))
            .collect::<Vec<_>>();
        assert_eq!(
            counts,
            vec![
                ("today", 1, 1),
                ("fullweek", 0, 0),
                ("fullmonth", 1, 0),
                ("weekdays", 1, 0),
                ("habits", 1, 0),
            ]
        );
    }

    #[test]
    fn overview_rows_carry_tips() {
        let now = saturday_evening();
        let rows = category_overview(&AppState::default(), &now);

        assert_eq!(rows[1].tips.len(), 4);
        assert_eq!(
            rows[1].tips[0],
            "Full week tasks run until Sunday of the current week."
        );
        assert_eq!(rows[4].tips, HABIT_TIPS);
        assert!(rows.iter().all(|row| !row.tips.is_empty()));
    }

    #[test]
    fn text_rendering_includes_summary_and_sections() {
        let now = saturday_evening();
        let rendered = render_text(&build_dashboard(&sample_state(&now), &now));

        assert!(rendered.starts_with("# DayTracker - Sat Oct 17 2026"));
        assert!(rendered.contains("- Completed today: 2/3"));
        assert!(rendered.contains("[x] #3 task 3 (fullmonth, 2 days completed)"));
        assert!(rendered.contains("[x] #9 Read - 9:00 PM - streak 5"));
        assert!(rendered.contains("- No reminders"));
        assert!(rendered.contains("| Weekdays Tasks | 1 | 0 |"));
    }
}
