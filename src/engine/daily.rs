use crate::engine::calendar::date_key;
use crate::model::{AppState, Category, CompletionRecord, Task, TaskPatch};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DailyAggregate {
    pub completed: usize,
    pub total: usize,
}

impl DailyAggregate {
    pub fn is_fully_completed(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}

pub fn is_due_on(category: Category, date: NaiveDate) -> bool {
    match category {
        Category::Weekdays => !matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
        Category::Today | Category::Fullweek | Category::Fullmonth => true,
    }
}

pub fn task_completed_on(task: &Task, date: NaiveDate) -> bool {
    if task.is_daily_tracking {
        task.daily_completions
            .get(&date_key(date))
            .copied()
            .unwrap_or(false)
    } else {
        task.completed
    }
}

/// Flips the authoritative completion representation for `date` and returns
/// the partial update that mirrors it remotely.
pub fn toggle_task_on(task: &mut Task, date: NaiveDate) -> TaskPatch {
    if task.is_daily_tracking {
        let key = date_key(date);
        let done = task.daily_completions.get(&key).copied().unwrap_or(false);
        task.daily_completions.insert(key, !done);

        TaskPatch {
            daily_completions: Some(task.daily_completions.clone()),
            ..TaskPatch::default()
        }
    } else {
        task.completed = !task.completed;

        TaskPatch {
            completed: Some(task.completed),
            ..TaskPatch::default()
        }
    }
}

pub fn days_completed(task: &Task) -> usize {
    task.daily_completions.values().filter(|done| **done).count()
}

pub fn due_tasks(state: &AppState, date: NaiveDate) -> impl Iterator<Item = &Task> {
    Category::ALL
        .into_iter()
        .filter(move |category| is_due_on(*category, date))
        .flat_map(move |category| state.tasks(category).iter())
}

pub fn daily_aggregate(state: &AppState, date: NaiveDate) -> DailyAggregate {
    due_tasks(state, date).fold(DailyAggregate::default(), |acc, task| DailyAggregate {
        completed: acc.completed + usize::from(task_completed_on(task, date)),
        total: acc.total + 1,
    })
}

/// Record to upsert for `date`, or `None` when the stored value already matches.
pub fn pending_completion_record(state: &AppState, date: NaiveDate) -> Option<CompletionRecord> {
    let key = date_key(date);
    let fully_completed = daily_aggregate(state, date).is_fully_completed();

    (state.completions.get(&key) != Some(&fully_completed)).then_some(CompletionRecord {
        date: key,
        completed: fully_completed,
    })
}

#[cfg(test)]
mod tests {
    use super::{daily_aggregate, pending_completion_record, task_completed_on, toggle_task_on};
    use crate::engine::calendar::date_key;
    use crate::model::{AppState, Category, Task};
    use chrono::NaiveDate;

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

    fn saturday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).expect("saturday")
    }

    fn friday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).expect("friday")
    }

    #[test]
    fn weekdays_tasks_are_excluded_on_saturday() {
        let state = AppState {
            today: vec![task(1, Category::Today, true), task(2, Category::Today, false)],
            fullweek: vec![task(3, Category::Fullweek, true)],
            weekdays: vec![task(4, Category::Weekdays, true)],
            ..AppState::default()
        };

        let aggregate = daily_aggregate(&state, saturday());
        assert_eq!((aggregate.completed, aggregate.total), (2, 3));
        assert!(!aggregate.is_fully_completed());

        let weekday_aggregate = daily_aggregate(&state, friday());
        assert_eq!((weekday_aggregate.completed, weekday_aggregate.total), (3, 4));
    }

    #[test]
    fn completion_record_written_only_when_value_changes() {
        let mut state = AppState {
            today: vec![task(1, Category::Today, true)],
            ..AppState::default()
        };

        let record = pending_completion_record(&state, saturday()).expect("new record");
        assert!(record.completed);
        assert_eq!(record.date, date_key(saturday()));

        state.completions.insert(record.date, record.completed);
        assert_eq!(pending_completion_record(&state, saturday()), None);

        state.today[0].completed = false;
        let flipped = pending_completion_record(&state, saturday()).expect("flipped record");
        assert!(!flipped.completed);
    }

    #[test]
    fn empty_day_is_never_fully_completed() {
        let state = AppState::default();
        assert!(!daily_aggregate(&state, saturday()).is_fully_completed());

        let record = pending_completion_record(&state, saturday()).expect("missing record");
        assert!(!record.completed);
    }

    #[test]
    fn daily_tracking_toggle_only_touches_that_date() {
        let mut tracked = Task {
            is_daily_tracking: true,
            ..task(5, Category::Fullmonth, true)
        };
        tracked.daily_completions.insert(date_key(friday()), true);

        let patch = toggle_task_on(&mut tracked, saturday());
        assert_eq!(patch.completed, None);
        assert!(task_completed_on(&tracked, saturday()));

        toggle_task_on(&mut tracked, saturday());
        assert!(!task_completed_on(&tracked, saturday()));
        assert_eq!(tracked.daily_completions.get(&date_key(friday())), Some(&true));
    }

    #[test]
    fn daily_tracking_ignores_completed_flag() {
        let tracked = Task {
            is_daily_tracking: true,
            ..task(6, Category::Today, true)
        };

        assert!(!task_completed_on(&tracked, saturday()));
    }
}
