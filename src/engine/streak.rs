use crate::engine::calendar::{date_key, local_date};
use crate::model::{DateKeyMap, Habit, HabitPatch};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use std::iter::successors;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HabitProgress {
    pub streak: u32,
    pub last_completed: Option<DateTime<Utc>>,
}

impl From<&Habit> for HabitProgress {
    fn from(habit: &Habit) -> Self {
        Self {
            streak: habit.streak,
            last_completed: habit.last_completed,
        }
    }
}

impl From<HabitProgress> for HabitPatch {
    fn from(progress: HabitProgress) -> Self {
        Self {
            streak: progress.streak,
            last_completed: progress.last_completed,
        }
    }
}

impl HabitProgress {
    pub fn apply_to(self, habit: &mut Habit) {
        habit.streak = self.streak;
        habit.last_completed = self.last_completed;
    }
}

pub fn habit_completed_on<Tz: TimeZone>(
    last_completed: Option<DateTime<Utc>>,
    now: &DateTime<Tz>,
) -> bool {
    last_completed.is_some_and(|last| local_date(&last, &now.timezone()) == now.date_naive())
}

/// Checking continues the streak only from yesterday; unchecking walks it back
/// one day and can only approximate the previous completion instant.
pub fn toggle_habit<Tz: TimeZone>(progress: HabitProgress, now: &DateTime<Tz>) -> HabitProgress {
    let yesterday = now.clone() - Duration::days(1);

    if habit_completed_on(progress.last_completed, now) {
        let streak = progress.streak.saturating_sub(1);

        HabitProgress {
            streak,
            last_completed: (streak > 0).then(|| yesterday.with_timezone(&Utc)),
        }
    } else {
        let continues = progress.last_completed.is_none_or(|last| {
            local_date(&last, &now.timezone()) == yesterday.date_naive()
        });

        HabitProgress {
            streak: if continues { progress.streak + 1 } else { 1 },
            last_completed: Some(now.with_timezone(&Utc)),
        }
    }
}

/// Consecutive fully-completed days ending today.
pub fn overall_streak(completions: &DateKeyMap, today: NaiveDate) -> u32 {
    let streak = successors(Some(today), |date| date.pred_opt())
        .take_while(|date| completions.get(&date_key(*date)) == Some(&true))
        .count();

    u32::try_from(streak).unwrap_or(u32::MAX)
}
