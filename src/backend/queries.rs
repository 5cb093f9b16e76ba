use chrono::{DateTime, SecondsFormat, Utc};

pub const TASKS: &str = "tasks";
pub const HABITS: &str = "habits";
pub const REMINDERS: &str = "reminders";
pub const COMPLETIONS: &str = "completions";

pub const LIST_TASKS: &[(&str, &str)] = &[("select", "*"), ("order", "created_at.desc")];
pub const LIST_HABITS: &[(&str, &str)] = &[("select", "*"), ("order", "created_at.desc")];
pub const LIST_ACTIVE_REMINDERS: &[(&str, &str)] =
    &[("completed", "eq.false"), ("order", "time.asc")];
pub const LIST_COMPLETIONS: &[(&str, &str)] = &[("select", "*")];

pub const PREFER_HEADER: &str = "prefer";
pub const PREFER_REPRESENTATION: &str = "return=representation";
pub const PREFER_MERGE_DUPLICATES: &str = "resolution=merge-duplicates";

pub fn id_filter(id: i64) -> String {
    format!("eq.{id}")
}

pub fn date_filter(date: &str) -> String {
    format!("eq.{date}")
}

pub fn expired_before_filter(now: DateTime<Utc>) -> String {
    format!("lt.{}", now.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[cfg(test)]
mod tests {
    use super::{date_filter, expired_before_filter, id_filter};
    use chrono::{TimeZone, Utc};

    #[test]
    fn filters_use_postgrest_operators() {
        let now = Utc
            .with_ymd_and_hms(2026, 10, 17, 9, 30, 0)
            .single()
            .expect("now");

        assert_eq!(id_filter(42), "eq.42");
        assert_eq!(date_filter("Sat Oct 17 2026"), "eq.Sat Oct 17 2026");
        assert_eq!(expired_before_filter(now), "lt.2026-10-17T09:30:00.000Z");
    }
}
