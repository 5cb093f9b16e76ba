use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};

/// Full date rendering used as the completion-history key, e.g. `Sat Oct 17 2026`.
pub const DATE_KEY_FORMAT: &str = "%a %b %d %Y";

pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

/// 23:59:59.999 of `date` in `tz`, as an absolute instant.
pub fn end_of_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Result<DateTime<Utc>> {
    let naive = date
        .and_hms_milli_opt(23, 59, 59, 999)
        .context("Failed to build end-of-day time")?;

    tz.from_local_datetime(&naive)
        .earliest()
        .map(|instant| instant.with_timezone(&Utc))
        .with_context(|| format!("End of day does not exist in local time: {date}"))
}

pub fn local_date<Tz: TimeZone>(instant: &DateTime<Utc>, tz: &Tz) -> NaiveDate {
    instant.with_timezone(tz).date_naive()
}

pub fn parse_hhmm(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .with_context(|| format!("Invalid time format: {value}. Example: 14:30 (24-hour format)"))
}

/// `Stretch - 2:05 PM` style label. Midnight renders as 12 AM.
pub fn display_text(text: &str, time: Option<NaiveTime>) -> String {
    match time {
        Some(time) => {
            let hour = time.hour();
            let meridiem = if hour >= 12 { "PM" } else { "AM" };
            let display_hour = match hour {
                0 => 12,
                13.. => hour - 12,
                _ => hour,
            };
            format!("{text} - {display_hour}:{:02} {meridiem}", time.minute())
        }
        None => text.to_string(),
    }
}
