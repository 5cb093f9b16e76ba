use crate::engine::calendar::end_of_day;
use crate::model::Category;
use anyhow::Result;
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};

/// Calendar day on which a task created on `today` stops being valid.
pub fn expiry_date(category: Category, today: NaiveDate) -> NaiveDate {
    let from_sunday = i64::from(today.weekday().num_days_from_sunday());

    match category {
        Category::Today => today,
        Category::Fullweek => today + Duration::days((7 - from_sunday) % 7),
        Category::Fullmonth => last_day_of_month(today),
        Category::Weekdays => {
            let until_friday = match from_sunday {
                0 => 5,
                6 => 6,
                weekday => 5 - weekday,
            };
            today + Duration::days(until_friday)
        }
    }
}

pub fn expires_at<Tz: TimeZone>(category: Category, now: &DateTime<Tz>) -> Result<DateTime<Utc>> {
    end_of_day(&now.timezone(), expiry_date(category, now.date_naive()))
}

pub fn is_expired(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expires_at.is_some_and(|expiry| now > expiry)
}

fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = match date.month() {
        12 => (date.year() + 1, 1),
        month => (date.year(), month + 1),
    };

    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first_of_next| first_of_next.pred_opt())
        .unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::{expires_at, expiry_date, is_expired};
    use crate::model::Category;
    use chrono::{Datelike, Duration, NaiveDate, TimeZone, Utc, Weekday};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn fullweek_ends_on_sunday() {
        assert_eq!(expiry_date(Category::Fullweek, date(2026, 10, 14)), date(2026, 10, 18));
        assert_eq!(expiry_date(Category::Fullweek, date(2026, 10, 17)), date(2026, 10, 18));
        assert_eq!(expiry_date(Category::Fullweek, date(2026, 10, 18)), date(2026, 10, 18));
    }

    #[test]
    fn weekdays_end_on_upcoming_friday() {
        assert_eq!(expiry_date(Category::Weekdays, date(2026, 10, 12)), date(2026, 10, 16));
        assert_eq!(expiry_date(Category::Weekdays, date(2026, 10, 16)), date(2026, 10, 16));
        assert_eq!(expiry_date(Category::Weekdays, date(2026, 10, 17)), date(2026, 10, 23));
        assert_eq!(expiry_date(Category::Weekdays, date(2026, 10, 18)), date(2026, 10, 23));
    }

    #[test]
    fn fullmonth_ends_on_last_day() {
        assert_eq!(expiry_date(Category::Fullmonth, date(2028, 2, 3)), date(2028, 2, 29));
        assert_eq!(expiry_date(Category::Fullmonth, date(2026, 12, 31)), date(2026, 12, 31));
        assert_eq!(expiry_date(Category::Fullmonth, date(2026, 4, 1)), date(2026, 4, 30));
    }

    #[test]
    fn expiry_is_never_in_the_past_and_lands_on_expected_weekday() {
        let start = Utc
            .with_ymd_and_hms(2026, 10, 1, 0, 0, 0)
            .single()
            .expect("start");

        (0..24 * 45).for_each(|hour| {
            let now = start + Duration::hours(hour);

            Category::ALL.into_iter().for_each(|category| {
                let expiry = expires_at(category, &now).expect("expiry");
                assert!(expiry >= now, "{category} expired at creation: {now}");
            });

            let weekdays = expires_at(Category::Weekdays, &now).expect("weekdays expiry");
            assert_eq!(weekdays.weekday(), Weekday::Fri);
            let fullweek = expires_at(Category::Fullweek, &now).expect("fullweek expiry");
            assert_eq!(fullweek.weekday(), Weekday::Sun);
        });
    }

    #[test]
    fn expired_only_strictly_after_expiry() {
        let expiry = Utc
            .with_ymd_and_hms(2026, 10, 17, 23, 59, 59)
            .single()
            .expect("expiry");

        assert!(!is_expired(Some(expiry), expiry));
        assert!(is_expired(Some(expiry), expiry + Duration::milliseconds(1)));
        assert!(!is_expired(None, expiry + Duration::days(365)));
    }
}
