use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};

use crate::models::{DaySlot, Timestamp, DAYS_PER_WEEK};

/// Returns the most recent week anchor (Sunday) at or before `now`, at day
/// granularity. Stable for repeated calls within the same day.
pub fn week_start(now: DateTime<Utc>) -> NaiveDate {
    let today = now.date_naive();
    today - Duration::days(i64::from(today.weekday().num_days_from_sunday()))
}

/// Builds a fresh week of 7 unset slots, slot `i` dated `anchor + i` days.
pub fn build_slots(anchor: NaiveDate) -> Vec<DaySlot> {
    (0..DAYS_PER_WEEK as i64)
        .map(|offset| DaySlot {
            date: day_start(anchor + Duration::days(offset)),
            status: None,
        })
        .collect()
}

/// Unix timestamp of midnight UTC on `date`.
pub fn day_start(date: NaiveDate) -> Timestamp {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}
