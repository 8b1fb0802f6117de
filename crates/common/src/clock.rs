use chrono::{DateTime, Utc};

const MS_PER_DAY: i64 = 86_400_000;

/// Whole days from `now` until `when`, rounded up.
/// Negative when `when` is already past.
pub fn days_until(now: DateTime<Utc>, when: DateTime<Utc>) -> i64 {
    let ms = (when - now).num_milliseconds();
    if ms >= 0 {
        (ms + MS_PER_DAY - 1) / MS_PER_DAY
    } else {
        // Truncation toward zero is already ceiling for negative spans.
        ms / MS_PER_DAY
    }
}
