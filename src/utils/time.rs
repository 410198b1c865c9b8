use chrono::{Datelike, Duration, NaiveDate};

/// Formats a running timer the way it is shown next to the start/stop button.
pub fn format_clock(elapsed: Duration) -> String {
    let total = elapsed.num_seconds().max(0);
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// Human readable duration, e.g. `1h 5m 3s`. Zero components are skipped.
pub fn format_duration(v: Duration) -> String {
    let hours = v.num_hours();
    let minutes = v.num_minutes() % 60;
    let seconds = v.num_seconds() % 60;
    let parts = [(hours, "h"), (minutes, "m"), (seconds, "s")]
        .into_iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| format!("{value}{unit}"))
        .collect::<Vec<_>>();
    if parts.is_empty() {
        "0s".to_string()
    } else {
        parts.join(" ")
    }
}

/// Sunday of the week containing `date`. Weeks run Sunday to Saturday.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_sunday() as i64)
}
