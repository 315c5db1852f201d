use chrono::{DateTime, Utc};

const UNITS: &[(i64, &str)] = &[
    (365 * 24 * 60 * 60, "year"),
    (30 * 24 * 60 * 60, "month"),
    (7 * 24 * 60 * 60, "week"),
    (24 * 60 * 60, "day"),
    (60 * 60, "hour"),
    (60, "minute"),
    (1, "second"),
];

/// Spell out how long ago (or how far ahead) `unix_secs` is relative to `now`.
///
/// Uses the largest whole unit, spelled in full: `"3 hours ago"`,
/// `"1 day ago"`, `"in 2 minutes"`. Identical instants give `"now"`.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use hnplus::util::relative_time;
///
/// let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
/// assert_eq!(relative_time(1_700_000_000 - 7200, now), "2 hours ago");
/// ```
pub fn relative_time(unix_secs: i64, now: DateTime<Utc>) -> String {
    let delta = now.timestamp().saturating_sub(unix_secs);
    if delta == 0 {
        return "now".to_string();
    }

    let magnitude = delta.saturating_abs();
    let (size, unit) = UNITS
        .iter()
        .copied()
        .find(|(size, _)| magnitude >= *size)
        .unwrap_or((1, "second"));
    let count = magnitude / size;
    let plural = if count == 1 { "" } else { "s" };

    if delta > 0 {
        format!("{count} {unit}{plural} ago")
    } else {
        format!("in {count} {unit}{plural}")
    }
}
