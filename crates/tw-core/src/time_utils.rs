use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike, Weekday};
use chrono_tz::Tz;
use tracing::warn;

/// Timestamp layout used by the raw exports and every CSV the pipeline writes.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Hourly time layout returned by the weather archive, e.g. `2024-01-05T13:00`.
pub const ARCHIVE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Day layout used by the annual weather file, e.g. `05.01.2024`.
pub const ANNUAL_DATE_FORMAT: &str = "%d.%m.%Y";

/// Weekday names in Monday-first order.
pub const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Month names, January first.
pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

// ── Hour buckets ──────────────────────────────────────────────────────────────

/// Truncate `ts` to the start of its clock hour (floor, never round).
///
/// Idempotent: an hour-aligned timestamp is returned unchanged.
pub fn floor_to_hour(ts: NaiveDateTime) -> NaiveDateTime {
    ts.date()
        .and_hms_opt(ts.hour(), 0, 0)
        .unwrap_or(ts)
}

// ── Calendar features ─────────────────────────────────────────────────────────

/// Full English name of the weekday, e.g. `"Saturday"`.
pub fn weekday_name(day: Weekday) -> &'static str {
    WEEKDAY_NAMES[day.num_days_from_monday() as usize]
}

/// Saturday and Sunday count as the weekend.
pub fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Sat | Weekday::Sun)
}

/// Full English month name for `month` in `1..=12`.
pub fn month_name(month: u32) -> &'static str {
    MONTH_NAMES[(month.clamp(1, 12) - 1) as usize]
}

// ── Parsing / formatting ──────────────────────────────────────────────────────

/// Parse a `YYYY-MM-DD HH:MM:SS` timestamp.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s.trim(), TIMESTAMP_FORMAT).ok()
}

/// Format a timestamp as `YYYY-MM-DD HH:MM:SS`.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse an archive hourly time (`%Y-%m-%dT%H:%M`), also accepting seconds.
pub fn parse_archive_time(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, ARCHIVE_TIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

/// Parse a `DD.MM.YYYY` day from the annual weather file.
pub fn parse_annual_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), ANNUAL_DATE_FORMAT).ok()
}

/// Calendar day of a timestamp (used for per-day grouping).
pub fn day_of(ts: &NaiveDateTime) -> NaiveDate {
    ts.date()
}

/// Month number (1–12) of a timestamp.
pub fn month_of(ts: &NaiveDateTime) -> u32 {
    ts.month()
}

// ── Timezones ─────────────────────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

/// Validate that `tz_name` is a recognised IANA timezone identifier.
pub fn validate_timezone(tz_name: &str) -> bool {
    tz_name.parse::<Tz>().is_ok()
}

/// Resolve the `"auto"` sentinel to the system timezone and fall back to UTC
/// for names that are not valid IANA identifiers.
pub fn resolve_timezone(tz_name: &str) -> String {
    let candidate = if tz_name.eq_ignore_ascii_case("auto") {
        get_system_timezone()
    } else {
        tz_name.to_string()
    };

    if validate_timezone(&candidate) {
        candidate
    } else {
        warn!(
            "Unrecognised timezone \"{}\", falling back to UTC",
            candidate
        );
        "UTC".to_string()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
