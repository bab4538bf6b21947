use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use tracing::warn;

// ── System timezone detection ─────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

// ── Calendar helpers ──────────────────────────────────────────────────────────

/// First day of the calendar month containing `ts`.
pub fn month_start(ts: NaiveDateTime) -> NaiveDate {
    let date = ts.date();
    // Day 1 exists in every month.
    date.with_day(1).unwrap_or(date)
}

/// Label used on chart axes, e.g. `"Aug 2025"`.
pub fn month_label(month: NaiveDate) -> String {
    month.format("%b %Y").to_string()
}

// ── TimezoneHandler ───────────────────────────────────────────────────────────

/// Maps offset-bearing timestamps onto the wall clock of one display
/// timezone. Naive timestamps are left untouched.
#[derive(Debug, Clone, Copy)]
pub struct TimezoneHandler {
    default_tz: Tz,
}

impl Default for TimezoneHandler {
    fn default() -> Self {
        Self { default_tz: Tz::UTC }
    }
}

impl TimezoneHandler {
    /// Create a handler for the given IANA timezone name.
    ///
    /// If `tz_name` is not recognised, falls back to UTC and logs a warning.
    pub fn new(tz_name: &str) -> Self {
        let tz = tz_name.parse::<Tz>().unwrap_or_else(|_| {
            warn!(
                "TimezoneHandler: unrecognised timezone \"{}\", falling back to UTC",
                tz_name
            );
            Tz::UTC
        });
        Self { default_tz: tz }
    }

    /// Name of the display timezone.
    pub fn name(&self) -> &'static str {
        self.default_tz.name()
    }

    /// Wall-clock time of `dt` in the display timezone.
    pub fn to_local<Z: TimeZone>(&self, dt: &DateTime<Z>) -> NaiveDateTime {
        dt.with_timezone(&self.default_tz).naive_local()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
