use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use tracing::trace;

use crate::time_utils::TimezoneHandler;

// ── TimestampProcessor ────────────────────────────────────────────────────────

/// Parses timestamp cells from the variety of shapes found in exported
/// loading logs.
pub struct TimestampProcessor;

/// Naive patterns tried in order after the offset-bearing formats.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y"];

impl TimestampProcessor {
    /// Attempt to parse a cell into a wall-clock timestamp.
    ///
    /// * `null`, booleans, arrays, objects → `None`
    /// * JSON string  → RFC 3339, RFC 2822, then naive and date-only patterns
    /// * JSON number  → Unix timestamp (integer or float seconds)
    ///
    /// Offset-bearing values are converted to the wall clock of `tz`.
    pub fn parse(value: &Value, tz: &TimezoneHandler) -> Option<NaiveDateTime> {
        match value {
            Value::String(s) => Self::parse_str(s.trim(), tz),
            Value::Number(n) => {
                let utc = if let Some(secs) = n.as_i64() {
                    DateTime::from_timestamp(secs, 0)
                } else {
                    let f = n.as_f64()?;
                    if !f.is_finite() {
                        return None;
                    }
                    let secs = f.floor() as i64;
                    let nanos = ((f - f.floor()) * 1_000_000_000.0).round() as u32;
                    DateTime::from_timestamp(secs, nanos.min(999_999_999))
                }?;
                Some(tz.to_local(&utc))
            }
            _ => None,
        }
    }

    fn parse_str(s: &str, tz: &TimezoneHandler) -> Option<NaiveDateTime> {
        if s.is_empty() {
            return None;
        }

        // RFC 3339 wants an uppercase `Z`; some exporters write lowercase.
        let normalised = match s.strip_suffix('z') {
            Some(stripped) => format!("{}Z", stripped),
            None => s.to_string(),
        };

        if let Ok(dt) = DateTime::parse_from_rfc3339(&normalised) {
            return Some(tz.to_local(&dt));
        }

        if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
            return Some(tz.to_local(&dt));
        }

        for fmt in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(naive);
            }
        }

        for fmt in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
                return date.and_hms_opt(0, 0, 0);
            }
        }

        trace!("TimestampProcessor: could not parse \"{}\"", s);
        None
    }
}

// ── SiteExtractor ─────────────────────────────────────────────────────────────

/// Normalises site-name cells.
pub struct SiteExtractor;

impl SiteExtractor {
    /// Trimmed site name, or `None` for null / empty cells.
    ///
    /// Numeric site identifiers are stringified.
    pub fn extract(value: &Value) -> Option<String> {
        let name = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
