use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FilterError;

/// Free standing allowance per loading event, in minutes.
pub const FREE_ALLOWANCE_MINUTES: f64 = 30.0;

/// Events at or below this duration (36 seconds) are treated as noise.
pub const MIN_PLAUSIBLE_DURATION_HOURS: f64 = 0.01;

/// One row of the decoded input table: column name → cell value.
pub type RawRecord = serde_json::Map<String, Value>;

// ── ColumnMapping ─────────────────────────────────────────────────────────────

/// Names of the columns that hold the start timestamp, end timestamp and
/// site name of each loading event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub started: String,
    pub ended: String,
    pub site_name: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            started: "started".to_string(),
            ended: "ended".to_string(),
            site_name: "site_name".to_string(),
        }
    }
}

impl ColumnMapping {
    pub fn new(
        started: impl Into<String>,
        ended: impl Into<String>,
        site_name: impl Into<String>,
    ) -> Self {
        Self {
            started: started.into(),
            ended: ended.into(),
            site_name: site_name.into(),
        }
    }

    /// The three required column names in check order.
    pub fn required(&self) -> [&str; 3] {
        [&self.started, &self.ended, &self.site_name]
    }
}

// ── RawTable ──────────────────────────────────────────────────────────────────

/// A decoded tabular source.
///
/// The column list is kept separately from the rows so that a table with a
/// header but no rows still carries its schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    columns: Vec<String>,
    rows: Vec<RawRecord>,
}

impl RawTable {
    /// Build a table with an explicit header.
    ///
    /// Columns that only appear in rows are appended to the header.
    pub fn new(columns: Vec<String>, rows: Vec<RawRecord>) -> Self {
        let mut table = Self {
            columns: Vec::new(),
            rows: Vec::with_capacity(rows.len()),
        };
        for column in columns {
            table.add_column(column);
        }
        for row in rows {
            table.push_row(row);
        }
        table
    }

    /// Build a table whose schema is the union of keys across `rows`, in
    /// first-seen order.
    pub fn from_rows(rows: Vec<RawRecord>) -> Self {
        Self::new(Vec::new(), rows)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[RawRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Append a row, extending the schema with any new keys.
    pub fn push_row(&mut self, row: RawRecord) {
        for key in row.keys() {
            if !self.has_column(key) {
                self.columns.push(key.clone());
            }
        }
        self.rows.push(row);
    }

    /// Concatenate `other` onto this table. The schema becomes the union.
    pub fn append(&mut self, other: RawTable) {
        for column in other.columns {
            self.add_column(column);
        }
        self.rows.extend(other.rows);
    }

    fn add_column(&mut self, column: String) {
        if !self.has_column(&column) {
            self.columns.push(column);
        }
    }
}

// ── Event ─────────────────────────────────────────────────────────────────────

/// One loading event with its derived standing-time metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub started: NaiveDateTime,
    pub ended: NaiveDateTime,
    pub site_name: String,
    /// `(ended - started)` in hours.
    pub duration_hours: f64,
    /// Minutes beyond the free allowance, clipped at zero.
    pub overage_minutes: f64,
    /// `overage_minutes / 60`.
    pub overage_hours: f64,
}

impl Event {
    /// Compute the metrics for a start/end pair.
    ///
    /// No plausibility filtering happens here; see [`Event::is_plausible`].
    pub fn from_span(
        started: NaiveDateTime,
        ended: NaiveDateTime,
        site_name: impl Into<String>,
    ) -> Self {
        let delta = ended - started;
        let seconds = delta
            .num_microseconds()
            .map(|us| us as f64 / 1_000_000.0)
            .unwrap_or_else(|| delta.num_seconds() as f64);
        let duration_hours = seconds / 3600.0;
        let overage_minutes = (duration_hours * 60.0 - FREE_ALLOWANCE_MINUTES).max(0.0);

        Self {
            started,
            ended,
            site_name: site_name.into(),
            duration_hours,
            overage_minutes,
            overage_hours: overage_minutes / 60.0,
        }
    }

    /// `true` when the duration exceeds [`MIN_PLAUSIBLE_DURATION_HOURS`].
    pub fn is_plausible(&self) -> bool {
        self.duration_hours > MIN_PLAUSIBLE_DURATION_HOURS
    }

    /// Month bucket: the first day of the calendar month containing `ended`.
    pub fn month(&self) -> NaiveDate {
        crate::time_utils::month_start(self.ended)
    }
}

// ── MonthlyAggregate ──────────────────────────────────────────────────────────

/// Summary metrics for all filtered events of one month bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAggregate {
    /// First day of the month.
    pub month: NaiveDate,
    pub total_duration_hours: f64,
    pub mean_duration_hours: f64,
    pub event_count: usize,
    pub total_overage_minutes: f64,
    pub total_overage_hours: f64,
}

impl MonthlyAggregate {
    /// Display key, e.g. `"2024-01"`.
    pub fn month_key(&self) -> String {
        format!("{:04}-{:02}", self.month.year(), self.month.month())
    }
}

/// Cross-month totals shown beneath the monthly table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTotals {
    pub total_duration_hours: f64,
    pub mean_duration_hours: f64,
    pub event_count: usize,
    pub total_overage_minutes: f64,
    pub total_overage_hours: f64,
    /// Number of month rows represented.
    pub months: usize,
}

// ── DateRange ─────────────────────────────────────────────────────────────────

/// An inclusive calendar-date window applied to event end timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Validated constructor; `start` must not be after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, FilterError> {
        let range = Self { start, end };
        range.validate()?;
        Ok(range)
    }

    /// Build a range from a picker selection that may hold fewer or more than
    /// two dates.
    pub fn from_endpoints(endpoints: &[NaiveDate]) -> Result<Self, FilterError> {
        match endpoints {
            [start, end] => Self::new(*start, *end),
            other => Err(FilterError::EndpointCount(other.len())),
        }
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        if self.start > self.end {
            return Err(FilterError::Inverted {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    /// `true` when `ts` lies on or after `start` 00:00 and strictly before
    /// the midnight that follows `end`.
    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        if ts < self.start.and_time(NaiveTime::MIN) {
            return false;
        }
        match self.end.succ_opt() {
            Some(next_day) => ts < next_day.and_time(NaiveTime::MIN),
            None => true,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
