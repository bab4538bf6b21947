//! Derivation of loading events from a raw table.
//!
//! Validates the schema, parses the timestamp cells, computes the standing
//! time and overage metrics, and drops rows that cannot be valid loading
//! sessions. Per-row problems never escalate; only a missing column does.

use dwell_core::data_processors::{SiteExtractor, TimestampProcessor};
use dwell_core::error::SchemaError;
use dwell_core::models::{ColumnMapping, Event, RawRecord, RawTable};
use dwell_core::time_utils::TimezoneHandler;
use serde_json::Value;
use tracing::debug;

// ── DerivationStats ───────────────────────────────────────────────────────────

/// Row counts for one derivation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DerivationStats {
    pub rows_read: usize,
    /// Rows whose start or end cell did not parse.
    pub unparseable_timestamps: usize,
    /// Rows with a null or blank site cell.
    pub missing_site: usize,
    /// Rows with a duration at or below the plausibility threshold.
    pub implausible_duration: usize,
    pub events: usize,
}

/// Output of [`EventDeriver::derive`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Derivation {
    /// Surviving events in input order.
    pub events: Vec<Event>,
    pub stats: DerivationStats,
}

// ── EventDeriver ──────────────────────────────────────────────────────────────

/// Converts raw rows into [`Event`]s for a given column mapping.
#[derive(Debug, Clone, Default)]
pub struct EventDeriver {
    mapping: ColumnMapping,
    tz: TimezoneHandler,
}

impl EventDeriver {
    pub fn new(mapping: ColumnMapping) -> Self {
        Self {
            mapping,
            tz: TimezoneHandler::default(),
        }
    }

    /// Offset-bearing timestamps are mapped onto this timezone's wall clock.
    pub fn with_timezone(mut self, tz: TimezoneHandler) -> Self {
        self.tz = tz;
        self
    }

    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    /// Run the derivation. Fails only when a required column is absent.
    pub fn derive(&self, table: &RawTable) -> Result<Derivation, SchemaError> {
        check_schema(table, &self.mapping)?;

        let mut stats = DerivationStats {
            rows_read: table.len(),
            ..Default::default()
        };
        let mut events = Vec::with_capacity(table.len());

        for row in table.rows() {
            let (Some(started), Some(ended)) = (
                self.timestamp(row, &self.mapping.started),
                self.timestamp(row, &self.mapping.ended),
            ) else {
                stats.unparseable_timestamps += 1;
                continue;
            };

            let Some(site_name) = row.get(&self.mapping.site_name).and_then(SiteExtractor::extract)
            else {
                stats.missing_site += 1;
                continue;
            };

            let event = Event::from_span(started, ended, site_name);
            if !event.is_plausible() {
                stats.implausible_duration += 1;
                continue;
            }
            events.push(event);
        }

        stats.events = events.len();
        debug!(
            rows = stats.rows_read,
            unparseable = stats.unparseable_timestamps,
            missing_site = stats.missing_site,
            implausible = stats.implausible_duration,
            events = stats.events,
            "derived loading events"
        );

        Ok(Derivation { events, stats })
    }

    fn timestamp(&self, row: &RawRecord, column: &str) -> Option<chrono::NaiveDateTime> {
        TimestampProcessor::parse(row.get(column).unwrap_or(&Value::Null), &self.tz)
    }
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Fail with every required column that `table` lacks.
pub fn check_schema(table: &RawTable, mapping: &ColumnMapping) -> Result<(), SchemaError> {
    let missing: Vec<String> = mapping
        .required()
        .into_iter()
        .filter(|col| !table.has_column(col))
        .map(str::to_string)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(SchemaError { missing })
    }
}

/// Derive events with naive/UTC timestamp handling.
///
/// An empty result is not an error at this layer.
pub fn derive_events(table: &RawTable, mapping: &ColumnMapping) -> Result<Vec<Event>, SchemaError> {
    EventDeriver::new(mapping.clone())
        .derive(table)
        .map(|d| d.events)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
