//! Monthly aggregation of loading events.
//!
//! Applies the date-window and site filters, then folds the surviving events
//! into one [`MonthlyAggregate`] per month bucket.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use dwell_core::error::FilterError;
use dwell_core::formatting::round2;
use dwell_core::models::{DateRange, Event, MonthlyAggregate, MonthlyTotals};

// ── MonthStats ────────────────────────────────────────────────────────────────

/// Unrounded running totals for one month bucket.
///
/// Sums are plain left-to-right `f64` additions in event order.
#[derive(Debug, Clone, Default)]
pub struct MonthStats {
    pub duration_hours: f64,
    pub overage_minutes: f64,
    pub overage_hours: f64,
    pub count: usize,
}

impl MonthStats {
    /// Add a single event's metrics to the running totals.
    pub fn add_event(&mut self, event: &Event) {
        self.duration_hours += event.duration_hours;
        self.overage_minutes += event.overage_minutes;
        self.overage_hours += event.overage_hours;
        self.count += 1;
    }

    /// Mean duration, or `0.0` for an empty bucket.
    pub fn mean_duration_hours(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.duration_hours / self.count as f64
        }
    }

    /// Round every metric to two decimals for display.
    fn into_aggregate(self, month: NaiveDate) -> MonthlyAggregate {
        MonthlyAggregate {
            month,
            total_duration_hours: round2(self.duration_hours),
            mean_duration_hours: round2(self.mean_duration_hours()),
            event_count: self.count,
            total_overage_minutes: round2(self.overage_minutes),
            total_overage_hours: round2(self.overage_hours),
        }
    }
}

// ── MonthlyAggregator ─────────────────────────────────────────────────────────

/// Stateless helper that filters events and groups them by month.
pub struct MonthlyAggregator;

impl MonthlyAggregator {
    /// Events whose `ended` lies inside `date_range` and whose site is
    /// selected, in input order.
    pub fn filter_events<'a>(
        events: &'a [Event],
        date_range: &'a DateRange,
        selected_sites: &'a BTreeSet<String>,
    ) -> impl Iterator<Item = &'a Event> + 'a {
        events
            .iter()
            .filter(move |e| date_range.contains(e.ended) && selected_sites.contains(&e.site_name))
    }

    /// Filter `events` and summarise them per month, ascending by month.
    ///
    /// An empty `selected_sites` set, or a window with no matching events,
    /// yields `Ok(vec![])`. Only a malformed `date_range` is an error.
    pub fn aggregate_monthly(
        events: &[Event],
        date_range: &DateRange,
        selected_sites: &BTreeSet<String>,
    ) -> Result<Vec<MonthlyAggregate>, FilterError> {
        date_range.validate()?;

        // BTreeMap gives ascending month order for free.
        let mut map: BTreeMap<NaiveDate, MonthStats> = BTreeMap::new();
        for event in Self::filter_events(events, date_range, selected_sites) {
            map.entry(event.month()).or_default().add_event(event);
        }

        Ok(map
            .into_iter()
            .map(|(month, stats)| stats.into_aggregate(month))
            .collect())
    }

    /// Distinct site names present in `events`, sorted lexicographically.
    pub fn available_sites(events: &[Event]) -> Vec<String> {
        events
            .iter()
            .map(|e| e.site_name.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Calendar dates of the earliest and latest `ended`, or `None` when
    /// there are no events.
    pub fn date_bounds(events: &[Event]) -> Option<DateRange> {
        let min = events.iter().map(|e| e.ended).min()?;
        let max = events.iter().map(|e| e.ended).max()?;
        Some(DateRange {
            start: min.date(),
            end: max.date(),
        })
    }

    /// Sum the monthly rows into a single totals row.
    ///
    /// The mean is recomputed as total duration over total count.
    pub fn calculate_totals(rows: &[MonthlyAggregate]) -> MonthlyTotals {
        let mut stats = MonthStats::default();
        for row in rows {
            stats.duration_hours += row.total_duration_hours;
            stats.overage_minutes += row.total_overage_minutes;
            stats.overage_hours += row.total_overage_hours;
            stats.count += row.event_count;
        }
        MonthlyTotals {
            total_duration_hours: round2(stats.duration_hours),
            mean_duration_hours: round2(stats.mean_duration_hours()),
            event_count: stats.count,
            total_overage_minutes: round2(stats.overage_minutes),
            total_overage_hours: round2(stats.overage_hours),
            months: rows.len(),
        }
    }
}

/// Free-function form of [`MonthlyAggregator::aggregate_monthly`].
pub fn aggregate_monthly(
    events: &[Event],
    date_range: &DateRange,
    selected_sites: &BTreeSet<String>,
) -> Result<Vec<MonthlyAggregate>, FilterError> {
    MonthlyAggregator::aggregate_monthly(events, date_range, selected_sites)
}

/// Free-function form of [`MonthlyAggregator::available_sites`].
pub fn available_sites(events: &[Event]) -> Vec<String> {
    MonthlyAggregator::available_sites(events)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
