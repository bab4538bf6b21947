//! Filter resolution and report assembly over a derived [`Dataset`].

use std::collections::BTreeSet;

use chrono::NaiveDate;
use dwell_core::error::FilterError;
use dwell_core::models::{DateRange, MonthlyAggregate, MonthlyTotals};
use dwell_data::MonthlyAggregator;
use serde::Serialize;
use tracing::{debug, warn};

use crate::data_manager::Dataset;

/// User filter choices before defaults are applied.
///
/// `None` fields fall back to the dataset: the earliest/latest end date for
/// the window, every available site for the site set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub sites: Option<BTreeSet<String>>,
}

impl FilterSelection {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>, sites: &[String]) -> Self {
        let sites = if sites.is_empty() {
            None
        } else {
            Some(sites.iter().cloned().collect())
        };
        Self { from, to, sites }
    }

    /// Concrete window and site set for `dataset`.
    ///
    /// Returns `Ok(None)` when the dataset has no events and no explicit
    /// window was given, since there is nothing to default from. A defaulted
    /// endpoint never lands on the wrong side of the one the user gave, so
    /// only an explicit `from > to` is an inverted window.
    pub fn resolve(&self, dataset: &Dataset) -> Result<Option<(DateRange, BTreeSet<String>)>, FilterError> {
        let (start, end) = match (self.from, self.to, dataset.bounds) {
            (Some(start), Some(end), _) => (start, end),
            (Some(start), None, Some(bounds)) => (start, bounds.end.max(start)),
            (None, Some(end), Some(bounds)) => (bounds.start.min(end), end),
            (None, None, Some(bounds)) => (bounds.start, bounds.end),
            (_, _, None) => return Ok(None),
        };
        let window = DateRange::new(start, end)?;

        let sites = match &self.sites {
            Some(selected) => selected.clone(),
            None => dataset.sites.iter().cloned().collect(),
        };
        Ok(Some((window, sites)))
    }
}

/// Monthly rows plus the context they were computed under.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyReport {
    pub months: Vec<MonthlyAggregate>,
    pub totals: MonthlyTotals,
    #[serde(skip)]
    pub window: DateRange,
    #[serde(skip)]
    pub sites: BTreeSet<String>,
}

/// Result of running the filter over a dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    /// Derivation produced no plausible events at all.
    NoEvents,
    /// Events exist, but none survive the window and site filter.
    NoMatches {
        window: DateRange,
        sites: BTreeSet<String>,
    },
    Months(MonthlyReport),
}

impl ReportOutcome {
    /// Message shown instead of a table or chart, if any.
    pub fn empty_message(&self) -> Option<&'static str> {
        match self {
            ReportOutcome::NoEvents => Some("no plausible loading events in source"),
            ReportOutcome::NoMatches { .. } => Some("no data for the selected filter combination"),
            ReportOutcome::Months(_) => None,
        }
    }
}

/// Apply `selection` to `dataset` and aggregate the survivors per month.
///
/// Fails only when the window is inverted.
pub fn build_report(dataset: &Dataset, selection: &FilterSelection) -> Result<ReportOutcome, FilterError> {
    let resolved = selection.resolve(dataset)?;
    if dataset.is_empty() {
        return Ok(ReportOutcome::NoEvents);
    }
    let Some((window, sites)) = resolved else {
        return Ok(ReportOutcome::NoEvents);
    };

    for unknown in sites.iter().filter(|s| !dataset.sites.contains(s)) {
        warn!("Selected site {:?} does not occur in the source", unknown);
    }

    let months = MonthlyAggregator::aggregate_monthly(&dataset.events, &window, &sites)?;
    debug!(
        months = months.len(),
        from = %window.start,
        to = %window.end,
        sites = sites.len(),
        "aggregated report"
    );

    if months.is_empty() {
        return Ok(ReportOutcome::NoMatches { window, sites });
    }

    let totals = MonthlyAggregator::calculate_totals(&months);
    Ok(ReportOutcome::Months(MonthlyReport {
        months,
        totals,
        window,
        sites,
    }))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
