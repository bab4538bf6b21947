//! Data layer for the dwell-time report.
//!
//! Responsible for decoding export tables, deriving loading events with
//! their standing-time metrics, and aggregating them per month.

pub mod aggregator;
pub mod derivation;
pub mod reader;

pub use aggregator::{aggregate_monthly, available_sites, MonthlyAggregator};
pub use derivation::{derive_events, Derivation, DerivationStats, EventDeriver};
pub use dwell_core as core;
