//! Terminal UI layer for the dwell-time report.
//!
//! Provides themes, the header and filter sidebar, the monthly KPI table,
//! bar and trend charts, and the interactive event loop built on top of
//! [`ratatui`].

pub mod app;
pub mod chart_view;
pub mod components;
pub mod table_view;
pub mod themes;

pub use dwell_core as core;
