//! Shared model for the dwell-time report.
//!
//! Holds the event and aggregate types, the error taxonomy, timestamp and
//! site-cell parsing, display formatting, and CLI settings.

pub mod data_processors;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;
