//! Runtime layer for the dwell-time report.
//!
//! Acquires source bytes from disk or over HTTP, memoises the derived
//! dataset by content hash, serves reload requests in the background, and
//! resolves filter selections into monthly reports for the presentation
//! layer.

pub mod cache;
pub mod data_manager;
pub mod reloader;
pub mod report;
pub mod source;

pub use data_manager::{DataManager, Dataset};
pub use dwell_core as core;
pub use dwell_data as data;
pub use reloader::{ReloadRequest, ReloadResult, Reloader};
pub use report::{build_report, FilterSelection, MonthlyReport, ReportOutcome};
