//! Non-interactive renderings of a report outcome.

use dwell_runtime::ReportOutcome;
use dwell_ui::table_view::format_plain_table;
use serde_json::json;

/// KPI table as text, or the empty-result message.
pub fn render_plain(outcome: &ReportOutcome) -> String {
    match outcome {
        ReportOutcome::Months(report) => format_plain_table(&report.months, &report.totals),
        other => format!("{}\n", other.empty_message().unwrap_or_default()),
    }
}

/// `{ "months": [...], "totals": {...} }`.
///
/// Empty outcomes keep the same shape with `"totals": null` and add a
/// `"message"` field.
pub fn render_json(outcome: &ReportOutcome) -> serde_json::Result<String> {
    match outcome {
        ReportOutcome::Months(report) => serde_json::to_string_pretty(report),
        other => serde_json::to_string_pretty(&json!({
            "months": [],
            "totals": null,
            "message": other.empty_message(),
        })),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
