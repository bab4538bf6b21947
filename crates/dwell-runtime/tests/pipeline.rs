//! End-to-end runs from an export on disk to monthly rows.

use std::sync::Arc;

use chrono::NaiveDate;
use dwell_core::models::ColumnMapping;
use dwell_core::settings::SourceLocation;
use dwell_core::time_utils::TimezoneHandler;
use dwell_runtime::{build_report, DataManager, FilterSelection, ReportOutcome};
use tempfile::TempDir;

const EXPORT: &str = r#"[
  {"Gestartet": "2024-01-10T08:00:00", "Beendet": "2024-01-10T08:45:00", "Standortname": "Nord"},
  {"Gestartet": "2024-01-11T09:00:00", "Beendet": "2024-01-11T09:00:20", "Standortname": "Nord"},
  {"Gestartet": "2024-01-20T10:00:00", "Beendet": null, "Standortname": "Süd"},
  {"Gestartet": "2024-02-02T06:30:00", "Beendet": "2024-02-02T08:00:00", "Standortname": "Süd"},
  {"Gestartet": "2024-02-28T23:30:00", "Beendet": "2024-03-01T00:15:00", "Standortname": "Nord"}
]"#;

fn mapping() -> ColumnMapping {
    ColumnMapping::new("Gestartet", "Beendet", "Standortname")
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn write_source(dir: &TempDir) -> SourceLocation {
    let path = dir.path().join("ladevorgaenge.json");
    std::fs::write(&path, EXPORT).unwrap();
    SourceLocation::Path(path)
}

#[tokio::test]
async fn test_full_pipeline_and_cache_reuse() {
    let dir = TempDir::new().unwrap();
    let location = write_source(&dir);
    let mut mgr = DataManager::new(mapping(), TimezoneHandler::default());

    let dataset = mgr.load(&location).await.unwrap();
    assert_eq!(dataset.events.len(), 3);
    assert_eq!(dataset.stats.rows_read, 5);
    assert_eq!(dataset.stats.unparseable_timestamps, 1);
    assert_eq!(dataset.stats.implausible_duration, 1);
    assert_eq!(dataset.sites, vec!["Nord", "Süd"]);

    let ReportOutcome::Months(report) =
        build_report(&dataset, &FilterSelection::default()).unwrap()
    else {
        panic!("expected monthly rows");
    };
    let keys: Vec<String> = report.months.iter().map(|m| m.month_key()).collect();
    assert_eq!(keys, vec!["2024-01", "2024-02", "2024-03"]);
    assert_eq!(report.months[1].total_duration_hours, 1.5);
    assert_eq!(report.months[1].total_overage_minutes, 60.0);
    assert_eq!(report.totals.event_count, 3);

    let again = mgr.load(&location).await.unwrap();
    assert!(Arc::ptr_eq(&dataset, &again));
    assert_eq!(mgr.cache().hits(), 1);
}

#[tokio::test]
async fn test_directory_source_and_site_filter() {
    let dir = TempDir::new().unwrap();
    write_source(&dir);
    std::fs::write(
        dir.path().join("extra.jsonl"),
        r#"{"Gestartet": "2024-01-05 12:00", "Beendet": "2024-01-05 13:30", "Standortname": " Nord "}"#,
    )
    .unwrap();

    let mut mgr = DataManager::new(mapping(), TimezoneHandler::default());
    let dataset = mgr
        .load(&SourceLocation::Path(dir.path().to_path_buf()))
        .await
        .unwrap();
    assert_eq!(dataset.events.len(), 4);

    let selection = FilterSelection::new(
        Some(date("2024-01-01")),
        Some(date("2024-01-31")),
        &["Nord".to_string()],
    );
    let ReportOutcome::Months(report) = build_report(&dataset, &selection).unwrap() else {
        panic!("expected monthly rows");
    };
    assert_eq!(report.months.len(), 1);
    assert_eq!(report.months[0].event_count, 2);
    assert_eq!(report.months[0].total_duration_hours, 2.25);
    // 1.125 is an exact tie and rounds to the even neighbour.
    assert_eq!(report.months[0].mean_duration_hours, 1.12);
}

#[tokio::test]
async fn test_default_mapping_reports_missing_columns() {
    let dir = TempDir::new().unwrap();
    let mut mgr = DataManager::new(ColumnMapping::default(), TimezoneHandler::default());
    let err = mgr.load(&write_source(&dir)).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Missing required columns: started, ended, site_name"
    );
}
