//! Table discovery and decoding for loading-event exports.
//!
//! Turns JSON, split-orientation JSON, JSONL, CSV and Excel workbooks into a
//! [`RawTable`] of named-field rows. Nothing here interprets cell values;
//! that is the derivation stage's job. Excel date cells are the exception:
//! they arrive as serial numbers and are rendered as ISO timestamps here.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use dwell_core::error::{DwellError, Result};
use dwell_core::models::{RawRecord, RawTable};
use serde_json::Value;
use tracing::{debug, warn};

/// Leading bytes of an `.xlsx` (ZIP) container.
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
/// Leading bytes of a legacy `.xls` (OLE2) container.
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
/// Rendering of Excel date cells; the timestamp parser accepts it.
const EXCEL_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

// ── TableFormat ───────────────────────────────────────────────────────────────

/// Encodings the reader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    /// A JSON array of row objects, or `{"columns": [...], "rows": [[...]]}`.
    Json,
    /// One JSON row object per line.
    JsonLines,
    /// Delimited text with a header line; `,` or `;` separated.
    Csv,
    /// Excel workbook (`.xlsx`, `.xlsm` or legacy `.xls`). The first sheet is
    /// read and its first row names the columns.
    Xlsx,
}

impl TableFormat {
    /// Pick a format from the file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "ndjson" => Some(Self::JsonLines),
            "csv" => Some(Self::Csv),
            "xlsx" | "xlsm" | "xls" => Some(Self::Xlsx),
            _ => None,
        }
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Find all supported export files recursively under `dir`, sorted by path.
pub fn find_table_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        warn!("Data path does not exist: {}", dir.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file() && TableFormat::from_path(entry.path()).is_some()
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Decode raw bytes whose format is not known up front (e.g. a download).
///
/// Workbooks are recognised by their container magic. A document that parses
/// as a single JSON value is treated as [`TableFormat::Json`] (a lone object
/// becomes a one-row table). Text whose first line is a JSON object is read
/// as JSONL, and any other text as CSV.
pub fn parse_bytes(bytes: &[u8]) -> Result<RawTable> {
    if bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC) {
        return parse_table(bytes, TableFormat::Xlsx);
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(obj)) if !is_split_layout(&obj) => Ok(RawTable::from_rows(vec![obj])),
        Ok(value) => table_from_value(value),
        Err(_) if looks_like_json_lines(bytes) => Ok(parse_json_lines(bytes)),
        Err(_) => parse_csv(bytes),
    }
}

/// Decode `bytes` in a known format.
pub fn parse_table(bytes: &[u8], format: TableFormat) -> Result<RawTable> {
    match format {
        TableFormat::Json => table_from_value(serde_json::from_slice(bytes)?),
        TableFormat::JsonLines => Ok(parse_json_lines(bytes)),
        TableFormat::Csv => parse_csv(bytes),
        TableFormat::Xlsx => parse_workbook(bytes),
    }
}

// ── Private helpers ───────────────────────────────────────────────────────────

fn is_split_layout(obj: &RawRecord) -> bool {
    obj.get("columns").is_some_and(Value::is_array) && obj.get("rows").is_some_and(Value::is_array)
}

fn table_from_value(value: Value) -> Result<RawTable> {
    match value {
        Value::Array(items) => {
            let total = items.len();
            let rows: Vec<RawRecord> = items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(obj) => Some(obj),
                    _ => None,
                })
                .collect();
            if rows.len() < total {
                debug!("Skipped {} non-object array elements", total - rows.len());
            }
            Ok(RawTable::from_rows(rows))
        }
        Value::Object(obj) if is_split_layout(&obj) => split_layout_table(obj),
        _ => Err(DwellError::InvalidTable(
            "expected an array of row objects or {\"columns\", \"rows\"}".to_string(),
        )),
    }
}

/// `{"columns": ["a", "b"], "rows": [[1, 2], ...]}` → row objects.
///
/// Short rows leave trailing cells absent; surplus cells are ignored.
fn split_layout_table(mut obj: RawRecord) -> Result<RawTable> {
    let columns: Vec<String> = match obj.remove("columns") {
        Some(Value::Array(cols)) => cols
            .into_iter()
            .map(|c| match c {
                Value::String(s) => Ok(s),
                other => Err(DwellError::InvalidTable(format!(
                    "column names must be strings, got {}",
                    other
                ))),
            })
            .collect::<Result<_>>()?,
        _ => Vec::new(),
    };

    let rows = match obj.remove("rows") {
        Some(Value::Array(rows)) => rows,
        _ => Vec::new(),
    };

    let records = rows
        .into_iter()
        .filter_map(|row| match row {
            Value::Array(cells) => Some(
                columns
                    .iter()
                    .cloned()
                    .zip(cells)
                    .collect::<RawRecord>(),
            ),
            _ => None,
        })
        .collect();

    Ok(RawTable::new(columns, records))
}

fn parse_json_lines(bytes: &[u8]) -> RawTable {
    let text = String::from_utf8_lossy(bytes);
    let mut table = RawTable::default();
    let mut skipped = 0usize;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Object(obj)) => table.push_row(obj),
            Ok(_) => skipped += 1,
            Err(e) => {
                debug!("Failed to parse JSON line: {}", e);
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        debug!("Skipped {} malformed JSONL lines", skipped);
    }
    table
}

fn looks_like_json_lines(bytes: &[u8]) -> bool {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .is_some_and(|line| line.starts_with('{'))
}

/// Header line decides the delimiter: `;` when it outnumbers `,`.
fn sniff_delimiter(bytes: &[u8]) -> u8 {
    let header = bytes.split(|b| *b == b'\n').next().unwrap_or_default();
    let count = |needle: u8| header.iter().filter(|b| **b == needle).count();
    if count(b';') > count(b',') {
        b';'
    } else {
        b','
    }
}

fn parse_csv(bytes: &[u8]) -> Result<RawTable> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(bytes))
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(bytes);

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| DwellError::InvalidTable(format!("CSV header: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for record in reader.records() {
        match record {
            Ok(record) => {
                let row: RawRecord = columns
                    .iter()
                    .zip(record.iter())
                    .map(|(column, cell)| {
                        let value = if cell.trim().is_empty() {
                            Value::Null
                        } else {
                            Value::String(cell.to_string())
                        };
                        (column.clone(), value)
                    })
                    .collect();
                rows.push(row);
            }
            Err(e) => {
                debug!("Failed to parse CSV record: {}", e);
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        debug!("Skipped {} malformed CSV records", skipped);
    }
    Ok(RawTable::new(columns, rows))
}

/// First worksheet → rows keyed by the header row. Columns with a blank
/// header are dropped, as are rows with no cells at all.
fn parse_workbook(bytes: &[u8]) -> Result<RawTable> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| DwellError::InvalidTable(format!("workbook: {e}")))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DwellError::InvalidTable("workbook has no sheets".to_string()))?
        .map_err(|e| DwellError::InvalidTable(format!("worksheet: {e}")))?;

    let mut sheet_rows = range.rows();
    let Some(header) = sheet_rows.next() else {
        return Ok(RawTable::default());
    };
    let columns: Vec<(usize, String)> = header
        .iter()
        .enumerate()
        .filter_map(|(idx, cell)| {
            let name = cell.to_string().trim().to_string();
            (!name.is_empty()).then_some((idx, name))
        })
        .collect();

    let rows: Vec<RawRecord> = sheet_rows
        .filter(|cells| cells.iter().any(|c| !matches!(c, Data::Empty)))
        .map(|cells| {
            columns
                .iter()
                .map(|(idx, name)| {
                    let value = cells.get(*idx).map_or(Value::Null, cell_value);
                    (name.clone(), value)
                })
                .collect()
        })
        .collect();

    debug!(
        "Workbook sheet: {} rows, {} columns",
        rows.len(),
        columns.len()
    );
    Ok(RawTable::new(
        columns.into_iter().map(|(_, name)| name).collect(),
        rows,
    ))
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => dt.as_datetime().map_or(Value::Null, |naive| {
            Value::String(naive.format(EXCEL_DATETIME_FORMAT).to_string())
        }),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::String(s.clone()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{}", content).unwrap();
        path
    }

    const ROW_A: &str =
        r#"{"started": "2024-01-10T08:00:00", "ended": "2024-01-10T08:45:00", "site_name": "A"}"#;
    const ROW_B: &str =
        r#"{"started": "2024-01-20T09:00:00", "ended": "2024-01-20T09:20:00", "site_name": "B"}"#;

    // ── TableFormat ───────────────────────────────────────────────────────────

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            TableFormat::from_path(Path::new("a.JSON")),
            Some(TableFormat::Json)
        );
        assert_eq!(
            TableFormat::from_path(Path::new("a.ndjson")),
            Some(TableFormat::JsonLines)
        );
        assert_eq!(
            TableFormat::from_path(Path::new("Standzeiten.xlsx")),
            Some(TableFormat::Xlsx)
        );
        assert_eq!(
            TableFormat::from_path(Path::new("old.XLS")),
            Some(TableFormat::Xlsx)
        );
        assert_eq!(
            TableFormat::from_path(Path::new("export.csv")),
            Some(TableFormat::Csv)
        );
        assert_eq!(TableFormat::from_path(Path::new("a.pdf")), None);
        assert_eq!(TableFormat::from_path(Path::new("noext")), None);
    }

    // ── parse_table ───────────────────────────────────────────────────────────

    #[test]
    fn test_parse_json_array() {
        let doc = format!("[{}, {}]", ROW_A, ROW_B);
        let table = parse_table(doc.as_bytes(), TableFormat::Json).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.columns(), ["started", "ended", "site_name"]);
    }

    #[test]
    fn test_parse_json_array_skips_non_objects() {
        let doc = format!("[{}, 42, null]", ROW_A);
        let table = parse_table(doc.as_bytes(), TableFormat::Json).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_parse_split_layout() {
        let doc = r#"{
            "columns": ["Gestartet", "Beendet", "Standortname"],
            "rows": [
                ["2024-01-10 08:00:00", "2024-01-10 08:45:00", "Depot"],
                ["2024-01-11 08:00:00"]
            ]
        }"#;
        let table = parse_table(doc.as_bytes(), TableFormat::Json).unwrap();
        assert_eq!(table.columns(), ["Gestartet", "Beendet", "Standortname"]);
        assert_eq!(table.len(), 2);
        assert!(table.rows()[1].get("Beendet").is_none());
    }

    #[test]
    fn test_parse_split_layout_without_rows_keeps_header() {
        let doc = r#"{"columns": ["started", "ended"], "rows": []}"#;
        let table = parse_table(doc.as_bytes(), TableFormat::Json).unwrap();
        assert!(table.is_empty());
        assert!(table.has_column("ended"));
    }

    #[test]
    fn test_parse_json_scalar_is_invalid_table() {
        let err = parse_table(b"42", TableFormat::Json).unwrap_err();
        assert!(matches!(err, DwellError::InvalidTable(_)));
    }

    #[test]
    fn test_parse_json_malformed_is_parse_error() {
        let err = parse_table(b"[{", TableFormat::Json).unwrap_err();
        assert!(matches!(err, DwellError::JsonParse(_)));
    }

    #[test]
    fn test_parse_json_lines_skips_malformed() {
        let doc = format!("{}\nnot json\n\n[1]\n{}\n", ROW_A, ROW_B);
        let table = parse_table(doc.as_bytes(), TableFormat::JsonLines).unwrap();
        assert_eq!(table.len(), 2);
    }

    // ── parse_bytes ───────────────────────────────────────────────────────────

    #[test]
    fn test_parse_bytes_sniffs_json_lines() {
        let doc = format!("{}\n{}\n", ROW_A, ROW_B);
        let table = parse_bytes(doc.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_parse_bytes_sniffs_array() {
        let doc = format!("  [{}]", ROW_A);
        assert_eq!(parse_bytes(doc.as_bytes()).unwrap().len(), 1);
    }

    #[test]
    fn test_parse_bytes_single_object_is_one_row() {
        assert_eq!(parse_bytes(ROW_A.as_bytes()).unwrap().len(), 1);
    }

    // ── find_table_files ──────────────────────────────────────────────────────

    #[test]
    fn test_find_table_files_recursive_and_sorted() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "b.jsonl", ROW_B);
        write_file(dir.path(), "2024/a.json", &format!("[{}]", ROW_A));
        write_file(dir.path(), "notes.txt", "ignored");

        let files = find_table_files(dir.path());
        assert_eq!(files.len(), 2);
        assert!(files.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_find_table_files_nonexistent_path() {
        assert!(find_table_files(Path::new("/definitely/not/here")).is_empty());
    }

    // ── CSV ───────────────────────────────────────────────────────────────────

    #[test]
    fn test_parse_csv_semicolon_with_bom() {
        let doc = "\u{feff}Gestartet;Beendet;Standortname\n\
                   10.01.2024 08:00;10.01.2024 08:45;Depot Nord\n\
                   11.01.2024 08:00;;\n";
        let table = parse_table(doc.as_bytes(), TableFormat::Csv).unwrap();
        assert_eq!(table.columns(), ["Gestartet", "Beendet", "Standortname"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0]["Standortname"], "Depot Nord");
        assert!(table.rows()[1]["Beendet"].is_null());
    }

    #[test]
    fn test_parse_csv_short_rows_leave_cells_absent() {
        let doc = "started,ended,site_name\n2024-01-10T08:00:00\n";
        let table = parse_table(doc.as_bytes(), TableFormat::Csv).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.rows()[0].get("ended").is_none());
        assert!(table.has_column("site_name"));
    }

    #[test]
    fn test_parse_bytes_falls_back_to_csv() {
        let doc = "started,ended,site_name\n2024-01-10T08:00:00,2024-01-10T08:45:00,A\n";
        let table = parse_bytes(doc.as_bytes()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0]["site_name"], "A");
    }

    // ── Excel ─────────────────────────────────────────────────────────────────

    fn workbook_bytes() -> Vec<u8> {
        use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

        let mut workbook = Workbook::new();
        let date_format = Format::new().set_num_format("dd.mm.yyyy hh:mm");
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Gestartet").unwrap();
        sheet.write_string(0, 1, "Beendet").unwrap();
        sheet.write_string(0, 2, "Standortname").unwrap();
        sheet.write_string(1, 3, "no header").unwrap();

        let started = ExcelDateTime::from_ymd(2024, 1, 10)
            .unwrap()
            .and_hms(12, 0, 0)
            .unwrap();
        let ended = ExcelDateTime::from_ymd(2024, 1, 10)
            .unwrap()
            .and_hms(12, 45, 0)
            .unwrap();
        sheet
            .write_datetime_with_format(1, 0, &started, &date_format)
            .unwrap();
        sheet
            .write_datetime_with_format(1, 1, &ended, &date_format)
            .unwrap();
        sheet.write_string(1, 2, "Depot Nord").unwrap();

        // Row 2 stays blank.
        sheet.write_string(3, 0, "20.01.2024 09:00").unwrap();
        sheet.write_string(3, 1, "20.01.2024 09:20").unwrap();
        sheet.write_number(3, 2, 42).unwrap();

        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_parse_workbook_first_sheet() {
        let table = parse_table(&workbook_bytes(), TableFormat::Xlsx).unwrap();
        assert_eq!(table.columns(), ["Gestartet", "Beendet", "Standortname"]);
        assert_eq!(table.len(), 2);

        let first = &table.rows()[0];
        assert_eq!(first["Gestartet"], "2024-01-10T12:00:00");
        assert_eq!(first["Beendet"], "2024-01-10T12:45:00");
        assert_eq!(first["Standortname"], "Depot Nord");

        let second = &table.rows()[1];
        assert_eq!(second["Gestartet"], "20.01.2024 09:00");
        assert_eq!(second["Standortname"].as_f64(), Some(42.0));
    }

    #[test]
    fn test_parse_bytes_sniffs_workbook() {
        let bytes = workbook_bytes();
        assert!(bytes.starts_with(ZIP_MAGIC));
        assert_eq!(parse_bytes(&bytes).unwrap().len(), 2);
    }

    #[test]
    fn test_parse_workbook_rejects_garbage() {
        let err = parse_table(b"PK\x03\x04 not really a zip", TableFormat::Xlsx).unwrap_err();
        assert!(matches!(err, DwellError::InvalidTable(_)));
    }
}
