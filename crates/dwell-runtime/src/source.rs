//! Raw-byte acquisition from local files, export directories and URLs.

use std::path::Path;
use std::time::Duration;

use dwell_core::error::{DwellError, Result};
use dwell_core::models::RawTable;
use dwell_core::settings::SourceLocation;
use dwell_data::reader::{self, TableFormat};
use tracing::{debug, info};

/// Timeout for a remote download.
const FETCH_TIMEOUT_SECS: u64 = 60;

/// One file's worth of undecoded bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePart {
    /// File path or URL, for log messages.
    pub name: String,
    /// Known encoding, or `None` to sniff on decode.
    pub format: Option<TableFormat>,
    pub bytes: Vec<u8>,
}

/// Undecoded content of a data source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSource {
    pub parts: Vec<SourcePart>,
}

impl RawSource {
    /// Read or download the bytes behind `location`.
    pub async fn acquire(location: &SourceLocation) -> Result<Self> {
        match location {
            SourceLocation::Path(path) => Self::from_path(path),
            SourceLocation::Url(url) => Self::from_url(url).await,
        }
    }

    /// Read a single export file, or every export below a directory.
    pub fn from_path(path: &Path) -> Result<Self> {
        let files = if path.is_dir() {
            reader::find_table_files(path)
        } else {
            vec![path.to_path_buf()]
        };

        let mut parts = Vec::with_capacity(files.len());
        for file in files {
            let format = TableFormat::from_path(&file)
                .ok_or_else(|| DwellError::UnsupportedFormat(file.clone()))?;
            let bytes = std::fs::read(&file).map_err(|source| DwellError::FileRead {
                path: file.clone(),
                source,
            })?;
            parts.push(SourcePart {
                name: file.display().to_string(),
                format: Some(format),
                bytes,
            });
        }

        debug!("Read {} file(s) from {}", parts.len(), path.display());
        Ok(Self { parts })
    }

    /// Download `url`; the format is taken from the URL path when it has a
    /// known extension.
    pub async fn from_url(url: &str) -> Result<Self> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| DwellError::Fetch(format!("invalid URL {url}: {e}")))?;
        let format = format_hint(&parsed);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()
            .map_err(|e| DwellError::Fetch(e.to_string()))?;

        let response = client
            .get(parsed)
            .send()
            .await
            .map_err(|e| DwellError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DwellError::Fetch(format!("HTTP {status} from {url}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| DwellError::Fetch(e.to_string()))?;

        info!("Downloaded {} bytes from {}", bytes.len(), url);
        Ok(Self {
            parts: vec![SourcePart {
                name: url.to_string(),
                format,
                bytes: bytes.to_vec(),
            }],
        })
    }

    /// Decode every part and concatenate the resulting tables.
    pub fn decode(&self) -> Result<RawTable> {
        let mut table = RawTable::default();
        for part in &self.parts {
            let decoded = match part.format {
                Some(format) => reader::parse_table(&part.bytes, format)?,
                None => reader::parse_bytes(&part.bytes)?,
            };
            debug!("Decoded {}: {} rows", part.name, decoded.len());
            table.append(decoded);
        }
        Ok(table)
    }

    /// Total size in bytes across all parts.
    pub fn byte_len(&self) -> usize {
        self.parts.iter().map(|p| p.bytes.len()).sum()
    }
}

fn format_hint(url: &reqwest::Url) -> Option<TableFormat> {
    let last = url.path_segments()?.next_back()?;
    TableFormat::from_path(Path::new(last))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
