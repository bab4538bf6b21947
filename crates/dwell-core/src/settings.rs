use chrono::NaiveDate;
use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{DwellError, Result};
use crate::models::ColumnMapping;
use crate::time_utils::TimezoneHandler;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Monthly standing-time report for vehicle loading events
#[derive(Parser, Debug, Clone)]
#[command(
    name = "dwell-report",
    about = "Monthly standing-time report for vehicle loading events",
    version
)]
pub struct Settings {
    /// Export file, or a directory of exports (.json / .jsonl)
    #[arg(long, conflicts_with = "url")]
    pub file: Option<PathBuf>,

    /// Public download link to an export
    #[arg(long)]
    pub url: Option<String>,

    /// Column holding the start timestamp
    #[arg(long, default_value = "started")]
    pub start_column: String,

    /// Column holding the end timestamp
    #[arg(long, default_value = "ended")]
    pub end_column: String,

    /// Column holding the site name
    #[arg(long, default_value = "site_name")]
    pub site_column: String,

    /// First day of the analysis window (YYYY-MM-DD); defaults to the earliest end date
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last day of the analysis window, inclusive (YYYY-MM-DD); defaults to the latest end date
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Site to include (repeatable); all sites when omitted
    #[arg(long = "site")]
    pub sites: Vec<String>,

    /// Output mode
    #[arg(long, default_value = "tui", value_parser = ["tui", "table", "json"])]
    pub output: String,

    /// Display theme
    #[arg(long, default_value = "auto", value_parser = ["light", "dark", "auto"])]
    pub theme: String,

    /// Timezone for offset-bearing timestamps (auto-detected if not specified)
    #[arg(long, default_value = "auto")]
    pub timezone: String,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

/// Where the raw table comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    /// A local file or a directory of export files.
    Path(PathBuf),
    /// A remote download link.
    Url(String),
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.dwell-report/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_column: Option<String>,
}

impl LastUsedParams {
    /// Default path: `~/.dwell-report/last_used.json`.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Config path rooted at `base_dir`.
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".dwell-report").join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> std::result::Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &std::path::Path) -> std::result::Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, resolve `"auto"` values, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Same as [`Settings::load_with_last_used`] with an explicit argument
    /// list and config path.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        // Raw ArgMatches are needed to query ValueSource.
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            if let Err(e) = LastUsedParams::clear_at(config_path) {
                tracing::warn!(error = %e, "could not remove saved configuration");
            }
            return Self::resolve_auto_values(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins. Filters and the source are never loaded from
        // last-used; they describe one specific run.
        // NOTE: clap stores the arg id using the field name (underscores).
        merge(&matches, "theme", &mut settings.theme, last.theme);
        merge(&matches, "timezone", &mut settings.timezone, last.timezone);
        merge(&matches, "output", &mut settings.output, last.output);
        merge(
            &matches,
            "start_column",
            &mut settings.start_column,
            last.start_column,
        );
        merge(
            &matches,
            "end_column",
            &mut settings.end_column,
            last.end_column,
        );
        merge(
            &matches,
            "site_column",
            &mut settings.site_column,
            last.site_column,
        );

        settings = Self::resolve_auto_values(settings);

        let params = LastUsedParams::from(&settings);
        if let Err(e) = params.save_to(config_path) {
            tracing::warn!(error = %e, "could not persist last-used parameters");
        }

        settings
    }

    /// Resolve the `"auto"` timezone and apply the `--debug` flag.
    fn resolve_auto_values(mut settings: Settings) -> Settings {
        if settings.timezone == "auto" {
            settings.timezone = crate::time_utils::get_system_timezone();
        }
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// The configured column names.
    pub fn column_mapping(&self) -> ColumnMapping {
        ColumnMapping::new(&self.start_column, &self.end_column, &self.site_column)
    }

    pub fn timezone_handler(&self) -> TimezoneHandler {
        TimezoneHandler::new(&self.timezone)
    }

    /// The selected data source. Exactly one of `--file` / `--url` must be set.
    pub fn source_location(&self) -> Result<SourceLocation> {
        match (&self.file, &self.url) {
            (Some(path), None) => Ok(SourceLocation::Path(path.clone())),
            (None, Some(url)) if !url.trim().is_empty() => {
                Ok(SourceLocation::Url(url.trim().to_string()))
            }
            (None, _) => Err(DwellError::Config(
                "no data source given; pass --file or --url".to_string(),
            )),
            (Some(_), Some(_)) => Err(DwellError::Config(
                "--file and --url are mutually exclusive".to_string(),
            )),
        }
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            theme: Some(s.theme.clone()),
            timezone: Some(s.timezone.clone()),
            output: Some(s.output.clone()),
            start_column: Some(s.start_column.clone()),
            end_column: Some(s.end_column.clone()),
            site_column: Some(s.site_column.clone()),
        }
    }
}

// ── Helpers ────────────────────────────────────────────────────────────────────

/// Overwrite `target` with the persisted value unless `name` was given on the
/// command line.
fn merge(matches: &clap::ArgMatches, name: &str, target: &mut String, persisted: Option<String>) {
    if is_arg_explicitly_set(matches, name) {
        return;
    }
    if let Some(v) = persisted {
        *target = v;
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
