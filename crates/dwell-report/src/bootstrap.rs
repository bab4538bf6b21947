use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Name of the per-user state directory below `$HOME`.
pub const STATE_DIR: &str = ".dwell-report";

// ── Directory bootstrap ────────────────────────────────────────────────────────

/// Ensure `~/.dwell-report/` exists. It holds `last_used.json`.
pub fn ensure_directories() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    ensure_directories_in(&home)
}

/// Create the state directory below `home` and return its path.
pub fn ensure_directories_in(home: &Path) -> anyhow::Result<PathBuf> {
    let state_dir = home.join(STATE_DIR);
    std::fs::create_dir_all(&state_dir)
        .with_context(|| format!("creating {}", state_dir.display()))?;
    Ok(state_dir)
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a `--log-level` name onto an [`EnvFilter`] directive.
///
/// Unrecognised names are passed through so that full filter expressions
/// such as `"dwell_data=trace"` also work.
pub fn level_directive(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" | "WARN" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        _ => log_level.to_string(),
    }
}

/// Initialise the global `tracing` subscriber.
///
/// With `log_file` set, events are appended to that file without ANSI
/// colours and nothing is written to stderr, which would corrupt the TUI.
pub fn setup_logging(log_level: &str, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(level_directive(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, stderr_layer) = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            let layer = fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false);
            (Some(layer), None)
        }
        None => {
            let layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false);
            (None, Some(layer))
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("installing tracing subscriber")?;

    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_directories_in_creates_state_dir() {
        let tmp = TempDir::new().expect("tempdir");
        let dir = ensure_directories_in(tmp.path()).expect("create");
        assert_eq!(dir, tmp.path().join(".dwell-report"));
        assert!(dir.is_dir());
        // Idempotent.
        ensure_directories_in(tmp.path()).expect("second call");
    }

    #[test]
    fn test_level_directive_mapping() {
        assert_eq!(level_directive("DEBUG"), "debug");
        assert_eq!(level_directive("info"), "info");
        assert_eq!(level_directive("WARNING"), "warn");
        assert_eq!(level_directive("CRITICAL"), "error");
        assert_eq!(level_directive("dwell_data=trace"), "dwell_data=trace");
    }

    #[test]
    fn test_setup_logging_writes_to_file() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("logs").join("dwell.log");

        setup_logging("INFO", Some(&path)).expect("first init succeeds");
        tracing::info!("hello from the test");

        let content = std::fs::read_to_string(&path).expect("log file exists");
        assert!(content.contains("hello from the test"));
        // ANSI escapes are disabled for files.
        assert!(!content.contains('\u{1b}'));
    }
}
