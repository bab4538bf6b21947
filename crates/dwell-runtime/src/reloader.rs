//! Background reloads for the interactive report.
//!
//! The TUI never awaits I/O itself. It sends a [`ReloadRequest`] through an
//! `mpsc` channel and drains [`ReloadResult`]s from another, so a slow
//! download never stalls key handling.

use std::sync::Arc;

use dwell_core::settings::SourceLocation;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::data_manager::{DataManager, Dataset};

/// What the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadRequest {
    /// Re-acquire the source; unchanged bytes reuse the cached derivation.
    Reload,
    /// Drop every cached derivation first, then reload.
    Rederive,
}

/// Outcome of one request. Errors are rendered text so the UI can show them
/// without depending on the error type.
pub type ReloadResult = Result<Arc<Dataset>, String>;

/// Channel ends handed to the UI. Dropping it stops the task.
pub struct Reloader {
    pub requests: mpsc::Sender<ReloadRequest>,
    pub updates: mpsc::Receiver<ReloadResult>,
    task: JoinHandle<()>,
}

impl Reloader {
    /// Move `manager` into a task that serves requests for `location`.
    ///
    /// The request channel holds a single pending request, so repeated key
    /// presses while a download is running are rejected by `try_send`.
    pub fn spawn(manager: DataManager, location: SourceLocation) -> Self {
        let (requests, request_rx) = mpsc::channel(1);
        let (update_tx, updates) = mpsc::channel(4);
        let task = tokio::spawn(serve(manager, location, request_rx, update_tx));
        Self {
            requests,
            updates,
            task,
        }
    }
}

impl Drop for Reloader {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    mut manager: DataManager,
    location: SourceLocation,
    mut requests: mpsc::Receiver<ReloadRequest>,
    updates: mpsc::Sender<ReloadResult>,
) {
    while let Some(request) = requests.recv().await {
        if request == ReloadRequest::Rederive {
            manager.invalidate_cache();
        }
        let result = manager.load(&location).await.map_err(|e| e.to_string());
        match &result {
            Ok(dataset) => tracing::info!(
                ?request,
                events = dataset.events.len(),
                hits = manager.cache().hits(),
                misses = manager.cache().misses(),
                "source reloaded"
            ),
            Err(e) => tracing::warn!(?request, "reload failed: {}", e),
        }
        if updates.send(result).await.is_err() {
            tracing::debug!("reload channel closed; exiting loop");
            break;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
