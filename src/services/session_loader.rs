//! Session initialization.
//!
//! The archive listing, reader settings, saved progress and adjacent files are
//! independent requests and are fetched in parallel. Only a missing archive is
//! fatal; every other field falls back to a default and the failure is logged.
//! A newer request for the same reader supersedes an older one still in flight.

use crate::error::{ReaderError, Result};
use crate::file_utils::filter_page_entries;
use crate::services::backend::{ReaderBackend, ReadingProgress};
use crate::settings::ReaderSettings;
use crate::state::{AdjacentFiles, PageInfo, ReaderState};
use log::{info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Everything fetched to open one file.
#[derive(Debug, Clone)]
pub struct SessionData {
    pub file_id: String,
    pub pages: Vec<PageInfo>,
    pub settings: ReaderSettings,
    pub progress: Option<ReadingProgress>,
    pub adjacent_files: AdjacentFiles,
}

impl SessionData {
    /// Builds the initial reader state, resuming at the saved page.
    pub fn into_state(self) -> ReaderState {
        let (start_page, completed, bookmarks) = match self.progress {
            Some(progress) => (progress.current_page, progress.completed, progress.bookmarks),
            None => (0, false, Vec::new()),
        };
        ReaderState::new(self.file_id, self.pages, self.settings)
            .with_start_page(start_page)
            .with_completed(completed)
            .with_bookmarks(bookmarks)
            .with_adjacent_files(self.adjacent_files)
    }
}

/// Issues cancellation tokens; issuing a new one cancels all earlier ones.
#[derive(Debug, Clone, Default)]
pub struct SessionGate {
    current: Arc<AtomicU64>,
}

impl SessionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> CancellationToken {
        let generation = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        CancellationToken {
            generation,
            current: Arc::clone(&self.current),
        }
    }

    /// Cancels every outstanding token.
    pub fn cancel_all(&self) {
        self.current.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone)]
pub struct CancellationToken {
    generation: u64,
    current: Arc<AtomicU64>,
}

impl CancellationToken {
    pub fn is_cancelled(&self) -> bool {
        self.current.load(Ordering::SeqCst) != self.generation
    }
}

/// Fetches everything needed to open `file_id`.
///
/// Returns [`ReaderError::Superseded`] when `token` was cancelled while the
/// requests were in flight; the results are then discarded.
pub fn load_session(
    backend: &dyn ReaderBackend,
    file_id: &str,
    token: &CancellationToken,
) -> Result<SessionData> {
    let ((archive, settings), (progress, adjacent)) = rayon::join(
        || {
            rayon::join(
                || backend.archive_contents(file_id),
                || backend.reader_settings(),
            )
        },
        || {
            rayon::join(
                || backend.reading_progress(file_id),
                || backend.adjacent_files(file_id),
            )
        },
    );

    if token.is_cancelled() {
        info!("Discarding superseded session load for {}", file_id);
        return Err(ReaderError::Superseded {
            file_id: file_id.to_string(),
        });
    }

    let entries = archive.map_err(|source| ReaderError::ArchiveUnavailable {
        file_id: file_id.to_string(),
        source,
    })?;
    let pages = filter_page_entries(&entries, |path| backend.page_url(file_id, path));
    if pages.is_empty() {
        return Err(ReaderError::NoPages {
            file_id: file_id.to_string(),
        });
    }

    let settings = settings.unwrap_or_else(|e| {
        warn!("Reader settings unavailable, using defaults: {}", e);
        ReaderSettings::default()
    });
    let progress = progress.unwrap_or_else(|e| {
        warn!("Reading progress unavailable for {}: {}", file_id, e);
        None
    });
    let adjacent_files = adjacent.unwrap_or_else(|e| {
        warn!("Adjacent files unavailable for {}: {}", file_id, e);
        AdjacentFiles::default()
    });

    info!(
        "Loaded {} pages for {} (resume at {})",
        pages.len(),
        file_id,
        progress.as_ref().map(|p| p.current_page).unwrap_or(0)
    );

    Ok(SessionData {
        file_id: file_id.to_string(),
        pages,
        settings,
        progress,
        adjacent_files,
    })
}
