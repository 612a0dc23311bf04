//! A [`ReaderBackend`] over a local library directory.
//!
//! Every sub-directory of the library root is one file (issue); its images are
//! the pages. Settings, progress and bookmarks are kept in a JSON file at the
//! root, rewritten after every change.

use crate::error::BackendError;
use crate::file_utils::scan_directory;
use crate::reading_session::SessionSummary;
use crate::services::backend::{ArchiveEntry, ReaderBackend, ReadingProgress, SessionUpdate};
use crate::settings::ReaderSettings;
use crate::state::{AdjacentFile, AdjacentFiles};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

pub const LIBRARY_STATE_FILE: &str = ".reader-state.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LibraryState {
    #[serde(default)]
    settings: ReaderSettings,
    #[serde(default)]
    progress: HashMap<String, ReadingProgress>,
}

pub struct LocalLibraryBackend {
    root: PathBuf,
    state: Mutex<LibraryState>,
    next_session: AtomicU64,
}

impl LocalLibraryBackend {
    /// Opens a library, reading saved state if present.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, BackendError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(BackendError::NotFound(root.display().to_string()));
        }

        let state_path = root.join(LIBRARY_STATE_FILE);
        let state = match fs::read_to_string(&state_path) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                warn!("Ignoring unreadable library state {}: {}", state_path.display(), e);
                LibraryState::default()
            }),
            Err(_) => LibraryState::default(),
        };

        info!("Opened library at {}", root.display());
        Ok(Self {
            root,
            state: Mutex::new(state),
            next_session: AtomicU64::new(1),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Issue directories in natural order.
    pub fn file_ids(&self) -> Result<Vec<String>, BackendError> {
        let mut ids: Vec<String> = scan_directory(&self.root)
            .map_err(|e| BackendError::Unavailable(e.to_string()))?
            .into_iter()
            .filter(|entry| entry.is_directory && !entry.path.starts_with('.'))
            .map(|entry| entry.path)
            .collect();
        ids.sort_by(|a, b| natord::compare_ignore_case(a, b));
        Ok(ids)
    }

    fn with_state<T>(
        &self,
        update: impl FnOnce(&mut LibraryState) -> T,
    ) -> Result<T, BackendError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| BackendError::Unavailable("library state lock poisoned".to_string()))?;
        let result = update(&mut state);
        let json = serde_json::to_string_pretty(&*state)
            .map_err(|e| BackendError::Request(e.to_string()))?;
        fs::write(self.root.join(LIBRARY_STATE_FILE), json)
            .map_err(|e| BackendError::Request(e.to_string()))?;
        Ok(result)
    }

    fn read_state<T>(&self, read: impl FnOnce(&LibraryState) -> T) -> Result<T, BackendError> {
        let state = self
            .state
            .lock()
            .map_err(|_| BackendError::Unavailable("library state lock poisoned".to_string()))?;
        Ok(read(&state))
    }
}

impl ReaderBackend for LocalLibraryBackend {
    fn archive_contents(&self, file_id: &str) -> Result<Vec<ArchiveEntry>, BackendError> {
        let dir = self.root.join(file_id);
        if !dir.is_dir() {
            return Err(BackendError::NotFound(file_id.to_string()));
        }
        scan_directory(&dir).map_err(|e| BackendError::Unavailable(e.to_string()))
    }

    fn page_url(&self, file_id: &str, path: &str) -> String {
        self.root.join(file_id).join(path).to_string_lossy().into_owned()
    }

    fn reader_settings(&self) -> Result<ReaderSettings, BackendError> {
        self.read_state(|state| state.settings.clone())
    }

    fn update_reader_settings(&self, settings: &ReaderSettings) -> Result<(), BackendError> {
        self.with_state(|state| state.settings = settings.clone())
    }

    fn reading_progress(&self, file_id: &str) -> Result<Option<ReadingProgress>, BackendError> {
        self.read_state(|state| state.progress.get(file_id).cloned())
    }

    fn update_reading_progress(
        &self,
        file_id: &str,
        current_page: usize,
        total_pages: usize,
    ) -> Result<(), BackendError> {
        self.with_state(|state| {
            let progress = state.progress.entry(file_id.to_string()).or_default();
            progress.current_page = current_page;
            progress.total_pages = total_pages;
        })
    }

    fn add_bookmark(&self, file_id: &str, page: usize) -> Result<(), BackendError> {
        self.with_state(|state| {
            let progress = state.progress.entry(file_id.to_string()).or_default();
            if !progress.bookmarks.contains(&page) {
                progress.bookmarks.push(page);
                progress.bookmarks.sort_unstable();
            }
        })
    }

    fn remove_bookmark(&self, file_id: &str, page: usize) -> Result<(), BackendError> {
        self.with_state(|state| {
            if let Some(progress) = state.progress.get_mut(file_id) {
                progress.bookmarks.retain(|&bookmark| bookmark != page);
            }
        })
    }

    fn mark_as_completed(&self, file_id: &str) -> Result<(), BackendError> {
        self.with_state(|state| {
            state
                .progress
                .entry(file_id.to_string())
                .or_default()
                .completed = true;
        })
    }

    fn adjacent_files(&self, file_id: &str) -> Result<AdjacentFiles, BackendError> {
        let ids = self.file_ids()?;
        let Some(position) = ids.iter().position(|id| id == file_id) else {
            return Err(BackendError::NotFound(file_id.to_string()));
        };
        let file = |id: &String| AdjacentFile {
            id: id.clone(),
            name: id.clone(),
        };

        Ok(AdjacentFiles {
            previous: position.checked_sub(1).and_then(|i| ids.get(i)).map(file),
            next: ids.get(position + 1).map(file),
            series_name: self
                .root
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
            current_index: Some(position),
            total_in_series: Some(ids.len()),
        })
    }

    fn start_reading_session(
        &self,
        file_id: &str,
        start_page: usize,
    ) -> Result<String, BackendError> {
        let id = self.next_session.fetch_add(1, Ordering::SeqCst);
        debug!("Session {} started on {} at page {}", id, file_id, start_page);
        Ok(format!("local-{id}"))
    }

    fn update_reading_session(
        &self,
        session_id: &str,
        update: &SessionUpdate,
    ) -> Result<(), BackendError> {
        debug!(
            "Session {} at page {}, {} pages read",
            session_id,
            update.current_page,
            update.pages_read.len()
        );
        Ok(())
    }

    fn end_reading_session(&self, summary: &SessionSummary) -> Result<(), BackendError> {
        info!(
            "Session {} on {} ended: {}s, {} pages read",
            summary.session_id.as_deref().unwrap_or("-"),
            summary.file_id,
            summary.active_seconds,
            summary.pages_read.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn library(issues: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for issue in issues {
            let issue_dir = dir.path().join(issue);
            fs::create_dir(&issue_dir).unwrap();
            fs::write(issue_dir.join("001.jpg"), b"").unwrap();
        }
        dir
    }

    #[test]
    fn adjacent_files_follow_natural_order() {
        let dir = library(&["Issue 10", "Issue 2", "Issue 1"]);
        let backend = LocalLibraryBackend::open(dir.path()).unwrap();

        let adjacent = backend.adjacent_files("Issue 2").unwrap();
        assert_eq!(adjacent.previous.unwrap().id, "Issue 1");
        assert_eq!(adjacent.next.unwrap().id, "Issue 10");
        assert_eq!(adjacent.total_in_series, Some(3));

        assert!(backend.adjacent_files("Issue 10").unwrap().next.is_none());
    }

    #[test]
    fn progress_survives_reopening() {
        let dir = library(&["a"]);
        {
            let backend = LocalLibraryBackend::open(dir.path()).unwrap();
            backend.update_reading_progress("a", 4, 12).unwrap();
            backend.add_bookmark("a", 7).unwrap();
            backend.add_bookmark("a", 2).unwrap();
            backend.mark_as_completed("a").unwrap();
        }

        let backend = LocalLibraryBackend::open(dir.path()).unwrap();
        let progress = backend.reading_progress("a").unwrap().unwrap();
        assert_eq!((progress.current_page, progress.total_pages), (4, 12));
        assert_eq!(progress.bookmarks, vec![2, 7]);
        assert!(progress.completed);
        assert!(backend.reading_progress("b").unwrap().is_none());
    }

    #[test]
    fn missing_issue_is_not_found() {
        let dir = library(&[]);
        let backend = LocalLibraryBackend::open(dir.path()).unwrap();
        assert!(matches!(
            backend.archive_contents("nope"),
            Err(BackendError::NotFound(_))
        ));
    }
}
