//! Contracts of the external collaborators the reader core depends on.
//!
//! The HTTP API, progress/bookmark persistence and session telemetry live
//! outside this crate; hosts implement these traits over whatever transport
//! they use.

use crate::error::BackendError;
use crate::reading_session::SessionSummary;
use crate::settings::ReaderSettings;
use crate::state::AdjacentFiles;
use serde::{Deserialize, Serialize};

/// One entry of an archive listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    pub path: String,
    #[serde(default)]
    pub is_directory: bool,
}

/// Saved reading position of one file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReadingProgress {
    pub current_page: usize,
    pub total_pages: usize,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub bookmarks: Vec<usize>,
}

/// Periodic telemetry for an open reading session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUpdate {
    pub current_page: usize,
    pub pages_read: Vec<usize>,
}

pub trait ReaderBackend: Send + Sync {
    fn archive_contents(&self, file_id: &str) -> Result<Vec<ArchiveEntry>, BackendError>;

    /// Stable URL of one page; used as cache key and image source.
    fn page_url(&self, file_id: &str, path: &str) -> String;

    fn reader_settings(&self) -> Result<ReaderSettings, BackendError>;
    fn update_reader_settings(&self, settings: &ReaderSettings) -> Result<(), BackendError>;

    fn reading_progress(&self, file_id: &str) -> Result<Option<ReadingProgress>, BackendError>;
    fn update_reading_progress(
        &self,
        file_id: &str,
        current_page: usize,
        total_pages: usize,
    ) -> Result<(), BackendError>;

    fn add_bookmark(&self, file_id: &str, page: usize) -> Result<(), BackendError>;
    fn remove_bookmark(&self, file_id: &str, page: usize) -> Result<(), BackendError>;
    fn mark_as_completed(&self, file_id: &str) -> Result<(), BackendError>;

    fn adjacent_files(&self, file_id: &str) -> Result<AdjacentFiles, BackendError>;

    /// Returns the new session's id.
    fn start_reading_session(&self, file_id: &str, start_page: usize)
    -> Result<String, BackendError>;
    fn update_reading_session(
        &self,
        session_id: &str,
        update: &SessionUpdate,
    ) -> Result<(), BackendError>;
    fn end_reading_session(&self, summary: &SessionSummary) -> Result<(), BackendError>;
}

/// Non-blocking delivery that still completes while the host is unloading.
pub trait BeaconSender: Send + Sync {
    /// Returns whether the payload was queued for delivery.
    fn send_end_session(&self, summary: &SessionSummary) -> bool;
}
