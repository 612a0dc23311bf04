//! Unified error types for the reader core.

use thiserror::Error;

/// Failure to fetch or decode a single page image.
#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("failed to read page image: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode page image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("failed to fetch page image: {0}")]
    Fetch(String),
}

/// Failure reported by an external collaborator (API, persistence, telemetry).
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("request failed: {0}")]
    Request(String),
}

/// Reader-level errors.
///
/// Only the "no pages at all" family is terminal for a session; everything
/// else stays local to one cache entry or one field.
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("archive contents unavailable for {file_id}: {source}")]
    ArchiveUnavailable {
        file_id: String,
        #[source]
        source: BackendError,
    },
    #[error("no readable pages in {file_id}")]
    NoPages { file_id: String },
    #[error("session for {file_id} was superseded")]
    Superseded { file_id: String },
    #[error(transparent)]
    ImageLoad(#[from] ImageLoadError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl ReaderError {
    /// Whether this error leaves the reader with nothing to show.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReaderError::ArchiveUnavailable { .. } | ReaderError::NoPages { .. }
        )
    }
}

/// Type alias for Results in this crate.
pub type Result<T> = std::result::Result<T, ReaderError>;
