//! Fire-and-forget persistence.
//!
//! Every call is handed to the spawner and its failure is logged. Navigation
//! never waits on, or rolls back because of, the backend.

use crate::error::BackendError;
use crate::executor::Spawner;
use crate::reading_session::SessionSummary;
use crate::services::backend::{ReaderBackend, SessionUpdate};
use crate::settings::ReaderSettings;
use crossbeam_channel::{Receiver, bounded};
use log::warn;
use std::sync::Arc;

#[derive(Clone)]
pub struct Persistence {
    backend: Arc<dyn ReaderBackend>,
    spawner: Arc<dyn Spawner>,
    file_id: String,
}

impl Persistence {
    pub fn new(
        backend: Arc<dyn ReaderBackend>,
        spawner: Arc<dyn Spawner>,
        file_id: String,
    ) -> Self {
        Self {
            backend,
            spawner,
            file_id,
        }
    }

    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    fn fire<F>(&self, what: &'static str, call: F)
    where
        F: FnOnce(&dyn ReaderBackend, &str) -> Result<(), BackendError> + Send + 'static,
    {
        let backend = Arc::clone(&self.backend);
        let file_id = self.file_id.clone();
        self.spawner.spawn(Box::new(move || {
            if let Err(e) = call(backend.as_ref(), &file_id) {
                warn!("{} failed for {}: {}", what, file_id, e);
            }
        }));
    }

    pub fn save_progress(&self, current_page: usize, total_pages: usize) {
        self.fire("Saving progress", move |backend, file_id| {
            backend.update_reading_progress(file_id, current_page, total_pages)
        });
    }

    // TODO: retry or reconcile when this fails; the reader already shows the
    // issue as completed and the two can diverge.
    pub fn mark_completed(&self) {
        self.fire("Marking completed", |backend, file_id| {
            backend.mark_as_completed(file_id)
        });
    }

    pub fn add_bookmark(&self, page: usize) {
        self.fire("Adding bookmark", move |backend, file_id| {
            backend.add_bookmark(file_id, page)
        });
    }

    pub fn remove_bookmark(&self, page: usize) {
        self.fire("Removing bookmark", move |backend, file_id| {
            backend.remove_bookmark(file_id, page)
        });
    }

    pub fn update_settings(&self, settings: ReaderSettings) {
        self.fire("Saving reader settings", move |backend, _| {
            backend.update_reader_settings(&settings)
        });
    }

    /// Starts a telemetry session; the id arrives on the returned channel.
    pub fn start_session(&self, start_page: usize) -> Receiver<String> {
        let (tx, rx) = bounded(1);
        let backend = Arc::clone(&self.backend);
        let file_id = self.file_id.clone();
        self.spawner.spawn(Box::new(move || {
            match backend.start_reading_session(&file_id, start_page) {
                Ok(session_id) => {
                    let _ = tx.send(session_id);
                }
                Err(e) => warn!("Starting reading session failed for {}: {}", file_id, e),
            }
        }));
        rx
    }

    pub fn update_session(&self, session_id: String, update: SessionUpdate) {
        self.fire("Updating reading session", move |backend, _| {
            backend.update_reading_session(&session_id, &update)
        });
    }

    pub fn end_session(&self, summary: SessionSummary) {
        self.fire("Ending reading session", move |backend, _| {
            backend.end_reading_session(&summary)
        });
    }
}
