#![allow(dead_code)]

use comic_reader_core::error::{BackendError, ImageLoadError};
use comic_reader_core::executor::InlineSpawner;
use comic_reader_core::image_loader::{DecodedImage, ImageLoader};
use comic_reader_core::preload::{NetworkSampler, NetworkStatus};
use comic_reader_core::reading_session::SessionSummary;
use comic_reader_core::services::{
    ArchiveEntry, BeaconSender, ReaderBackend, ReaderDeps, ReadingProgress, SessionData,
    SessionGate, SessionUpdate, load_session,
};
use comic_reader_core::settings::ReaderSettings;
use comic_reader_core::state::{AdjacentFile, AdjacentFiles};
use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Progress {
        file_id: String,
        page: usize,
        total: usize,
    },
    MarkCompleted(String),
    AddBookmark(usize),
    RemoveBookmark(usize),
    Settings(ReaderSettings),
    StartSession(String),
    UpdateSession(String, SessionUpdate),
    EndSession(SessionSummary),
}

#[derive(Default)]
pub struct RecordingBackend {
    pub pages: usize,
    pub settings: ReaderSettings,
    pub progress: Option<ReadingProgress>,
    pub adjacent: AdjacentFiles,
    pub fail_archive: bool,
    pub fail_settings: bool,
    pub fail_progress: bool,
    pub fail_adjacent: bool,
    pub calls: Mutex<Vec<Call>>,
}

impl RecordingBackend {
    pub fn with_pages(pages: usize) -> Self {
        Self {
            pages,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn progress_saves(&self) -> Vec<(String, usize, usize)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Progress {
                    file_id,
                    page,
                    total,
                } => Some((file_id, page, total)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|call| matches(call)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl ReaderBackend for RecordingBackend {
    fn archive_contents(&self, file_id: &str) -> Result<Vec<ArchiveEntry>, BackendError> {
        if self.fail_archive {
            return Err(BackendError::Unavailable(file_id.to_string()));
        }
        let mut entries: Vec<ArchiveEntry> = (1..=self.pages)
            .rev()
            .map(|n| ArchiveEntry {
                path: format!("page{n}.jpg"),
                is_directory: false,
            })
            .collect();
        entries.push(ArchiveEntry {
            path: "ComicInfo.xml".to_string(),
            is_directory: false,
        });
        entries.push(ArchiveEntry {
            path: "__MACOSX/._page1.jpg".to_string(),
            is_directory: false,
        });
        Ok(entries)
    }

    fn page_url(&self, file_id: &str, path: &str) -> String {
        format!("mem://{file_id}/{path}")
    }

    fn reader_settings(&self) -> Result<ReaderSettings, BackendError> {
        if self.fail_settings {
            return Err(BackendError::Request("settings".to_string()));
        }
        Ok(self.settings.clone())
    }

    fn update_reader_settings(&self, settings: &ReaderSettings) -> Result<(), BackendError> {
        self.record(Call::Settings(settings.clone()));
        Ok(())
    }

    fn reading_progress(&self, _file_id: &str) -> Result<Option<ReadingProgress>, BackendError> {
        if self.fail_progress {
            return Err(BackendError::Request("progress".to_string()));
        }
        Ok(self.progress.clone())
    }

    fn update_reading_progress(
        &self,
        file_id: &str,
        current_page: usize,
        total_pages: usize,
    ) -> Result<(), BackendError> {
        self.record(Call::Progress {
            file_id: file_id.to_string(),
            page: current_page,
            total: total_pages,
        });
        Ok(())
    }

    fn add_bookmark(&self, _file_id: &str, page: usize) -> Result<(), BackendError> {
        self.record(Call::AddBookmark(page));
        Ok(())
    }

    fn remove_bookmark(&self, _file_id: &str, page: usize) -> Result<(), BackendError> {
        self.record(Call::RemoveBookmark(page));
        Ok(())
    }

    fn mark_as_completed(&self, file_id: &str) -> Result<(), BackendError> {
        self.record(Call::MarkCompleted(file_id.to_string()));
        Ok(())
    }

    fn adjacent_files(&self, _file_id: &str) -> Result<AdjacentFiles, BackendError> {
        if self.fail_adjacent {
            return Err(BackendError::NotFound("series".to_string()));
        }
        Ok(self.adjacent.clone())
    }

    fn start_reading_session(
        &self,
        file_id: &str,
        _start_page: usize,
    ) -> Result<String, BackendError> {
        self.record(Call::StartSession(file_id.to_string()));
        Ok(format!("session-{file_id}"))
    }

    fn update_reading_session(
        &self,
        session_id: &str,
        update: &SessionUpdate,
    ) -> Result<(), BackendError> {
        self.record(Call::UpdateSession(session_id.to_string(), update.clone()));
        Ok(())
    }

    fn end_reading_session(&self, summary: &SessionSummary) -> Result<(), BackendError> {
        self.record(Call::EndSession(summary.clone()));
        Ok(())
    }
}

/// Decodes nothing; reports portrait pages unless the URL is listed as landscape.
#[derive(Default)]
pub struct SizedLoader {
    pub landscape: HashSet<String>,
    pub broken: HashSet<String>,
}

impl ImageLoader for SizedLoader {
    fn load(&self, url: &str) -> Result<DecodedImage, ImageLoadError> {
        if self.broken.contains(url) {
            return Err(ImageLoadError::Fetch(url.to_string()));
        }
        if self.landscape.contains(url) {
            Ok(DecodedImage::new(Vec::new(), 1600, 1000))
        } else {
            Ok(DecodedImage::new(Vec::new(), 1000, 1600))
        }
    }
}

#[derive(Default)]
pub struct RecordingBeacon {
    pub sent: Mutex<Vec<SessionSummary>>,
}

impl BeaconSender for RecordingBeacon {
    fn send_end_session(&self, summary: &SessionSummary) -> bool {
        self.sent.lock().unwrap().push(summary.clone());
        true
    }
}

/// A network sampler the test can change after handing it over.
#[derive(Clone)]
pub struct SwitchableNetwork(pub Rc<Cell<NetworkStatus>>);

impl NetworkSampler for SwitchableNetwork {
    fn sample(&self) -> NetworkStatus {
        self.0.get()
    }
}

pub fn adjacent(previous: Option<&str>, next: Option<&str>) -> AdjacentFiles {
    let file = |id: &str| AdjacentFile {
        id: id.to_string(),
        name: format!("Issue {id}"),
    };
    AdjacentFiles {
        previous: previous.map(file),
        next: next.map(file),
        ..Default::default()
    }
}

pub fn fetch(backend: &RecordingBackend, file_id: &str) -> SessionData {
    let _ = env_logger::builder().is_test(true).try_init();
    let gate = SessionGate::new();
    load_session(backend, file_id, &gate.issue()).unwrap()
}

pub fn deps(backend: &Arc<RecordingBackend>) -> ReaderDeps {
    ReaderDeps::new(
        backend.clone(),
        Arc::new(SizedLoader::default()),
        Arc::new(InlineSpawner),
    )
}
