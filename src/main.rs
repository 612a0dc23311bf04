//! Headless reader: opens an issue from a local library and pages through it,
//! logging what the reader core does along the way.
//!
//! Usage: `comic-reader <library-dir> [issue]`

use comic_reader_core::executor::RayonSpawner;
use comic_reader_core::image_cache::LoadStatus;
use comic_reader_core::image_loader::FsImageLoader;
use comic_reader_core::services::{
    CloseReason, HostCommand, LocalLibraryBackend, ReaderDeps, ReaderSession, SessionGate,
};
use comic_reader_core::state::{Operation, TransitionScreen};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const TICK: Duration = Duration::from_millis(50);

fn positional_args() -> Vec<String> {
    std::env::args()
        .skip(1)
        .filter(|arg| !arg.starts_with('-'))
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut logger = env_logger::Builder::from_default_env();
    #[cfg(debug_assertions)]
    logger.filter_level(log::LevelFilter::Debug);
    logger.init();

    let args = positional_args();
    let Some(root) = args.first().map(PathBuf::from) else {
        eprintln!("usage: comic-reader <library-dir> [issue]");
        std::process::exit(2);
    };

    let backend = Arc::new(LocalLibraryBackend::open(root)?);
    let file_id = match args.get(1) {
        Some(issue) => issue.clone(),
        None => backend
            .file_ids()?
            .into_iter()
            .next()
            .ok_or("library has no issues")?,
    };

    let deps = ReaderDeps::new(backend, Arc::new(FsImageLoader), Arc::new(RayonSpawner));
    let gate = SessionGate::new();
    let mut session = match ReaderSession::load(deps, &gate, &file_id, Instant::now()) {
        Ok(session) => session,
        Err(e) => {
            log::error!("Cannot open {}: {}", file_id, e);
            return Err(e.into());
        }
    };

    while session.state().transition_screen() != TransitionScreen::End {
        let now = Instant::now();
        for command in session.tick(now) {
            if let HostCommand::ScrollToPage { token, .. } = command {
                session.end_programmatic_scroll(token);
            }
        }

        let page = session.state().current_page();
        match session.page_status(page) {
            Some(LoadStatus::Loaded) | Some(LoadStatus::Error) => {
                if let Some(image) = session.page_image(page) {
                    log::info!("Page {}: {}x{}", page, image.width, image.height);
                } else {
                    log::warn!("Page {} failed to load", page);
                }
                session.dispatch(Operation::NextPage, now);
            }
            _ => thread::sleep(TICK),
        }
    }

    if let Some(next) = session.state().adjacent_files().next.as_ref() {
        log::info!("Finished {}; next up: {}", file_id, next.name);
    }
    session.close(Instant::now(), CloseReason::Navigate);
    // Let fire-and-forget saves land before exiting.
    thread::sleep(Duration::from_millis(200));

    Ok(())
}
