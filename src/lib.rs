//! Page-delivery core of a comic reader.
//!
//! Decides which page images to fetch and keep, which pages to render, which
//! page the reader is on, and how input turns into navigation. Rendering and
//! transport are left to the host.

pub mod config;
pub mod error;
pub mod executor;
pub mod file_utils;
pub mod gesture;
pub mod image_cache;
pub mod image_loader;
pub mod input;
pub mod preload;
pub mod reading_session;
pub mod scroll_tracker;
pub mod services;
pub mod settings;
pub mod state;
pub mod timing;
pub mod virtualization;

pub use error::{ReaderError, Result};
pub use image_cache::PageImageCache;
pub use preload::{PreloadConfig, PreloadPolicy};
pub use reading_session::ReadingSessionTracker;
pub use scroll_tracker::ScrollPageTracker;
pub use services::{ReaderDeps, ReaderSession};
pub use state::{Effect, Operation, ReaderState};
pub use virtualization::VirtualizationWindow;
