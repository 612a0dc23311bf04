//! Service layer: collaborator contracts, session loading and the reader
//! controller that ties the core components together.

pub mod backend;
pub mod local_backend;
pub mod persistence;
pub mod reader_session;
pub mod session_loader;

pub use backend::{ArchiveEntry, BeaconSender, ReaderBackend, ReadingProgress, SessionUpdate};
pub use local_backend::LocalLibraryBackend;
pub use persistence::Persistence;
pub use reader_session::{CloseReason, HostCommand, ReaderDeps, ReaderSession};
pub use session_loader::{CancellationToken, SessionData, SessionGate, load_session};
