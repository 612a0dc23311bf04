//! Where background work runs.
//!
//! Image fetches and fire-and-forget persistence calls are handed to a
//! [`Spawner`]. Their results always come back to the owning component through
//! a channel, so the owner stays single-threaded regardless of the spawner.

/// A unit of background work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

pub trait Spawner: Send + Sync {
    fn spawn(&self, job: Job);
}

/// Runs jobs on the global rayon pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct RayonSpawner;

impl Spawner for RayonSpawner {
    fn spawn(&self, job: Job) {
        rayon::spawn(job);
    }
}

/// Runs jobs immediately on the calling thread.
///
/// Used by deterministic hosts and tests. Completion delivery is still
/// deferred to the owner's next pump, so ordering guarantees are unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineSpawner;

impl Spawner for InlineSpawner {
    fn spawn(&self, job: Job) {
        job();
    }
}
