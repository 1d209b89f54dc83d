//! Collective runtime handles
//!
//! Every process group, file and channel is handed a [`Communicator`]
//! explicitly instead of reaching for ambient global state. Collective calls
//! block until every member of the group has issued the matching call.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};

use pario_core::ParioError;

use crate::Result;

/// Minimal collective capability needed by decomposition-aware I/O
pub trait Communicator: fmt::Debug {
    /// Zero-based id of the calling worker
    fn rank(&self) -> usize;

    /// Number of workers in the group
    fn size(&self) -> usize;

    /// Block until every worker has arrived
    fn barrier(&self);

    /// Collective logical AND of `local` over the group
    ///
    /// Every worker receives the same answer, which lets a local failure be
    /// turned into a group-wide one.
    fn all_true(&self, local: bool) -> bool;
}

/// Group consisting of the calling worker alone
#[derive(Debug, Clone, Copy, Default)]
pub struct SelfComm;

impl Communicator for SelfComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn barrier(&self) {}

    fn all_true(&self, local: bool) -> bool {
        local
    }
}

struct Shared {
    size: usize,
    barrier: Barrier,
    failed: AtomicBool,
}

/// One member of an in-process group of OS threads
///
/// Handles are `Send + Sync`, so each can be moved onto its own thread.
#[derive(Clone)]
pub struct ThreadComm {
    rank: usize,
    shared: Arc<Shared>,
}

impl fmt::Debug for ThreadComm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadComm")
            .field("rank", &self.rank)
            .field("size", &self.shared.size)
            .finish()
    }
}

impl ThreadComm {
    /// Create the handles of a `size`-worker group, one per thread
    pub fn group(size: usize) -> Result<Vec<ThreadComm>> {
        if size == 0 {
            return Err(ParioError::NoWorkers.into());
        }
        let shared = Arc::new(Shared {
            size,
            barrier: Barrier::new(size),
            failed: AtomicBool::new(false),
        });
        Ok((0..size)
            .map(|rank| ThreadComm {
                rank,
                shared: Arc::clone(&shared),
            })
            .collect())
    }

    /// Run `worker` on `size` scoped threads, one per rank, and collect the
    /// results in rank order
    ///
    /// A panicking worker is re-raised on the caller once all threads finish.
    pub fn run<F, R>(size: usize, worker: F) -> Result<Vec<R>>
    where
        F: Fn(ThreadComm) -> R + Sync,
        R: Send,
    {
        let comms = Self::group(size)?;
        let worker = &worker;
        Ok(std::thread::scope(|scope| {
            let handles: Vec<_> = comms
                .into_iter()
                .map(|comm| scope.spawn(move || worker(comm)))
                .collect();
            handles
                .into_iter()
                .map(|h| match h.join() {
                    Ok(r) => r,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        }))
    }
}

impl Communicator for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.size
    }

    fn barrier(&self) {
        self.shared.barrier.wait();
    }

    fn all_true(&self, local: bool) -> bool {
        if !local {
            self.shared.failed.store(true, Ordering::SeqCst);
        }
        self.shared.barrier.wait();
        let agreed = !self.shared.failed.load(Ordering::SeqCst);
        // Everyone has read the flag before the leader resets it
        if self.shared.barrier.wait().is_leader() {
            self.shared.failed.store(false, Ordering::SeqCst);
        }
        self.shared.barrier.wait();
        agreed
    }
}
