//! One-dimensional load partitioning
//!
//! Splits an extent of `load` units among `workers` so that every worker gets
//! either `load / workers` or one more. The remainder goes to the highest ids
//! (reverse round robin), so a lower id never holds more than a higher one.

use alloc::vec::Vec;
use core::ops::Range;

use crate::{ParioError, Result};

/// Compute the half-open range of `[0, load)` owned by worker `id`
///
/// Offsets are computed directly from `id`, so every worker derives its own
/// bounds without knowing anyone else's.
pub fn split_work(load: usize, workers: usize, id: usize) -> Result<Range<usize>> {
    if workers == 0 {
        return Err(ParioError::NoWorkers);
    }
    if id >= workers {
        return Err(ParioError::WorkerOutOfRange { id, workers });
    }
    if load < workers {
        return Err(ParioError::LoadBelowWorkers { load, workers });
    }

    let part = load / workers;
    let rem = load - part * workers;
    let plain = workers - rem;

    if id >= plain {
        // The first `plain` workers hold `part` units each; everyone after
        // holds `part + 1`.
        let wide = part + 1;
        Ok(wide * id - plain..wide * (id + 1) - plain)
    } else {
        Ok(part * id..part * (id + 1))
    }
}

/// Share of every worker in id order
pub fn partition_sizes(load: usize, workers: usize) -> Result<Vec<usize>> {
    (0..workers.max(1))
        .map(|id| split_work(load, workers, id).map(|r| r.len()))
        .collect()
}
