//! Even split with remainder of a global index range across workers.
//! Boundaries only depend on `(global_size, worker_count)`.

use crate::error::*;
use crate::util::*;

/// Half open range `[low, high)` of global indices.
#[derive(Hash, Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct Partition {
    pub low: usize,
    pub high: usize,
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.low, self.high)
    }
}

impl Partition {
    #[inline]
    pub fn new(low: usize, high: usize) -> Self {
        debug_assert!(low <= high);
        Partition { low, high }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.high - self.low
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.low == self.high
    }

    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        index >= self.low && index < self.high
    }

    #[inline]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.low..self.high
    }

    /// Convert a range of units into a range of nodes.
    #[inline]
    pub fn scaled(&self, unit_len: usize) -> Self {
        Partition::new(self.low * unit_len, self.high * unit_len)
    }
}

fn check_workers(worker_count: usize, worker_id: usize) -> HeatResult<()> {
    if worker_count == 0 {
        return Err(HeatError::config("worker count must be positive"));
    }
    if worker_id >= worker_count {
        return Err(HeatError::config(format!(
            "worker id {worker_id} out of range for {worker_count} workers"
        )));
    }
    Ok(())
}

#[inline]
fn split_point(global_size: usize, worker_count: usize, worker_id: usize) -> usize {
    (worker_id as u128 * global_size as u128 / worker_count as u128) as usize
}

/// Range owned by `worker_id`.
/// Sizes over all workers differ by at most one, a worker may own nothing.
pub fn partition(
    global_size: usize,
    worker_count: usize,
    worker_id: usize,
) -> HeatResult<Partition> {
    check_workers(worker_count, worker_id)?;
    Ok(Partition::new(
        split_point(global_size, worker_count, worker_id),
        split_point(global_size, worker_count, worker_id + 1),
    ))
}

/// Ranges of every worker, in worker order.
pub fn partitions(global_size: usize, worker_count: usize) -> HeatResult<Vec<Partition>> {
    (0..worker_count.max(1))
        .map(|w| partition(global_size, worker_count, w))
        .collect()
}

/// Node range of `worker_id` when the mesh is split in whole units,
/// single nodes for chains and rows for grids.
pub fn strip_partition(
    shape: &MeshShape,
    worker_count: usize,
    worker_id: usize,
) -> HeatResult<Partition> {
    Ok(partition(shape.units(), worker_count, worker_id)?.scaled(shape.unit_len()))
}

/// Nearest workers to the left and right that own a non empty range.
/// Both are `None` for a worker that owns nothing.
pub fn active_neighbors(
    global_size: usize,
    worker_count: usize,
    worker_id: usize,
) -> HeatResult<(Option<usize>, Option<usize>)> {
    let parts = partitions(global_size, worker_count)?;
    check_workers(worker_count, worker_id)?;
    if parts[worker_id].is_empty() {
        return Ok((None, None));
    }
    let left = (0..worker_id).rev().find(|w| !parts[*w].is_empty());
    let right = (worker_id + 1..worker_count).find(|w| !parts[*w].is_empty());
    Ok((left, right))
}
