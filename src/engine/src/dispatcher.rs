// Copyright 2026 Groupby Engine Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Partition dispatcher (C9): splits the input into `n_threads *
//! resample_rate` contiguous, equal-size partitions and hands them out to
//! worker threads via a shared atomic counter, so a thread that finishes
//! its partitions early can pick up more instead of idling.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Claims partitions one at a time from a shared counter. `n_partitions`
/// partitions exist, numbered `0..n_partitions`; `next()` returns `None`
/// once they are exhausted.
pub struct PartitionDispatcher {
    next: AtomicUsize,
    n_partitions: usize,
    n_tups: usize,
}

impl PartitionDispatcher {
    pub fn new(n_partitions: usize, n_tups: usize) -> Self {
        Self {
            next: AtomicUsize::new(0),
            n_partitions,
            n_tups,
        }
    }

    /// Atomically claims the next unclaimed partition index, or `None` if
    /// all have been claimed.
    pub fn claim(&self) -> Option<usize> {
        let idx = self.next.fetch_add(1, Ordering::Relaxed);
        (idx < self.n_partitions).then_some(idx)
    }

    /// The tuple range `[start, end)` owned by partition `p`.
    ///
    /// Boundaries are computed as `p * n_tups / n_partitions` in `u64`
    /// arithmetic: the `(double)`-cast floor division the original uses
    /// would be exact here too, but integer math sidesteps any rounding
    /// drift between equivalent floating-point computations on different
    /// platforms.
    pub fn partition_range(&self, p: usize) -> std::ops::Range<usize> {
        let n_tups = self.n_tups as u64;
        let n_partitions = self.n_partitions as u64;
        let start = (p as u64 * n_tups) / n_partitions;
        let end = ((p as u64 + 1) * n_tups) / n_partitions;
        start as usize..end as usize
    }
}
