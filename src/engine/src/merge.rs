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

//! Parallel merge (C10): drains every thread's private table into the
//! global table after `Run` completes, so GLOBAL-decided partitions and
//! HYBRID/RUNS-decided partitions end up in the same place.
//!
//! Thread `t` of `n_threads` owns bucket range
//! `[t * n_buckets / n_threads, (t + 1) * n_buckets / n_threads)` across
//! *every* thread's private table, not just its own — each private
//! table's bucket slice is split into `n_threads` disjoint sub-slices with
//! `split_at_mut` so merge workers touch genuinely non-overlapping memory
//! and need no locking between them.

use crate::combine::Combine;
use crate::global_table::GlobalTable;
use crate::private_table::{drain_bucket_slice, split_by_ranges, PrivateTable};

/// The bucket-index range thread `t` (of `n_threads`) is responsible for
/// draining from every private table.
pub fn merge_range(t: usize, n_threads: usize, n_buckets: usize) -> std::ops::Range<usize> {
    let start = (t * n_buckets) / n_threads;
    let end = ((t + 1) * n_buckets) / n_threads;
    start..end
}

/// Runs the parallel merge: spawns `n_threads` scoped workers, each
/// draining its assigned bucket range out of every table in `privates`
/// and folding the results into `global`.
pub fn run<C: Combine>(
    privates: &mut [&mut PrivateTable<C>],
    global: &GlobalTable<C>,
    combine: &C,
    n_threads: usize,
) {
    if privates.is_empty() || n_threads == 0 {
        return;
    }

    // For every table, split its bucket slice into n_threads ranges at
    // the merge-range boundaries, then transpose so each merge worker
    // holds one slice per table instead of one table's worth of slices.
    let mut per_table_slices: Vec<_> = privates
        .iter_mut()
        .map(|p| split_by_ranges(p.buckets_mut(), n_threads))
        .collect();

    let mut per_thread: Vec<Vec<_>> = (0..n_threads).map(|_| Vec::new()).collect();
    for table_slices in &mut per_table_slices {
        for (t, chunk) in table_slices.drain(..).enumerate() {
            per_thread[t].push(chunk);
        }
    }

    std::thread::scope(|scope| {
        for chunks in per_thread {
            let global = &*global;
            scope.spawn(move || {
                for chunk in chunks {
                    for (key, state) in drain_bucket_slice(chunk) {
                        global.upsert(combine, key, state);
                    }
                }
            });
        }
    });
}
