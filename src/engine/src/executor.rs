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

//! Executors (C8): the per-partition tuple-processing loops selected by
//! the strategy chooser. All four take the remainder of a partition
//! (after the sampling window) and drain it into the global table, via
//! the private table where the chosen strategy calls for it.

use crate::combine::Combine;
use crate::global_table::GlobalTable;
use crate::private_table::{PrivateTable, Upsert};
use crate::tuple::Tuple;

/// Every tuple is folded straight into the global table. No private-table
/// traffic at all.
pub fn run_global<C: Combine>(
    global: &GlobalTable<C>,
    combine: &C,
    tuples: &[Tuple],
    start: usize,
    end: usize,
) {
    for tuple in &tuples[start..end] {
        global.upsert(combine, tuple.group_key, combine.seed(&tuple.values));
    }
}

/// Every tuple is folded into the private table first; whatever that
/// eviction pushes out spills into the global table.
pub fn run_hybrid<C: Combine>(
    private: &mut PrivateTable<C>,
    global: &GlobalTable<C>,
    combine: &C,
    tuples: &[Tuple],
    start: usize,
    end: usize,
) {
    for tuple in &tuples[start..end] {
        let delta = combine.seed(&tuple.values);
        if let Upsert::Evicted(key, state) = private.upsert(combine, tuple.group_key, delta) {
            global.upsert(combine, key, state);
        }
    }
}

/// Collapses consecutive equal-key runs locally, flushing each completed
/// run through the private table (and, from there, on to the global table
/// via eviction) rather than touching either table per tuple.
///
/// The accumulator for the *next* run is seeded from the tuple that just
/// changed the key, not the tuple that started the *previous* run — the
/// previous implementation's local variable was seeded from the wrong
/// tuple on a key change; this is the tuple-driven (and correct) version.
pub fn run_runs_over_hybrid<C: Combine>(
    private: &mut PrivateTable<C>,
    global: &GlobalTable<C>,
    combine: &C,
    tuples: &[Tuple],
    start: usize,
    end: usize,
) {
    if start >= end {
        return;
    }
    let mut run_key = tuples[start].group_key;
    let mut run_state = combine.seed(&tuples[start].values);

    for tuple in &tuples[start + 1..end] {
        if tuple.group_key == run_key {
            combine.merge(&mut run_state, &combine.seed(&tuple.values));
        } else {
            flush_run(private, global, combine, run_key, run_state);
            run_key = tuple.group_key;
            run_state = combine.seed(&tuple.values);
        }
    }
    flush_run(private, global, combine, run_key, run_state);
}

/// Same run-collapsing as [`run_runs_over_hybrid`], but flushes each
/// completed run directly to the global table, bypassing the private
/// table entirely.
pub fn run_runs_direct<C: Combine>(
    global: &GlobalTable<C>,
    combine: &C,
    tuples: &[Tuple],
    start: usize,
    end: usize,
) {
    if start >= end {
        return;
    }
    let mut run_key = tuples[start].group_key;
    let mut run_state = combine.seed(&tuples[start].values);

    for tuple in &tuples[start + 1..end] {
        if tuple.group_key == run_key {
            combine.merge(&mut run_state, &combine.seed(&tuple.values));
        } else {
            global.upsert(combine, run_key, run_state);
            run_key = tuple.group_key;
            run_state = combine.seed(&tuple.values);
        }
    }
    global.upsert(combine, run_key, run_state);
}

fn flush_run<C: Combine>(
    private: &mut PrivateTable<C>,
    global: &GlobalTable<C>,
    combine: &C,
    key: u64,
    state: C::State,
) {
    if let Upsert::Evicted(evicted_key, evicted_state) = private.upsert(combine, key, state) {
        global.upsert(combine, evicted_key, evicted_state);
    }
}
