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

//! Lifecycle (C11): `Aggregate<C>` wires the hash tables, dispatcher,
//! sampler, strategy chooser and executors into the `Create` / `Run` /
//! `Merge` / `Reset` / `Print` / `MissRate` interface.
//!
//! There is no explicit `Destroy`: everything here is owned, plain Rust
//! data (no raw allocations, no OS handles), so `Drop` already does what
//! the original's explicit free-everything call did. This is the one
//! place the lifecycle intentionally departs from the original shape; see
//! the design notes for the reasoning.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::combine::Combine;
use crate::config::{AggregateConfig, SAMPLE_SIZE, WARMUP};
use crate::dispatcher::PartitionDispatcher;
use crate::error::{EngineError, Result};
use crate::executor::{run_global, run_hybrid, run_runs_over_hybrid};
use crate::global_table::GlobalTable;
use crate::merge;
use crate::private_table::PrivateTable;
use crate::sampler::{sample, top_access_counts};
use crate::strategy::{choose, Strategy};
use crate::tuple::Tuple;

/// An adaptive parallel group-by aggregation run for one aggregate
/// flavor `C`.
pub struct Aggregate<C: Combine> {
    config: AggregateConfig,
    combine: C,
    global: GlobalTable<C>,
    /// One table per thread, each behind its own lock so worker threads
    /// never contend with each other — only `thread_id` ever locks
    /// `privates[thread_id]` during `Run`.
    privates: Vec<Mutex<PrivateTable<C>>>,
    /// Each thread's most recently observed sample hit count. Overwritten
    /// every partition a thread samples, not accumulated across
    /// partitions — `MissRate` reflects each thread's latest sample, the
    /// same accounting the original's per-thread `hits` array keeps.
    last_sample_hits: Vec<AtomicUsize>,
    /// `false` for the DISTINCT flavor: no private-table benefit to
    /// estimate, so the chooser picks only between RUNS and GLOBAL.
    allow_hybrid: bool,
}

impl<C: Combine> Aggregate<C> {
    /// `Create`: validates configuration and allocates the global table,
    /// one private table per thread, and per-thread sampling bookkeeping.
    pub fn new(
        combine: C,
        n_threads: usize,
        n_tups: usize,
        n_groups: usize,
        resample_rate: u32,
        allow_hybrid: bool,
    ) -> Result<Self> {
        let config = AggregateConfig::new(n_threads, n_tups, n_groups, resample_rate)?;
        let global = GlobalTable::new(
            config.n_global_buckets,
            config.log2_global_buckets,
            config.overflow_arena_capacity(),
            &combine,
        );
        let privates = (0..n_threads)
            .map(|_| Mutex::new(PrivateTable::new(config.log2_private_buckets)))
            .collect();
        let last_sample_hits = (0..n_threads).map(|_| AtomicUsize::new(0)).collect();

        Ok(Self {
            config,
            combine,
            global,
            privates,
            last_sample_hits,
            allow_hybrid,
        })
    }

    pub fn config(&self) -> &AggregateConfig {
        &self.config
    }

    /// `Run`: dispatches `n_threads * resample_rate` partitions across
    /// `n_threads` worker threads. Each partition is sampled, a strategy
    /// is chosen for it, and its remaining tuples are folded in
    /// accordingly. Threads that exhaust the dispatcher's queue simply
    /// stop; there is no barrier between them.
    ///
    /// Validates every tuple's payload arity against the flavor's
    /// `Combine::arity()` once, up front, so a caller-supplied tuple array
    /// that does not match the active flavor fails with a configuration
    /// error here rather than panicking deep inside an atomic combine loop.
    pub fn run(&self, tuples: &[Tuple]) -> Result<()> {
        assert_eq!(tuples.len(), self.config.n_tups, "tuple count does not match Create");
        let expected = self.combine.arity();
        for (index, tuple) in tuples.iter().enumerate() {
            if tuple.values.len() != expected {
                return Err(EngineError::ArityMismatch {
                    index,
                    expected,
                    got: tuple.values.len(),
                });
            }
        }

        let dispatcher = PartitionDispatcher::new(self.config.n_partitions(), self.config.n_tups);

        std::thread::scope(|scope| {
            for thread_id in 0..self.config.n_threads {
                let dispatcher = &dispatcher;
                scope.spawn(move || self.run_worker(thread_id, tuples, dispatcher));
            }
        });
        Ok(())
    }

    fn run_worker(&self, thread_id: usize, tuples: &[Tuple], dispatcher: &PartitionDispatcher) {
        while let Some(partition) = dispatcher.claim() {
            let range = dispatcher.partition_range(partition);
            if range.start >= range.end {
                continue;
            }

            let mut private = self.privates[thread_id].lock();
            let private = &mut *private;
            private.reset_sampling_stats();

            let stats = sample(private, &self.combine, tuples, range.start, range.end);
            let top = top_access_counts(private);
            self.last_sample_hits[thread_id].store(stats.hits, Ordering::Relaxed);
            let strategy = choose(&stats, &top, self.allow_hybrid);

            let sample_end = (range.start + WARMUP + SAMPLE_SIZE).min(range.end);
            tracing::debug!(
                thread_id,
                partition,
                ?strategy,
                avg_run_length = stats.avg_run_length,
                miss_rate = stats.miss_rate,
                "chose partition strategy"
            );

            match strategy {
                Strategy::Global => run_global(&self.global, &self.combine, tuples, sample_end, range.end),
                Strategy::Hybrid => {
                    run_hybrid(private, &self.global, &self.combine, tuples, sample_end, range.end)
                }
                Strategy::Runs => run_runs_over_hybrid(
                    private,
                    &self.global,
                    &self.combine,
                    tuples,
                    sample_end,
                    range.end,
                ),
            }
        }
    }

    /// `Merge`: drains every thread's private table into the global
    /// table in parallel.
    pub fn merge(&mut self) {
        let mut tables: Vec<&mut PrivateTable<C>> =
            self.privates.iter_mut().map(|m| m.get_mut()).collect();
        merge::run(&mut tables, &self.global, &self.combine, self.config.n_threads);
    }

    /// `Reset`: clears the global table and every private table (data and
    /// sampling statistics alike), preparing for a fresh `Run`.
    pub fn reset(&mut self) {
        self.global.reset();
        for private in self.privates.iter_mut() {
            private.get_mut().reset_full();
        }
        for hits in &self.last_sample_hits {
            hits.store(0, Ordering::Relaxed);
        }
    }

    /// `Print`: one line per published global-table entry, in
    /// `bucket<TAB>key<TAB>...` order. Only meaningful after a `Merge` has
    /// drained outstanding private-table state; entries still sitting in
    /// a private table (strategy HYBRID/RUNS, not yet merged) will not
    /// appear.
    pub fn print(&self) -> Vec<(usize, u64, C::State)> {
        self.global.entries(&self.combine)
    }

    /// `MissRate`: `(SAMPLE_SIZE * n_threads - sum(last_sample_hits)) /
    /// (SAMPLE_SIZE * n_threads)`, i.e. the overall fraction of sampled
    /// tuples that missed the private cache, using each thread's most
    /// recently sampled partition.
    pub fn miss_rate(&self) -> f64 {
        let total_hits: usize = self
            .last_sample_hits
            .iter()
            .map(|h| h.load(Ordering::Relaxed))
            .sum();
        let denom = (SAMPLE_SIZE * self.config.n_threads) as f64;
        (denom - total_hits as f64) / denom
    }

    pub fn combine(&self) -> &C {
        &self.combine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combine::{Distinct, SumSquares};
    use rand::Rng;

    fn uniform_tuples(n: usize, n_groups: u64) -> Vec<Tuple> {
        let mut rng = rand::thread_rng();
        (0..n)
            .map(|_| Tuple::new(rng.gen_range(0..n_groups), vec![1]))
            .collect()
    }

    #[test]
    fn end_to_end_preserves_total_count() {
        let n_tups = 50_000;
        let n_groups = 200;
        let combine = SumSquares::new(1);
        let mut agg = Aggregate::new(combine, 4, n_tups, n_groups, 2, true).unwrap();
        let tuples = uniform_tuples(n_tups, n_groups as u64);

        agg.run(&tuples).unwrap();
        agg.merge();

        let entries = agg.print();
        let total_count: u64 = entries.iter().map(|e| e.2.count.iter().sum::<u64>()).sum();
        assert_eq!(total_count, n_tups as u64);

        let distinct_groups: std::collections::HashSet<u64> =
            entries.iter().map(|e| e.1).collect();
        assert!(distinct_groups.len() <= n_groups);
    }

    #[test]
    fn matches_naive_reference_aggregation() {
        let n_tups = 20_000;
        let n_groups = 64u64;
        let combine = SumSquares::new(1);
        let mut agg = Aggregate::new(combine, 3, n_tups, n_groups as usize, 3, true).unwrap();
        let tuples = uniform_tuples(n_tups, n_groups);

        let mut reference = std::collections::HashMap::new();
        for t in &tuples {
            let entry = reference.entry(t.group_key).or_insert((0u64, 0u64));
            entry.0 += 1;
            entry.1 += t.values[0];
        }

        agg.run(&tuples).unwrap();
        agg.merge();

        for (_, key, state) in agg.print() {
            let (count, sum) = reference[&key];
            assert_eq!(state.count[0], count);
            assert_eq!(state.sum[0], sum);
        }
        assert_eq!(agg.print().len(), reference.len());
    }

    #[test]
    fn distinct_flavor_disables_hybrid() {
        let n_tups = 5_000;
        let n_groups = 50usize;
        let combine = Distinct;
        let mut agg = Aggregate::new(combine, 2, n_tups, n_groups, 1, false).unwrap();
        let tuples = uniform_tuples(n_tups, n_groups as u64);
        agg.run(&tuples).unwrap();
        agg.merge();
        let distinct: std::collections::HashSet<u64> = agg.print().into_iter().map(|e| e.1).collect();
        assert!(distinct.len() <= n_groups);
    }

    #[test]
    fn reset_allows_a_second_independent_run() {
        let n_tups = 10_000;
        let n_groups = 30usize;
        let combine = SumSquares::new(1);
        let mut agg = Aggregate::new(combine, 2, n_tups, n_groups, 1, true).unwrap();
        let tuples = uniform_tuples(n_tups, n_groups as u64);

        agg.run(&tuples).unwrap();
        agg.merge();
        assert!(!agg.print().is_empty());

        agg.reset();
        assert!(agg.print().is_empty());
        assert_eq!(agg.miss_rate(), 1.0);

        agg.run(&tuples).unwrap();
        agg.merge();
        assert!(!agg.print().is_empty());
    }

    #[test]
    fn sorted_input_favors_runs_and_still_preserves_counts() {
        let n_groups = 40u64;
        let mut tuples = Vec::new();
        for g in 0..n_groups {
            for _ in 0..2000 {
                tuples.push(Tuple::new(g, vec![1]));
            }
        }
        let n_tups = tuples.len();
        let combine = SumSquares::new(1);
        let mut agg = Aggregate::new(combine, 4, n_tups, n_groups as usize, 1, true).unwrap();

        agg.run(&tuples).unwrap();
        agg.merge();

        let total_count: u64 = agg.print().iter().map(|e| e.2.count[0]).sum();
        assert_eq!(total_count, n_tups as u64);
    }

    #[test]
    fn run_rejects_a_tuple_whose_arity_does_not_match_the_flavor() {
        let combine = SumSquares::new(2);
        let n_tups = 4;
        let mut agg = Aggregate::new(combine, 1, n_tups, 2, 1, true).unwrap();
        let tuples = vec![
            Tuple::new(0, vec![1, 2]),
            Tuple::new(1, vec![3, 4]),
            Tuple::new(0, vec![5]),
            Tuple::new(1, vec![6, 7]),
        ];

        let err = agg.run(&tuples).unwrap_err();
        assert_eq!(
            err,
            crate::error::EngineError::ArityMismatch {
                index: 2,
                expected: 2,
                got: 1,
            }
        );
    }
}
