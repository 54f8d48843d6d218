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

//! Constants and per-run configuration for the aggregation engine.
//!
//! Every magic number the adaptive strategy depends on lives here, named,
//! rather than scattered through `sampler.rs`/`strategy.rs` as bare
//! literals.

use crate::error::{EngineError, Result};

/// Number of entries in a private-table bucket (the MRU slot array).
pub const PRIVATE_BUCKET_SIZE: usize = 3;

/// Number of buckets in each thread's private table. Fixed: the private
/// table is a small set-associative cache, not something that grows with
/// `n_groups`.
pub const N_PRIVATE_BUCKETS: usize = 512;

/// Number of tuples a partition's sampling pass discards before it starts
/// counting hits.
pub const WARMUP: usize = 2000;

/// Number of tuples a partition's sampling pass measures after warm-up.
pub const SAMPLE_SIZE: usize = 1500;

/// Multiplicative hash constant shared by the global and private tables.
pub const HASH_MULTIPLIER: u64 = 0xB165_38F8_71F2_375D;

/// Above this average run length, the RUNS strategy is chosen outright.
pub const RUN_LENGTH_THRESHOLD: f64 = 8.0 / 7.0;

/// Below this miss rate, HYBRID is preferred over GLOBAL.
pub const MISS_RATE_THRESHOLD: f64 = 0.5;

/// At or above this estimated-benefit sum, HYBRID is preferred over GLOBAL
/// even when the miss rate alone would not justify it.
pub const ESTIMATE_THRESHOLD: f64 = 1.0;

/// Coefficients of the per-bucket access-frequency benefit estimate.
pub const ACCESS_COEFF: f64 = 25.1;
pub const ACCESS_OFFSET: f64 = 3.31;

/// A bucket's access frequency below this cutoff contributes nothing to the
/// benefit estimate.
pub const ACCESS_CUTOFF: f64 = 1.0 / 7.58;

/// Number of top-accessed private buckets considered by the benefit
/// estimate.
pub const TOP_K: usize = 7;

/// Global table buckets are at least this many, regardless of `n_groups`.
pub const MIN_GLOBAL_BUCKETS: usize = 32;

/// Global-table zero-init switches to a parallel pass once the bucket count
/// reaches this size.
pub const PARALLEL_INIT_THRESHOLD: usize = 10_000;

fn log2_ceil(n: usize) -> u32 {
    debug_assert!(n > 0);
    n.next_power_of_two().trailing_zeros()
}

/// Validated, immutable parameters for one [`crate::Aggregate`] run.
///
/// Constructed once by `Create` and shared by reference with every worker
/// thread; nothing here is process-global.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateConfig {
    pub n_threads: usize,
    pub n_tups: usize,
    pub n_groups: usize,
    pub resample_rate: u32,
    pub n_global_buckets: usize,
    pub log2_global_buckets: u32,
    pub log2_private_buckets: u32,
}

impl AggregateConfig {
    pub fn new(
        n_threads: usize,
        n_tups: usize,
        n_groups: usize,
        resample_rate: u32,
    ) -> Result<Self> {
        if n_threads == 0 {
            return Err(EngineError::InvalidThreadCount(n_threads));
        }
        if n_tups == 0 {
            return Err(EngineError::InvalidTupleCount);
        }
        if n_groups == 0 {
            return Err(EngineError::InvalidGroupCount);
        }
        if resample_rate < 1 {
            return Err(EngineError::InvalidResampleRate(resample_rate));
        }

        let n_global_buckets = (2 * n_groups).max(MIN_GLOBAL_BUCKETS).next_power_of_two();
        let log2_global_buckets = log2_ceil(n_global_buckets);
        let log2_private_buckets = log2_ceil(N_PRIVATE_BUCKETS);

        Ok(Self {
            n_threads,
            n_tups,
            n_groups,
            resample_rate,
            n_global_buckets,
            log2_global_buckets,
            log2_private_buckets,
        })
    }

    /// Total number of partitions the dispatcher hands out.
    pub fn n_partitions(&self) -> usize {
        self.n_threads * self.resample_rate as usize
    }

    /// Capacity of the overflow arena: at most `n_groups` keys ever need a
    /// chain cell, since every distinct key beyond a bucket's head needs
    /// exactly one.
    pub fn overflow_arena_capacity(&self) -> usize {
        self.n_groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_inputs() {
        assert_eq!(
            AggregateConfig::new(0, 10, 10, 1),
            Err(EngineError::InvalidThreadCount(0))
        );
        assert_eq!(
            AggregateConfig::new(1, 0, 10, 1),
            Err(EngineError::InvalidTupleCount)
        );
        assert_eq!(
            AggregateConfig::new(1, 10, 0, 1),
            Err(EngineError::InvalidGroupCount)
        );
        assert_eq!(
            AggregateConfig::new(1, 10, 10, 0),
            Err(EngineError::InvalidResampleRate(0))
        );
    }

    #[test]
    fn global_bucket_count_is_power_of_two_and_at_least_double_groups() {
        let cfg = AggregateConfig::new(4, 1 << 20, 100, 2).unwrap();
        assert!(cfg.n_global_buckets.is_power_of_two());
        assert!(cfg.n_global_buckets >= 200);

        let small = AggregateConfig::new(1, 10, 1, 1).unwrap();
        assert_eq!(small.n_global_buckets, MIN_GLOBAL_BUCKETS);
    }
}
