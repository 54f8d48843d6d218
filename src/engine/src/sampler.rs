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

//! Sampling probe (C6): runs a partition's first `WARMUP + SAMPLE_SIZE`
//! tuples through a private table to estimate how well this partition's
//! key distribution would respond to caching and run-collapsing, before
//! committing to an execution strategy for the rest of the partition.

use crate::combine::Combine;
use crate::config::{SAMPLE_SIZE, TOP_K, WARMUP};
use crate::private_table::{PrivateTable, Upsert};
use crate::tuple::Tuple;

/// Statistics gathered by one sampling pass, feeding directly into the
/// strategy chooser's thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleStats {
    pub hits: usize,
    pub runs: usize,
    pub miss_rate: f64,
    pub avg_run_length: f64,
}

/// Runs the sample over `tuples[start..start + WARMUP + SAMPLE_SIZE]`
/// (clamped to the partition's own `end`), folding every tuple into
/// `private` exactly as the real executors would. Hits are only counted
/// once warm-up has passed; run-boundary counting spans the whole sampled
/// range, matching the strategy chooser's "one continuous window" framing.
pub fn sample<C: Combine>(
    private: &mut PrivateTable<C>,
    combine: &C,
    tuples: &[Tuple],
    start: usize,
    end: usize,
) -> SampleStats {
    let warmup_end = (start + WARMUP).min(end);
    let sample_end = (warmup_end + SAMPLE_SIZE).min(end);

    let mut runs = 1usize;
    let mut hits = 0usize;
    let mut prev_key: Option<u64> = None;

    for (offset, tuple) in tuples[start..sample_end].iter().enumerate() {
        if let Some(pk) = prev_key {
            if pk != tuple.group_key {
                runs += 1;
            }
        }
        prev_key = Some(tuple.group_key);

        let delta = combine.seed(&tuple.values);
        let outcome = private.upsert(combine, tuple.group_key, delta);
        let in_sample_window = start + offset >= warmup_end;
        if in_sample_window && matches!(outcome, Upsert::Hit) {
            hits += 1;
        }
    }

    let sampled_len = sample_end.saturating_sub(start);
    let measured_len = sample_end.saturating_sub(warmup_end).max(1);

    SampleStats {
        hits,
        runs,
        miss_rate: (measured_len.saturating_sub(hits)) as f64 / measured_len as f64,
        avg_run_length: sampled_len as f64 / runs as f64,
    }
}

/// The `TOP_K` largest per-bucket access counts observed across `private`,
/// descending, padded with zeros if the table has fewer than `TOP_K`
/// buckets (it never does in practice, but the chooser does not care).
pub fn top_access_counts<C: Combine>(private: &PrivateTable<C>) -> Vec<u32> {
    let mut counts: Vec<u32> = private.access_counts().collect();
    counts.sort_unstable_by(|a, b| b.cmp(a));
    counts.truncate(TOP_K);
    while counts.len() < TOP_K {
        counts.push(0);
    }
    counts
}
