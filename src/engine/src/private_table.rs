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

//! Per-thread private table (C3/C5): a small, set-associative LRU cache
//! with no synchronization at all, since each thread owns exactly one.
//!
//! Collapses repeated keys locally before they ever reach the shared
//! global table, and doubles as the sampling probe's data structure
//! (`sampler.rs` drives the same `upsert` through its warm-up/measure
//! passes).

use crate::combine::Combine;
use crate::config::{N_PRIVATE_BUCKETS, PRIVATE_BUCKET_SIZE};
use crate::hash::mhash;

type Slot<C> = Option<(u64, <C as Combine>::State)>;

pub(crate) struct PrivateBucket<C: Combine> {
    slots: [Slot<C>; PRIVATE_BUCKET_SIZE],
    access_count: u32,
}

impl<C: Combine> PrivateBucket<C> {
    fn empty() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
            access_count: 0,
        }
    }
}

/// Outcome of folding one key/state pair into the private table.
pub enum Upsert<C: Combine> {
    /// The key already occupied a slot; its state absorbed the delta.
    Hit,
    /// The key took a previously-empty slot.
    Inserted,
    /// The bucket was full; the LRU slot was evicted to make room.
    Evicted(u64, C::State),
}

pub struct PrivateTable<C: Combine> {
    buckets: Vec<PrivateBucket<C>>,
    log2_buckets: u32,
}

impl<C: Combine> PrivateTable<C> {
    pub fn new(log2_buckets: u32) -> Self {
        Self {
            buckets: (0..N_PRIVATE_BUCKETS).map(|_| PrivateBucket::empty()).collect(),
            log2_buckets,
        }
    }

    /// Fold `(key, delta)` into the table, evicting the bucket's LRU slot
    /// if it is full and the key is new. Bumps that bucket's access
    /// counter unconditionally, matching the original sampler's
    /// "every probe counts" accounting.
    pub fn upsert(&mut self, combine: &C, key: u64, delta: C::State) -> Upsert<C> {
        let idx = mhash(key, self.log2_buckets);
        let bucket = &mut self.buckets[idx];
        bucket.access_count += 1;

        let mut j = 0;
        while j < PRIVATE_BUCKET_SIZE {
            match &bucket.slots[j] {
                Some((k, _)) if *k == key => break,
                None => break,
                _ => j += 1,
            }
        }

        if j < PRIVATE_BUCKET_SIZE {
            match &mut bucket.slots[j] {
                Some((_, state)) => {
                    combine.merge(state, &delta);
                    Upsert::Hit
                }
                slot @ None => {
                    *slot = Some((key, delta));
                    Upsert::Inserted
                }
            }
        } else {
            let (evicted_key, evicted_state) =
                bucket.slots[PRIVATE_BUCKET_SIZE - 1].take().expect("full bucket has no empty slot");
            for k in (1..PRIVATE_BUCKET_SIZE).rev() {
                bucket.slots[k] = bucket.slots[k - 1].take();
            }
            bucket.slots[0] = Some((key, delta));
            Upsert::Evicted(evicted_key, evicted_state)
        }
    }

    /// Drains every valid slot across the bucket-index range `[start, end)`,
    /// leaving the table empty there. Used by the parallel merge phase,
    /// which partitions private-table bucket ranges across threads.
    pub fn drain_range(&mut self, range: std::ops::Range<usize>) -> Vec<(u64, C::State)> {
        let mut out = Vec::new();
        for bucket in &mut self.buckets[range] {
            for slot in &mut bucket.slots {
                if let Some((key, state)) = slot.take() {
                    out.push((key, state));
                }
            }
        }
        out
    }

    pub fn n_buckets(&self) -> usize {
        self.buckets.len()
    }

    /// Exposes the raw bucket slice so the parallel merge phase can split
    /// it into disjoint, independently-drainable sub-ranges with
    /// `split_at_mut` instead of locking the whole table per merge thread.
    pub(crate) fn buckets_mut(&mut self) -> &mut [PrivateBucket<C>] {
        &mut self.buckets
    }

    pub fn access_counts(&self) -> impl Iterator<Item = u32> + '_ {
        self.buckets.iter().map(|b| b.access_count)
    }

    /// Resets only the sampling access counters, leaving accumulated slot
    /// data untouched. This is what the original's per-partition reset
    /// does: the private cache's real contents persist across partitions,
    /// only the sampler's bookkeeping is cleared.
    pub fn reset_sampling_stats(&mut self) {
        for bucket in &mut self.buckets {
            bucket.access_count = 0;
        }
    }

    /// Fully clears both data and sampling statistics. Used by the
    /// top-level `Reset` lifecycle operation.
    pub fn reset_full(&mut self) {
        for bucket in &mut self.buckets {
            *bucket = PrivateBucket::empty();
        }
    }
}

/// Drains every valid slot out of an arbitrary bucket slice, independent of
/// which [`PrivateTable`] it came from. Used by the parallel merge, which
/// splits each thread's private table into disjoint bucket-range slices
/// with `split_at_mut` and hands one slice per table to each merge worker.
pub(crate) fn drain_bucket_slice<C: Combine>(buckets: &mut [PrivateBucket<C>]) -> Vec<(u64, C::State)> {
    let mut out = Vec::new();
    for bucket in buckets {
        for slot in &mut bucket.slots {
            if let Some((key, state)) = slot.take() {
                out.push((key, state));
            }
        }
    }
    out
}

/// Splits `slice` into `n_parts` contiguous, disjoint mutable chunks at
/// the same `i * len / n_parts` boundaries the merge-range assignment
/// uses, so a chunk index lines up with a merge-thread index.
pub(crate) fn split_by_ranges<T>(mut slice: &mut [T], n_parts: usize) -> Vec<&mut [T]> {
    let total = slice.len();
    let mut out = Vec::with_capacity(n_parts);
    let mut prev_boundary = 0usize;
    for i in 0..n_parts {
        let boundary = ((i + 1) * total) / n_parts;
        let (left, right) = slice.split_at_mut(boundary - prev_boundary);
        out.push(left);
        slice = right;
        prev_boundary = boundary;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combine::SumSquares;

    #[test]
    fn fills_then_evicts_lru_slot() {
        let combine = SumSquares::new(1);
        let mut table = PrivateTable::<SumSquares>::new(9);
        // Force all keys into the same bucket by using a fixed private-table
        // index: 0 maps deterministically regardless of the hash constant.
        let idx = 0usize;
        // Reach into the bucket via repeated upserts of keys that hash to it;
        // instead of searching for colliding keys, drive the bucket directly
        // through enough distinct keys to guarantee a collision via pigeonhole.
        let mut seen_evict = false;
        for key in 0..4000u64 {
            if let Upsert::Evicted(_, _) = table.upsert(&combine, key, combine.seed(&[1])) {
                seen_evict = true;
            }
        }
        assert!(seen_evict, "expected at least one eviction across many keys");
        let _ = idx;
    }

    #[test]
    fn hit_merges_into_existing_slot() {
        let combine = SumSquares::new(1);
        let mut table = PrivateTable::<SumSquares>::new(9);
        matches!(table.upsert(&combine, 42, combine.seed(&[1])), Upsert::Inserted);
        match table.upsert(&combine, 42, combine.seed(&[1])) {
            Upsert::Hit => {}
            _ => panic!("expected hit"),
        }
    }

    #[test]
    fn reset_sampling_stats_keeps_data() {
        let combine = SumSquares::new(1);
        let mut table = PrivateTable::<SumSquares>::new(9);
        table.upsert(&combine, 1, combine.seed(&[5]));
        table.reset_sampling_stats();
        assert!(table.access_counts().all(|c| c == 0));
        let drained = table.drain_range(0..table.n_buckets());
        assert_eq!(drained.len(), 1);
    }

    #[test]
    fn split_by_ranges_tiles_without_overlap() {
        let mut v = vec![1, 2, 3, 4, 5, 6, 7];
        let chunks = split_by_ranges(&mut v, 3);
        let total: usize = chunks.iter().map(|c| c.len()).sum();
        assert_eq!(total, 7);
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn reset_full_clears_data() {
        let combine = SumSquares::new(1);
        let mut table = PrivateTable::<SumSquares>::new(9);
        table.upsert(&combine, 1, combine.seed(&[5]));
        table.reset_full();
        let drained = table.drain_range(0..table.n_buckets());
        assert!(drained.is_empty());
    }
}
