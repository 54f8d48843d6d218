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

//! Global hash table (C2/C4): a shared, open-addressed table with chained
//! overflow, sized to hold every distinct key.
//!
//! Each bucket publishes its first occupant through a [`OnceLock`], which
//! gives the same "lock, double-check, init, release-publish" behavior the
//! original's manual `valid` flag + per-bucket lock pair implements, without
//! hand-rolled unsafe memory. Combines against an already-published head or
//! chain cell need no lock at all: they go straight through the flavor's
//! atomic combine primitive.
//!
//! The overflow chain itself is not a pointer chain but indices into a
//! preallocated arena (see [`OverflowArena`]), per the redesign noted
//! against the original's raw-pointer chain: equally correct, and it keeps
//! every type here `Send + Sync` without `unsafe impl`.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::OnceLock;

use parking_lot::Mutex;

use crate::combine::Combine;
use crate::hash::mhash;

const SENTINEL: u32 = u32::MAX;

struct OverflowCell<C: Combine> {
    key: AtomicU64,
    next: AtomicU32,
    state: C::Atomic,
}

/// Bump-allocated pool of overflow cells. Capacity is fixed at construction
/// (see [`crate::config::AggregateConfig::overflow_arena_capacity`]);
/// claiming past capacity is a configuration error surfaced as a panic,
/// since it means the caller under-declared `n_groups`.
struct OverflowArena<C: Combine> {
    cells: Vec<OverflowCell<C>>,
    cursor: AtomicUsize,
}

impl<C: Combine> OverflowArena<C> {
    fn new(capacity: usize, combine: &C) -> Self {
        let cells = (0..capacity)
            .map(|_| OverflowCell {
                key: AtomicU64::new(0),
                next: AtomicU32::new(SENTINEL),
                state: combine.zero_atomic(),
            })
            .collect();
        Self {
            cells,
            cursor: AtomicUsize::new(0),
        }
    }

    fn claim(&self) -> usize {
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed);
        assert!(
            idx < self.cells.len(),
            "overflow arena exhausted: more distinct keys appeared than n_groups allowed for"
        );
        idx
    }

    fn reset(&self) {
        self.cursor.store(0, Ordering::Relaxed);
    }
}

struct GlobalBucket<C: Combine> {
    head: OnceLock<(u64, C::Atomic)>,
    overflow_head: AtomicU32,
    chain_lock: Mutex<()>,
}

impl<C: Combine> GlobalBucket<C> {
    fn new() -> Self {
        Self {
            head: OnceLock::new(),
            overflow_head: AtomicU32::new(SENTINEL),
            chain_lock: Mutex::new(()),
        }
    }
}

pub struct GlobalTable<C: Combine> {
    buckets: Vec<GlobalBucket<C>>,
    arena: OverflowArena<C>,
    log2_buckets: u32,
}

impl<C: Combine> GlobalTable<C> {
    pub fn new(n_buckets: usize, log2_buckets: u32, arena_capacity: usize, combine: &C) -> Self {
        let buckets = (0..n_buckets).map(|_| GlobalBucket::new()).collect();
        Self {
            buckets,
            arena: OverflowArena::new(arena_capacity, combine),
            log2_buckets,
        }
    }

    pub fn n_buckets(&self) -> usize {
        self.buckets.len()
    }

    /// Fold `delta` for `key` into the table. Lock-free except on the very
    /// first insert of a new key into a bucket that already has a
    /// different occupant (which briefly holds that bucket's chain lock to
    /// publish a new cell).
    pub fn upsert(&self, combine: &C, key: u64, delta: C::State) {
        let idx = mhash(key, self.log2_buckets);
        let bucket = &self.buckets[idx];

        let mut seeded = false;
        let (head_key, atomic) = bucket.head.get_or_init(|| {
            seeded = true;
            (key, combine.new_atomic(&delta))
        });

        if *head_key == key {
            if !seeded {
                combine.merge_atomic(atomic, &delta);
            }
            return;
        }

        self.upsert_chain(combine, bucket, key, delta);
    }

    fn upsert_chain(&self, combine: &C, bucket: &GlobalBucket<C>, key: u64, delta: C::State) {
        loop {
            let first = bucket.overflow_head.load(Ordering::Acquire);
            let mut cur = first;
            while cur != SENTINEL {
                let cell = &self.arena.cells[cur as usize];
                if cell.key.load(Ordering::Relaxed) == key {
                    combine.merge_atomic(&cell.state, &delta);
                    return;
                }
                cur = cell.next.load(Ordering::Acquire);
            }

            let _guard = bucket.chain_lock.lock();
            if bucket.overflow_head.load(Ordering::Relaxed) != first {
                continue;
            }

            let new_idx = self.arena.claim();
            let cell = &self.arena.cells[new_idx];
            cell.key.store(key, Ordering::Relaxed);
            combine.store_atomic(&cell.state, &delta);
            cell.next.store(first, Ordering::Relaxed);
            bucket.overflow_head.store(new_idx as u32, Ordering::Release);
            return;
        }
    }

    /// Clears every bucket and the overflow arena. Used by the top-level
    /// `Reset` lifecycle operation to prepare for a fresh `Run`.
    pub fn reset(&mut self) {
        for bucket in &mut self.buckets {
            *bucket = GlobalBucket::new();
        }
        self.arena.reset();
    }

    /// Snapshot of every published entry: `(bucket_index, key, state)`,
    /// walking each bucket's head and overflow chain in chain order.
    pub fn entries(&self, combine: &C) -> Vec<(usize, u64, C::State)> {
        let mut out = Vec::new();
        for (idx, bucket) in self.buckets.iter().enumerate() {
            if let Some((key, atomic)) = bucket.head.get() {
                out.push((idx, *key, combine.load_atomic(atomic)));
            }
            let mut cur = bucket.overflow_head.load(Ordering::Acquire);
            while cur != SENTINEL {
                let cell = &self.arena.cells[cur as usize];
                out.push((idx, cell.key.load(Ordering::Relaxed), combine.load_atomic(&cell.state)));
                cur = cell.next.load(Ordering::Acquire);
            }
        }
        out
    }
}
