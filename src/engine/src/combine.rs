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

//! The `Combine` capability: one trait parameterizes the three aggregate
//! flavors (SUM/SUM_OF_SQUARES, MIN/MAX, DISTINCT) so the hash-table and
//! executor code is written once instead of three times.
//!
//! A flavor owns two representations of the same logical state: a plain
//! `State` used by the single-threaded private table, and an `Atomic`
//! representation embedded directly in global-table storage so concurrent
//! threads can combine into it without a lock.

use std::sync::atomic::{AtomicU64, Ordering};

/// A commutative, associative fold over tuple payloads.
///
/// Implementors must make `merge_atomic` safe to call concurrently from
/// many threads against the *same* `Atomic` value without any external
/// synchronization; `merge`/`seed` are only ever called from the thread
/// that owns a private table and need no atomicity at all.
pub trait Combine: Send + Sync + 'static {
    /// Single-threaded accumulator, held by private-table slots.
    type State: Clone + Send + Sync;
    /// Concurrently-combinable accumulator, held by global-table cells.
    type Atomic: Send + Sync;

    /// Number of `u64` payload columns a tuple of this flavor carries.
    fn arity(&self) -> usize;

    /// Fold a single tuple's payload into a fresh accumulator.
    fn seed(&self, values: &[u64]) -> Self::State;

    /// Fold `other` into `state` in place.
    fn merge(&self, state: &mut Self::State, other: &Self::State);

    /// Build a fresh `Atomic` seeded with `state`, for first-time
    /// publication of a global-table cell.
    fn new_atomic(&self, state: &Self::State) -> Self::Atomic;

    /// Build a zeroed `Atomic`, for arena cells pre-allocated ahead of use.
    fn zero_atomic(&self) -> Self::Atomic;

    /// Overwrite an (unpublished, exclusively-owned) zeroed `Atomic` with
    /// `state`. Called once, before the cell's index is published into a
    /// chain; never called concurrently with a read of the same cell.
    fn store_atomic(&self, atomic: &Self::Atomic, state: &Self::State);

    /// Concurrently fold `delta` into `atomic`. May be called by many
    /// threads at once against the same cell.
    fn merge_atomic(&self, atomic: &Self::Atomic, delta: &Self::State);

    /// Snapshot an `Atomic` back into a plain `State`, for `Print`/merge
    /// draining. Not safe to race with a concurrent `merge_atomic` on the
    /// same cell; callers only use this once no other thread can still be
    /// writing (print after `Run`, or while holding the private slot that
    /// is being drained).
    fn load_atomic(&self, atomic: &Self::Atomic) -> Self::State;
}

fn relaxed_vec(n: usize) -> Vec<AtomicU64> {
    (0..n).map(|_| AtomicU64::new(0)).collect()
}

/// SUM / SUM_OF_SQUARES flavor: `arity` columns, each tracking a running
/// count, sum, and sum of squares. Fields wrap on overflow exactly as the
/// original `uint64_t` counters do; this implementation adds no overflow
/// checking that the source did not have.
pub struct SumSquares {
    arity: usize,
}

impl SumSquares {
    pub fn new(arity: usize) -> Self {
        assert!((1..=4).contains(&arity), "SumSquares arity must be 1..=4");
        Self { arity }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SumState {
    pub count: Vec<u64>,
    pub sum: Vec<u64>,
    pub sum_sq: Vec<u64>,
}

pub struct SumAtomic {
    count: Vec<AtomicU64>,
    sum: Vec<AtomicU64>,
    sum_sq: Vec<AtomicU64>,
}

impl Combine for SumSquares {
    type State = SumState;
    type Atomic = SumAtomic;

    fn arity(&self) -> usize {
        self.arity
    }

    fn seed(&self, values: &[u64]) -> Self::State {
        debug_assert_eq!(values.len(), self.arity);
        SumState {
            count: vec![1; self.arity],
            sum: values.to_vec(),
            sum_sq: values.iter().map(|v| v.wrapping_mul(*v)).collect(),
        }
    }

    fn merge(&self, state: &mut Self::State, other: &Self::State) {
        for i in 0..self.arity {
            state.count[i] = state.count[i].wrapping_add(other.count[i]);
            state.sum[i] = state.sum[i].wrapping_add(other.sum[i]);
            state.sum_sq[i] = state.sum_sq[i].wrapping_add(other.sum_sq[i]);
        }
    }

    fn new_atomic(&self, state: &Self::State) -> Self::Atomic {
        SumAtomic {
            count: state.count.iter().map(|v| AtomicU64::new(*v)).collect(),
            sum: state.sum.iter().map(|v| AtomicU64::new(*v)).collect(),
            sum_sq: state.sum_sq.iter().map(|v| AtomicU64::new(*v)).collect(),
        }
    }

    fn zero_atomic(&self) -> Self::Atomic {
        SumAtomic {
            count: relaxed_vec(self.arity),
            sum: relaxed_vec(self.arity),
            sum_sq: relaxed_vec(self.arity),
        }
    }

    fn store_atomic(&self, atomic: &Self::Atomic, state: &Self::State) {
        for i in 0..self.arity {
            atomic.count[i].store(state.count[i], Ordering::Relaxed);
            atomic.sum[i].store(state.sum[i], Ordering::Relaxed);
            atomic.sum_sq[i].store(state.sum_sq[i], Ordering::Relaxed);
        }
    }

    fn merge_atomic(&self, atomic: &Self::Atomic, delta: &Self::State) {
        for i in 0..self.arity {
            atomic.count[i].fetch_add(delta.count[i], Ordering::SeqCst);
            atomic.sum[i].fetch_add(delta.sum[i], Ordering::SeqCst);
            atomic.sum_sq[i].fetch_add(delta.sum_sq[i], Ordering::SeqCst);
        }
    }

    fn load_atomic(&self, atomic: &Self::Atomic) -> Self::State {
        SumState {
            count: atomic.count.iter().map(|a| a.load(Ordering::SeqCst)).collect(),
            sum: atomic.sum.iter().map(|a| a.load(Ordering::SeqCst)).collect(),
            sum_sq: atomic
                .sum_sq
                .iter()
                .map(|a| a.load(Ordering::SeqCst))
                .collect(),
        }
    }
}

/// MIN/MAX flavor: tracks the minimum, maximum, and a second-smallest
/// value (`min_alt`), mirroring the three extrema the original atomic
/// min/max implementation keeps per key.
pub struct MinMax;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinMaxState {
    pub min: u64,
    pub max: u64,
    pub min_alt: u64,
}

pub struct MinMaxAtomic {
    min: AtomicU64,
    max: AtomicU64,
    min_alt: AtomicU64,
}

fn atomic_min(target: &AtomicU64, value: u64) {
    let mut cur = target.load(Ordering::SeqCst);
    while value < cur {
        match target.compare_exchange_weak(cur, value, Ordering::SeqCst, Ordering::SeqCst) {
            Ok(_) => break,
            Err(observed) => cur = observed,
        }
    }
}

fn atomic_max(target: &AtomicU64, value: u64) {
    let mut cur = target.load(Ordering::SeqCst);
    while value > cur {
        match target.compare_exchange_weak(cur, value, Ordering::SeqCst, Ordering::SeqCst) {
            Ok(_) => break,
            Err(observed) => cur = observed,
        }
    }
}

impl Combine for MinMax {
    type State = MinMaxState;
    type Atomic = MinMaxAtomic;

    fn arity(&self) -> usize {
        1
    }

    fn seed(&self, values: &[u64]) -> Self::State {
        debug_assert_eq!(values.len(), 1);
        MinMaxState {
            min: values[0],
            max: values[0],
            min_alt: values[0],
        }
    }

    fn merge(&self, state: &mut Self::State, other: &Self::State) {
        state.min = state.min.min(other.min);
        state.max = state.max.max(other.max);
        state.min_alt = state.min_alt.min(other.min_alt);
    }

    fn new_atomic(&self, state: &Self::State) -> Self::Atomic {
        MinMaxAtomic {
            min: AtomicU64::new(state.min),
            max: AtomicU64::new(state.max),
            min_alt: AtomicU64::new(state.min_alt),
        }
    }

    fn zero_atomic(&self) -> Self::Atomic {
        MinMaxAtomic {
            min: AtomicU64::new(0),
            max: AtomicU64::new(0),
            min_alt: AtomicU64::new(0),
        }
    }

    fn store_atomic(&self, atomic: &Self::Atomic, state: &Self::State) {
        atomic.min.store(state.min, Ordering::Relaxed);
        atomic.max.store(state.max, Ordering::Relaxed);
        atomic.min_alt.store(state.min_alt, Ordering::Relaxed);
    }

    fn merge_atomic(&self, atomic: &Self::Atomic, delta: &Self::State) {
        atomic_min(&atomic.min, delta.min);
        atomic_max(&atomic.max, delta.max);
        atomic_min(&atomic.min_alt, delta.min_alt);
    }

    fn load_atomic(&self, atomic: &Self::Atomic) -> Self::State {
        MinMaxState {
            min: atomic.min.load(Ordering::SeqCst),
            max: atomic.max.load(Ordering::SeqCst),
            min_alt: atomic.min_alt.load(Ordering::SeqCst),
        }
    }
}

/// DISTINCT flavor: presence only, no payload. Combine is a no-op; the
/// mere existence of a published cell for a key is the answer.
pub struct Distinct;

impl Combine for Distinct {
    type State = ();
    type Atomic = ();

    fn arity(&self) -> usize {
        0
    }

    fn seed(&self, _values: &[u64]) {}

    fn merge(&self, _state: &mut (), _other: &()) {}

    fn new_atomic(&self, _state: &()) {}

    fn zero_atomic(&self) {}

    fn store_atomic(&self, _atomic: &(), _state: &()) {}

    fn merge_atomic(&self, _atomic: &(), _delta: &()) {}

    fn load_atomic(&self, _atomic: &()) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_squares_seed_and_merge() {
        let c = SumSquares::new(1);
        let mut s = c.seed(&[3]);
        c.merge(&mut s, &c.seed(&[4]));
        assert_eq!(s.count, vec![2]);
        assert_eq!(s.sum, vec![7]);
        assert_eq!(s.sum_sq, vec![9 + 16]);
    }

    #[test]
    fn sum_squares_atomic_roundtrip() {
        let c = SumSquares::new(2);
        let seed = c.seed(&[5, 6]);
        let atomic = c.new_atomic(&seed);
        c.merge_atomic(&atomic, &c.seed(&[1, 2]));
        let loaded = c.load_atomic(&atomic);
        assert_eq!(loaded.count, vec![2, 2]);
        assert_eq!(loaded.sum, vec![6, 8]);
    }

    #[test]
    fn min_max_tracks_extrema() {
        let c = MinMax;
        let atomic = c.new_atomic(&c.seed(&[10]));
        c.merge_atomic(&atomic, &c.seed(&[3]));
        c.merge_atomic(&atomic, &c.seed(&[50]));
        let loaded = c.load_atomic(&atomic);
        assert_eq!(loaded.min, 3);
        assert_eq!(loaded.max, 50);
    }

    #[test]
    fn distinct_state_is_unit() {
        let c = Distinct;
        let s = c.seed(&[]);
        assert_eq!(s, ());
        let atomic = c.new_atomic(&s);
        c.merge_atomic(&atomic, &s);
    }
}
