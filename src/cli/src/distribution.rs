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

//! Input-distribution fixtures.
//!
//! The original benchmark loaded pre-generated tuple files from disk; a
//! from-scratch driver has no such fixtures to load, so these generators
//! produce equivalent key distributions in memory instead, seeded for
//! reproducibility.

use clap::ValueEnum;
use groupby_engine::Tuple;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution as _, Zipf};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Distribution {
    /// Every group equally likely.
    Uniform,
    /// Keys non-decreasing; every run is the whole group (best case for
    /// run-collapsing).
    Sorted,
    /// One group dominates most of the input, the rest uniform.
    HeavyHitter,
    /// Uniform choice of group, but each choice is repeated a short
    /// random run length before moving on (a middle ground between
    /// `uniform` and `sorted`).
    RepeatedRuns,
    /// Zipfian: a small number of groups absorb most of the mass, with a
    /// long tail of rare ones.
    Zipf,
    /// Each partition-sized chunk of the input draws from a different,
    /// overlapping subset of the groups, simulating locality that shifts
    /// slowly over the course of the run.
    SelfSimilar,
}

/// Generates `n_tups` tuples over `n_groups` distinct keys, each carrying
/// `arity` `u64` payload values in `1..=100`.
pub fn generate(dist: Distribution, n_tups: usize, n_groups: usize, arity: usize, seed: u64) -> Vec<Tuple> {
    let mut rng = StdRng::seed_from_u64(seed);
    let n_groups_u64 = n_groups as u64;

    let keys: Vec<u64> = match dist {
        Distribution::Uniform => (0..n_tups).map(|_| rng.gen_range(0..n_groups_u64)).collect(),
        Distribution::Sorted => {
            let mut keys: Vec<u64> = (0..n_tups).map(|_| rng.gen_range(0..n_groups_u64)).collect();
            keys.sort_unstable();
            keys
        }
        Distribution::HeavyHitter => {
            let hot = 0u64;
            (0..n_tups)
                .map(|_| {
                    if rng.gen_bool(0.8) {
                        hot
                    } else {
                        rng.gen_range(1..n_groups_u64.max(2))
                    }
                })
                .collect()
        }
        Distribution::RepeatedRuns => {
            let mut keys = Vec::with_capacity(n_tups);
            while keys.len() < n_tups {
                let key = rng.gen_range(0..n_groups_u64);
                let run_len = rng.gen_range(1..=20).min(n_tups - keys.len());
                keys.extend(std::iter::repeat(key).take(run_len));
            }
            keys
        }
        Distribution::Zipf => {
            let zipf = Zipf::new(n_groups_u64.max(1), 1.1).expect("valid zipf parameters");
            (0..n_tups)
                .map(|_| (zipf.sample(&mut rng) as u64 - 1).min(n_groups_u64 - 1))
                .collect()
        }
        Distribution::SelfSimilar => {
            let window = (n_groups / 8).max(1) as u64;
            (0..n_tups)
                .map(|i| {
                    let phase = (i as u64 * window) / n_tups.max(1) as u64;
                    let base = (phase * window) % n_groups_u64;
                    (base + rng.gen_range(0..window)) % n_groups_u64
                })
                .collect()
        }
    };

    keys.into_iter()
        .map(|key| {
            let values = (0..arity).map(|_| rng.gen_range(1..=100)).collect();
            Tuple::new(key, values)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_distribution_produces_the_requested_tuple_count() {
        for dist in [
            Distribution::Uniform,
            Distribution::Sorted,
            Distribution::HeavyHitter,
            Distribution::RepeatedRuns,
            Distribution::Zipf,
            Distribution::SelfSimilar,
        ] {
            let tuples = generate(dist, 5000, 37, 1, 42);
            assert_eq!(tuples.len(), 5000);
            assert!(tuples.iter().all(|t| t.group_key < 37));
        }
    }

    #[test]
    fn sorted_distribution_is_non_decreasing() {
        let tuples = generate(Distribution::Sorted, 2000, 20, 1, 7);
        assert!(tuples.windows(2).all(|w| w[0].group_key <= w[1].group_key));
    }

    #[test]
    fn same_seed_is_reproducible() {
        let a = generate(Distribution::Zipf, 1000, 50, 1, 99);
        let b = generate(Distribution::Zipf, 1000, 50, 1, 99);
        assert_eq!(a, b);
    }
}
