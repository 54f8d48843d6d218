//! End-to-end scenarios exercising the full `Create` -> `Run` -> `Merge`
//! -> `Print`/`MissRate` lifecycle across representative input shapes.

use std::collections::HashMap;

use groupby_engine::{Aggregate, Distinct, MinMax, SumSquares};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn uniform(n_tups: usize, n_groups: u64, seed: u64) -> Vec<groupby_engine::Tuple> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n_tups)
        .map(|_| groupby_engine::Tuple::new(rng.gen_range(0..n_groups), vec![rng.gen_range(1..=50)]))
        .collect()
}

fn sorted(n_groups: u64, per_group: usize) -> Vec<groupby_engine::Tuple> {
    let mut out = Vec::new();
    for g in 0..n_groups {
        for _ in 0..per_group {
            out.push(groupby_engine::Tuple::new(g, vec![1]));
        }
    }
    out
}

fn heavy_hitter(n_tups: usize, n_groups: u64, seed: u64) -> Vec<groupby_engine::Tuple> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n_tups)
        .map(|_| {
            let key = if rng.gen_bool(0.9) { 0 } else { rng.gen_range(1..n_groups) };
            groupby_engine::Tuple::new(key, vec![1])
        })
        .collect()
}

fn repeated_runs(n_tups: usize, n_groups: u64, seed: u64) -> Vec<groupby_engine::Tuple> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(n_tups);
    while out.len() < n_tups {
        let key = rng.gen_range(0..n_groups);
        let run_len = rng.gen_range(1..=15).min(n_tups - out.len());
        out.extend(std::iter::repeat(groupby_engine::Tuple::new(key, vec![1])).take(run_len));
    }
    out
}

fn naive_sum_reference(tuples: &[groupby_engine::Tuple]) -> HashMap<u64, (u64, u64)> {
    let mut reference = HashMap::new();
    for t in tuples {
        let entry = reference.entry(t.group_key).or_insert((0u64, 0u64));
        entry.0 += 1;
        entry.1 += t.values[0];
    }
    reference
}

#[test]
fn scenario_uniform_small_cluster() {
    let tuples = uniform(60_000, 500, 1);
    let mut agg = Aggregate::new(SumSquares::new(1), 4, tuples.len(), 500, 2, true).unwrap();
    let reference = naive_sum_reference(&tuples);

    agg.run(&tuples).unwrap();
    agg.merge();

    let entries = agg.print();
    assert_eq!(entries.len(), reference.len());
    for (_, key, state) in &entries {
        let (count, sum) = reference[key];
        assert_eq!(state.count[0], count);
        assert_eq!(state.sum[0], sum);
    }
}

#[test]
fn scenario_sorted_single_worker_is_one_big_run() {
    let tuples = sorted(30, 5000);
    let n_tups = tuples.len();
    let mut agg = Aggregate::new(SumSquares::new(1), 3, n_tups, 30, 1, true).unwrap();

    agg.run(&tuples).unwrap();
    agg.merge();

    let entries = agg.print();
    assert_eq!(entries.len(), 30);
    let total_count: u64 = entries.iter().map(|e| e.2.count[0]).sum();
    assert_eq!(total_count, n_tups as u64);
}

#[test]
fn scenario_heavy_hitter_dominant_key_survives_eviction_pressure() {
    let tuples = heavy_hitter(80_000, 2000, 2);
    let reference = naive_sum_reference(&tuples);
    let mut agg = Aggregate::new(SumSquares::new(1), 4, tuples.len(), 2000, 2, true).unwrap();

    agg.run(&tuples).unwrap();
    agg.merge();

    let entries = agg.print();
    let hot = entries.iter().find(|e| e.1 == 0).expect("hot key must survive");
    assert_eq!(hot.2.count[0], reference[&0].0);
    let total_count: u64 = entries.iter().map(|e| e.2.count[0]).sum();
    assert_eq!(total_count, tuples.len() as u64);
}

#[test]
fn scenario_repeated_runs_preserves_every_tuple() {
    let tuples = repeated_runs(70_000, 300, 3);
    let reference = naive_sum_reference(&tuples);
    let mut agg = Aggregate::new(SumSquares::new(1), 4, tuples.len(), 300, 3, true).unwrap();

    agg.run(&tuples).unwrap();
    agg.merge();

    let entries = agg.print();
    assert_eq!(entries.len(), reference.len());
    let total_count: u64 = entries.iter().map(|e| e.2.count[0]).sum();
    assert_eq!(total_count, tuples.len() as u64);
}

#[test]
fn scenario_min_max_flavor_matches_reference_extrema() {
    let tuples = uniform(40_000, 400, 5);
    let mut reference: HashMap<u64, (u64, u64)> = HashMap::new();
    for t in &tuples {
        let entry = reference.entry(t.group_key).or_insert((u64::MAX, 0));
        entry.0 = entry.0.min(t.values[0]);
        entry.1 = entry.1.max(t.values[0]);
    }

    let mut agg = Aggregate::new(MinMax, 4, tuples.len(), 400, 2, true).unwrap();
    agg.run(&tuples).unwrap();
    agg.merge();

    for (_, key, state) in agg.print() {
        let (min, max) = reference[&key];
        assert_eq!(state.min, min);
        assert_eq!(state.max, max);
    }
}

#[test]
fn scenario_distinct_flavor_counts_exactly_the_groups_present() {
    let n_groups = 900u64;
    let tuples = uniform(50_000, n_groups, 9);
    let present: std::collections::HashSet<u64> = tuples.iter().map(|t| t.group_key).collect();

    let mut agg = Aggregate::new(Distinct, 4, tuples.len(), n_groups as usize, 2, false).unwrap();
    agg.run(&tuples).unwrap();
    agg.merge();

    let seen: std::collections::HashSet<u64> = agg.print().into_iter().map(|e| e.1).collect();
    assert_eq!(seen, present);
}

#[test]
fn determinism_same_input_yields_same_aggregate_after_reset() {
    let tuples = uniform(20_000, 150, 11);
    let mut agg = Aggregate::new(SumSquares::new(1), 3, tuples.len(), 150, 2, true).unwrap();

    agg.run(&tuples).unwrap();
    agg.merge();
    let mut first = agg.print();
    first.sort_by_key(|e| e.1);

    agg.reset();
    agg.run(&tuples).unwrap();
    agg.merge();
    let mut second = agg.print();
    second.sort_by_key(|e| e.1);

    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a.1, b.1);
        assert_eq!(a.2.count, b.2.count);
        assert_eq!(a.2.sum, b.2.sum);
    }
}

#[test]
fn print_is_idempotent_after_merge() {
    let tuples = uniform(10_000, 80, 13);
    let mut agg = Aggregate::new(SumSquares::new(1), 2, tuples.len(), 80, 1, true).unwrap();
    agg.run(&tuples).unwrap();
    agg.merge();

    let mut a = agg.print();
    let mut b = agg.print();
    a.sort_by_key(|e| e.1);
    b.sort_by_key(|e| e.1);
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b.iter()) {
        assert_eq!(x.1, y.1);
        assert_eq!(x.2.sum, y.2.sum);
    }
}
