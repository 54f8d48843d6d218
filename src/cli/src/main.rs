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

mod distribution;
mod report;

use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use groupby_engine::{Aggregate, Distinct, MinMax, SumSquares};
use tracing_subscriber::EnvFilter;

use distribution::Distribution;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Flavor {
    /// SUM and SUM_OF_SQUARES over `arity` payload columns.
    Sum,
    /// MIN/MAX/second-min over a single payload column.
    MinMax,
    /// Presence only; counts distinct keys.
    Distinct,
}

/// Adaptive parallel group-by aggregation benchmark driver.
#[derive(Debug, Parser)]
#[command(name = "groupby-bench", version, about)]
struct Args {
    /// Tuple count is 2^TUPLES_EXP.
    #[arg(long, env = "GROUPBY_TUPLES_EXP", default_value_t = 20)]
    tuples_exp: u32,

    /// Number of distinct group keys in the input.
    #[arg(long, env = "GROUPBY_GROUPS", default_value_t = 1000)]
    groups: usize,

    /// Number of worker threads.
    #[arg(long, env = "GROUPBY_THREADS", default_value_t = 4)]
    threads: usize,

    /// Aggregate flavor to run.
    #[arg(long, value_enum, default_value_t = Flavor::Sum)]
    flavor: Flavor,

    /// Number of SUM-flavor payload columns (1..=4). Ignored for other
    /// flavors.
    #[arg(long, default_value_t = 1)]
    sum_arity: usize,

    /// Input key distribution.
    #[arg(long, value_enum, default_value_t = DistributionArg::Uniform)]
    distribution: DistributionArg,

    /// Number of partitions per thread (`n_partitions = threads *
    /// resample_rate`).
    #[arg(long, default_value_t = 2)]
    resample_rate: u32,

    /// Random seed for input generation.
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Print every aggregated entry after the merge phase.
    #[arg(long, default_value_t = false)]
    print: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DistributionArg {
    Uniform,
    Sorted,
    HeavyHitter,
    RepeatedRuns,
    Zipf,
    SelfSimilar,
}

impl From<DistributionArg> for Distribution {
    fn from(value: DistributionArg) -> Self {
        match value {
            DistributionArg::Uniform => Distribution::Uniform,
            DistributionArg::Sorted => Distribution::Sorted,
            DistributionArg::HeavyHitter => Distribution::HeavyHitter,
            DistributionArg::RepeatedRuns => Distribution::RepeatedRuns,
            DistributionArg::Zipf => Distribution::Zipf,
            DistributionArg::SelfSimilar => Distribution::SelfSimilar,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let n_tups = 1usize
        .checked_shl(args.tuples_exp)
        .context("tuples_exp too large")?;

    match args.flavor {
        Flavor::Sum => run_sum(&args, n_tups),
        Flavor::MinMax => run_min_max(&args, n_tups),
        Flavor::Distinct => run_distinct(&args, n_tups),
    }
}

fn run_sum(args: &Args, n_tups: usize) -> Result<()> {
    let arity = args.sum_arity.clamp(1, 4);
    let tuples = distribution::generate(args.distribution.into(), n_tups, args.groups, arity, args.seed);
    let mut agg = Aggregate::new(
        SumSquares::new(arity),
        args.threads,
        n_tups,
        args.groups,
        args.resample_rate,
        true,
    )
    .context("failed to create aggregate")?;

    let run_start = Instant::now();
    agg.run(&tuples).context("input tuples did not match flavor arity")?;
    let run_elapsed = run_start.elapsed();

    let merge_start = Instant::now();
    agg.merge();
    let merge_elapsed = merge_start.elapsed();

    report::print_timings(run_elapsed, merge_elapsed);
    report::print_miss_rate(agg.miss_rate());
    if args.print {
        report::print_entries(&agg.print());
    }
    Ok(())
}

fn run_min_max(args: &Args, n_tups: usize) -> Result<()> {
    let tuples = distribution::generate(args.distribution.into(), n_tups, args.groups, 1, args.seed);
    let mut agg = Aggregate::new(MinMax, args.threads, n_tups, args.groups, args.resample_rate, true)
        .context("failed to create aggregate")?;

    let run_start = Instant::now();
    agg.run(&tuples).context("input tuples did not match flavor arity")?;
    let run_elapsed = run_start.elapsed();

    let merge_start = Instant::now();
    agg.merge();
    let merge_elapsed = merge_start.elapsed();

    report::print_timings(run_elapsed, merge_elapsed);
    report::print_miss_rate(agg.miss_rate());
    if args.print {
        for (seq, (bucket, key, state)) in agg.print().into_iter().enumerate() {
            println!(
                "{}\t{bucket}\t{key}\t{}\t{}\t{}",
                seq + 1,
                state.min,
                state.max,
                state.min_alt
            );
        }
    }
    Ok(())
}

fn run_distinct(args: &Args, n_tups: usize) -> Result<()> {
    let tuples = distribution::generate(args.distribution.into(), n_tups, args.groups, 0, args.seed);
    let mut agg = Aggregate::new(Distinct, args.threads, n_tups, args.groups, args.resample_rate, false)
        .context("failed to create aggregate")?;

    let run_start = Instant::now();
    agg.run(&tuples).context("input tuples did not match flavor arity")?;
    let run_elapsed = run_start.elapsed();

    let merge_start = Instant::now();
    agg.merge();
    let merge_elapsed = merge_start.elapsed();

    report::print_timings(run_elapsed, merge_elapsed);
    report::print_miss_rate(agg.miss_rate());
    if args.print {
        report::print_distinct_entries(&agg.print());
    }
    Ok(())
}
