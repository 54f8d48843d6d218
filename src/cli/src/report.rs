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

//! Textual reporting: the `Print`/`MissRate` dump and run timings.

use std::time::Duration;

use groupby_engine::combine::SumState;

pub fn print_entries(entries: &[(usize, u64, SumState)]) {
    for (seq, (bucket, key, state)) in entries.iter().enumerate() {
        let fields: Vec<String> = state
            .count
            .iter()
            .zip(&state.sum)
            .zip(&state.sum_sq)
            .map(|((count, sum), sum_sq)| format!("{count}\t{sum}\t{sum_sq}"))
            .collect();
        println!("{}\t{bucket}\t{key}\t{}", seq + 1, fields.join("\t"));
    }
}

pub fn print_distinct_entries(entries: &[(usize, u64, ())]) {
    for (seq, (bucket, key, ())) in entries.iter().enumerate() {
        println!("{}\t{bucket}\t{key}", seq + 1);
    }
}

pub fn print_timings(run: Duration, merge: Duration) {
    eprintln!("run:   {:.6}s", run.as_secs_f64());
    eprintln!("merge: {:.6}s", merge.as_secs_f64());
}

pub fn print_miss_rate(miss_rate: f64) {
    eprintln!("miss rate: {miss_rate:.4}");
}
