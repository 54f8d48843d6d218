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

//! Adaptive parallel group-by aggregation engine.
//!
//! A concurrent hash-table-based GROUP BY core for multicore shared
//! memory: a shared global table with chained overflow, a small private
//! per-thread cache that absorbs repeated keys before they reach the
//! global table, and a sampling-based strategy chooser that decides, per
//! input partition, whether to go straight to the global table, route
//! through the private cache, or collapse consecutive equal-key runs
//! first.
//!
//! The engine has no knowledge of where tuples come from or where output
//! goes; wiring it to a CLI, a file, or a query executor is left to
//! callers (see the `groupby_cli` crate in this workspace for one such
//! wiring).

pub mod aggregate;
pub mod combine;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod global_table;
pub mod hash;
pub mod merge;
pub mod private_table;
pub mod sampler;
pub mod strategy;
pub mod tuple;

pub use aggregate::Aggregate;
pub use combine::{Combine, Distinct, MinMax, SumSquares};
pub use config::AggregateConfig;
pub use error::{EngineError, Result};
pub use strategy::Strategy;
pub use tuple::Tuple;
