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

use thiserror::Error;

/// Errors raised while constructing an [`crate::Aggregate`].
///
/// Once `Create` succeeds, the hot path (`Run`/`Merge`) cannot fail: all
/// inputs have already been validated here, matching the "no operational
/// errors" policy of the aggregation core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("n_threads must be >= 1, got {0}")]
    InvalidThreadCount(usize),

    #[error("n_tups must be > 0")]
    InvalidTupleCount,

    #[error("n_groups must be > 0")]
    InvalidGroupCount,

    #[error("resample_rate must be >= 1, got {0}")]
    InvalidResampleRate(u32),

    #[error("tuple at index {index} carries {got} payload values, expected {expected}")]
    ArityMismatch {
        index: usize,
        expected: usize,
        got: usize,
    },
}

pub type Result<T> = std::result::Result<T, EngineError>;
