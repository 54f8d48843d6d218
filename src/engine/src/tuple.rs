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

//! Input data model.

/// One input row: a group key plus a flavor-specific number of `u64`
/// payload columns (`0` for DISTINCT, `1` for MIN/MAX, `1..=4` for
/// SUM/SUM_OF_SQUARES).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple {
    pub group_key: u64,
    pub values: Vec<u64>,
}

impl Tuple {
    pub fn new(group_key: u64, values: Vec<u64>) -> Self {
        Self { group_key, values }
    }

    pub fn keyed(group_key: u64) -> Self {
        Self {
            group_key,
            values: Vec::new(),
        }
    }
}
