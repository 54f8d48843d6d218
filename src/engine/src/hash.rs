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

//! Multiplicative hashing shared by the global and private tables.

use crate::config::HASH_MULTIPLIER;

/// `h(key, k) = (key * HASH_MULTIPLIER) >> (64 - k)`, i.e. the top `k` bits
/// of the 64-bit product. `k` is the log2 of the table size and must be in
/// `1..=64`.
#[inline]
pub fn mhash(key: u64, log2_table_size: u32) -> usize {
    debug_assert!((1..=64).contains(&log2_table_size));
    (key.wrapping_mul(HASH_MULTIPLIER) >> (64 - log2_table_size)) as usize
}
