// Copyright 2025 eraflo
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

//! Minimal math support for the degradation policies.
//!
//! The policies only need squared distances and dot products, so this module
//! carries a single vector type rather than a full linear-algebra suite.

mod vector;

pub use vector::Vec3;

/// Tolerance used for near-zero float comparisons (e.g. guarded normalization).
pub const EPSILON: f32 = 1e-6;
