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

//! The degradation decision layer.
//!
//! Pure functions over host-supplied object state: given a distance,
//! importance, and activity picture, decide whether an object renders at
//! full detail, reduced detail, reduced tick rate, or not at all. The only
//! state here is the throttle ledger's per-object tracking records, which
//! are owned exclusively by the tick thread.

pub mod cull;
pub mod lod;
pub mod throttle;

pub use cull::CullPolicy;
pub use lod::DetailBand;
pub use throttle::{ThrottleLedger, ThrottlePolicy};
