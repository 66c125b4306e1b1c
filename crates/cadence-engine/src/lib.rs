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

//! # Cadence Engine
//!
//! The adaptive budget-scheduling and tiered-degradation engine: frame
//! budget management with deferred work, the module controller and its
//! lifecycle machine, the pure degradation policies (culling, level of
//! detail, tick throttling), the batched recalculation queue, and the
//! concrete optimization modules a host registers.
//!
//! A single logical frame-tick thread drives everything through
//! [`EngineContext::tick`]; worker threads interact only through the
//! recalculation queue's producer handle.

#![warn(missing_docs)]

pub mod batch;
pub mod budget;
pub mod context;
pub mod controller;
pub mod modules;
pub mod policy;

pub use batch::{CellPos, RecalcQueue, RecalcScheduler};
pub use budget::FrameBudgetManager;
pub use context::{ContextError, EngineContext};
pub use controller::{AllowAll, HostCompat, ModuleController};
pub use policy::{CullPolicy, DetailBand, ThrottleLedger, ThrottlePolicy};
