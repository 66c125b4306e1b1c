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

//! # Cadence Core
//!
//! Foundational crate containing traits, core types, and interface contracts
//! that define the frame-pacing engine's architecture. Nothing here performs
//! actual rendering or simulation work; the types describe budgets, module
//! lifecycles, hardware classification, and the read-only scene data the
//! host supplies to the degradation policies.

#![warn(missing_docs)]

pub mod budget;
pub mod config;
pub mod hardware;
pub mod math;
pub mod metrics;
pub mod module;
pub mod scene;

pub use budget::{BudgetCategory, FrameBudget};
pub use config::EngineConfig;
pub use hardware::{HardwareProfile, HardwareSnapshot, HardwareTier};
pub use metrics::ModuleMetrics;
pub use module::{
    LifecycleState, ModuleCategory, ModuleInit, OptimizationModule, RegistryError, TickContext,
};
