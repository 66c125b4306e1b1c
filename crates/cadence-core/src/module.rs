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

//! The optimization-module contract and its lifecycle model.
//!
//! A module is an independent optimization unit (culling, throttling, batched
//! recalculation, frame pacing) registered with the controller under a unique
//! id. The controller owns each module's [`LifecycleState`] and validates all
//! transitions centrally; modules implement hooks only and carry no
//! enabled/initialized flags of their own.

use std::any::Any;
use thiserror::Error;

use crate::budget::FrameBudget;
use crate::config::EngineConfig;
use crate::hardware::HardwareProfile;
use crate::metrics::ModuleMetrics;

/// Grouping of modules by the concern they optimize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleCategory {
    /// Per-object scene work: culling, tick throttling, level of detail.
    Scene,
    /// Derived lighting state recalculation.
    Lighting,
    /// Geometry and draw-side optimizations.
    Rendering,
    /// Frame pacing and target-rate control.
    FrameControl,
    /// Allocation and cache management.
    Memory,
}

impl std::fmt::Display for ModuleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleCategory::Scene => write!(f, "Scene"),
            ModuleCategory::Lighting => write!(f, "Lighting"),
            ModuleCategory::Rendering => write!(f, "Rendering"),
            ModuleCategory::FrameControl => write!(f, "FrameControl"),
            ModuleCategory::Memory => write!(f, "Memory"),
        }
    }
}

/// Lifecycle position of a registered module, owned by the controller.
///
/// ```text
/// Constructed → Initialized → Enabled ⇄ Disabled → Shutdown
///            ↘ InitFailed (terminal for the session)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Registered but the init hook has not yet run.
    Constructed,
    /// Init hook succeeded; not yet enabled.
    Initialized,
    /// Init hook failed; the module cannot be enabled this session.
    InitFailed,
    /// Actively ticking each frame.
    Enabled,
    /// Initialized but not ticking.
    Disabled,
    /// Torn down; terminal.
    Shutdown,
}

impl LifecycleState {
    /// Whether the module participates in the per-frame tick.
    pub fn is_enabled(self) -> bool {
        matches!(self, LifecycleState::Enabled)
    }
}

/// Errors surfaced synchronously by the registration and lifecycle APIs.
///
/// Hook failures (init/tick/shutdown) are deliberately *not* represented
/// here: they are contained at the module boundary, logged, and counted,
/// never propagated to the frame loop.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A module with the same id is already registered.
    #[error("module `{0}` is already registered")]
    DuplicateId(String),
    /// The controller has not completed its own bootstrap (or is shut down).
    #[error("controller is not initialized")]
    NotInitialized,
}

/// One-time setup context handed to a module's init hook.
pub struct ModuleInit<'a> {
    /// Configuration store the module reads its settings from.
    pub config: &'a EngineConfig,
    /// The hardware profile detected at startup.
    pub profile: &'a HardwareProfile,
}

/// Per-frame context handed to a module's tick hook.
pub struct TickContext<'a> {
    /// Monotonic frame counter maintained by the controller.
    pub frame: u64,
    /// Budget accounting for the frame in progress.
    pub budget: &'a mut dyn FrameBudget,
}

/// An independent optimization unit with a strict lifecycle.
///
/// Hooks return `anyhow::Result` so implementations can bubble any domain
/// error; the controller logs and contains failures rather than letting them
/// stop other modules or crash the frame.
pub trait OptimizationModule: Send {
    /// Unique identifier, lowercase with underscores (e.g. `"scene_culler"`).
    fn module_id(&self) -> &'static str;

    /// Human-readable name for logs and host UIs.
    fn display_name(&self) -> &'static str;

    /// The concern this module optimizes.
    fn category(&self) -> ModuleCategory;

    /// Tick priority; higher values tick earlier in the frame.
    fn priority(&self) -> i32;

    /// Metrics collected by this module.
    fn metrics(&self) -> &ModuleMetrics;

    /// One-time setup. A failure leaves the module permanently un-enableable
    /// for the session.
    fn on_initialize(&mut self, _init: &ModuleInit<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called when the module transitions to `Enabled`.
    fn on_enable(&mut self) {}

    /// Called when the module transitions to `Disabled`.
    fn on_disable(&mut self) {}

    /// Per-frame hook, called while `Enabled`, in descending priority order.
    /// A failure is logged and counted; the module stays enabled so transient
    /// failures self-heal.
    fn on_tick(&mut self, _ctx: &mut TickContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Final teardown. Called once during controller shutdown.
    fn on_shutdown(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Downcast to a concrete type for host query paths.
    fn as_any(&self) -> &dyn Any;

    /// Downcast to a concrete type (mutable) for host query paths.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
