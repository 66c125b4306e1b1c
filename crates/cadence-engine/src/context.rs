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

//! The explicitly constructed engine context.
//!
//! Rather than a process-wide singleton reachable from anywhere, the host
//! constructs one [`EngineContext`] and passes it (or narrower borrows of
//! its parts) to whatever needs it. "Exactly one instance per process" is
//! still enforced, but by the constructor, not by hidden global state.

use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

use cadence_core::config::EngineConfig;
use cadence_core::hardware::{HardwareProfile, HardwareSnapshot};
use cadence_core::module::{OptimizationModule, RegistryError};

use crate::budget::FrameBudgetManager;
use crate::controller::{HostCompat, ModuleController};

static CONTEXT_LIVE: AtomicBool = AtomicBool::new(false);

/// Errors from context construction.
#[derive(Debug, Error)]
pub enum ContextError {
    /// A context already exists in this process.
    #[error("an engine context is already alive in this process")]
    AlreadyConstructed,
}

/// Owner of the controller, budget manager, configuration, and hardware
/// profile; drives the per-frame cycle.
pub struct EngineContext {
    controller: ModuleController,
    budget: FrameBudgetManager,
    config: EngineConfig,
    profile: HardwareProfile,
}

impl EngineContext {
    /// Builds the context from the startup hardware snapshot and the loaded
    /// configuration. Fails if another context is alive.
    pub fn new(snapshot: HardwareSnapshot, config: EngineConfig) -> Result<Self, ContextError> {
        Self::with_compat(snapshot, config, None)
    }

    /// Like [`new`](Self::new), with a host compatibility gate installed.
    pub fn with_compat(
        snapshot: HardwareSnapshot,
        config: EngineConfig,
        compat: Option<Box<dyn HostCompat>>,
    ) -> Result<Self, ContextError> {
        if CONTEXT_LIVE.swap(true, Ordering::SeqCst) {
            return Err(ContextError::AlreadyConstructed);
        }

        let profile = HardwareProfile::from_snapshot(snapshot);
        let mut controller = match compat {
            Some(gate) => ModuleController::with_compat(gate),
            None => ModuleController::new(),
        };
        controller.initialize(profile);

        Ok(Self {
            controller,
            budget: FrameBudgetManager::new(),
            config,
            profile,
        })
    }

    /// Registers a module with the controller.
    pub fn register(&mut self, module: Box<dyn OptimizationModule>) -> Result<(), RegistryError> {
        self.controller.register(module, &self.config)
    }

    /// Enables a module, persisting the state in the configuration when the
    /// change applies.
    pub fn enable_module(&mut self, module_id: &str) -> bool {
        let applied = self.controller.enable(module_id);
        if applied {
            self.config.set_module_enabled(module_id, true);
        }
        applied
    }

    /// Disables a module, persisting the state in the configuration.
    pub fn disable_module(&mut self, module_id: &str) -> bool {
        let applied = self.controller.disable(module_id);
        if applied {
            self.config.set_module_enabled(module_id, false);
        }
        applied
    }

    /// Applies hardware-tier presets and reconciles module states. Called at
    /// startup when auto-configuration is on, or on demand from the host.
    pub fn apply_auto_configuration(&mut self) {
        self.controller.apply_auto_configuration(&mut self.config);
    }

    /// The per-frame entry point, invoked exactly once per host frame:
    /// begin the budget frame, tick all modules, end and adapt.
    pub fn tick(&mut self) {
        self.budget.begin_frame();
        self.controller.tick_all(&mut self.budget);
        self.budget.end_frame();
    }

    /// Shuts all modules down. The context stays alive for final queries but
    /// rejects further registrations.
    pub fn shutdown(&mut self) {
        self.controller.shutdown_all();
    }

    /// The module controller.
    pub fn controller(&self) -> &ModuleController {
        &self.controller
    }

    /// The module controller, mutably (for host query paths needing
    /// downcasts).
    pub fn controller_mut(&mut self) -> &mut ModuleController {
        &mut self.controller
    }

    /// The frame budget manager.
    pub fn budget(&self) -> &FrameBudgetManager {
        &self.budget
    }

    /// The configuration store.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The configuration store, mutably.
    pub fn config_mut(&mut self) -> &mut EngineConfig {
        &mut self.config
    }

    /// The hardware profile detected at startup.
    pub fn profile(&self) -> &HardwareProfile {
        &self.profile
    }
}

impl Drop for EngineContext {
    fn drop(&mut self) {
        CONTEXT_LIVE.store(false, Ordering::SeqCst);
    }
}
