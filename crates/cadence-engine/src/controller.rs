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

//! Central coordinator for optimization modules.
//!
//! The controller keeps the registry of modules, owns each module's
//! lifecycle state, ticks enabled modules once per frame in descending
//! priority order, and contains per-module failures so one misbehaving
//! module degrades (stops contributing) rather than destabilizing the
//! frame loop. Shutdown runs in reverse tick order so dependents release
//! resources before their dependencies.

use std::collections::HashMap;
use std::time::Instant;

use cadence_core::config::EngineConfig;
use cadence_core::hardware::HardwareProfile;
use cadence_core::metrics::ModuleMetrics;
use cadence_core::module::{
    LifecycleState, ModuleInit, OptimizationModule, RegistryError, TickContext,
};

use crate::budget::FrameBudgetManager;

/// Host hook that may veto enabling a module, typically because an external
/// component conflicts with it. A veto means "not applied", never an error.
pub trait HostCompat: Send {
    /// Whether the host permits enabling the module.
    fn allows(&self, module_id: &str) -> bool;
}

/// Default compatibility gate permitting everything.
pub struct AllowAll;

impl HostCompat for AllowAll {
    fn allows(&self, _module_id: &str) -> bool {
        true
    }
}

struct ModuleEntry {
    module: Box<dyn OptimizationModule>,
    state: LifecycleState,
    tick_failures: u64,
}

/// Registry and lifecycle owner for all optimization modules.
pub struct ModuleController {
    entries: Vec<ModuleEntry>,
    index: HashMap<String, usize>,
    /// Entry indices in descending priority, registration order among equals.
    tick_order: Vec<usize>,
    profile: Option<HardwareProfile>,
    compat: Box<dyn HostCompat>,
    frame_count: u64,
    initialized: bool,
    shutting_down: bool,
    metrics: ModuleMetrics,
}

impl ModuleController {
    /// Creates a controller with the default allow-all compatibility gate.
    /// `initialize` must be called before modules can be registered.
    pub fn new() -> Self {
        Self::with_compat(Box::new(AllowAll))
    }

    /// Creates a controller with a host-supplied compatibility gate.
    pub fn with_compat(compat: Box<dyn HostCompat>) -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            tick_order: Vec::new(),
            profile: None,
            compat,
            frame_count: 0,
            initialized: false,
            shutting_down: false,
            metrics: ModuleMetrics::new(),
        }
    }

    /// Completes the controller's bootstrap with the detected hardware
    /// profile. Idempotent; a second call is logged and ignored.
    pub fn initialize(&mut self, profile: HardwareProfile) {
        if self.initialized {
            log::warn!("Controller already initialized");
            return;
        }
        log::info!("Initializing module controller");
        log::info!("Hardware profile: {}", profile.summary());
        self.profile = Some(profile);
        self.initialized = true;
    }

    /// Whether the controller is initialized and not shutting down.
    pub fn is_ready(&self) -> bool {
        self.initialized && !self.shutting_down
    }

    /// Frames ticked since initialization.
    pub fn current_frame(&self) -> u64 {
        self.frame_count
    }

    /// The profile supplied at initialization, if any.
    pub fn profile(&self) -> Option<&HardwareProfile> {
        self.profile.as_ref()
    }

    /// Controller-level metrics (tick timing, module counts).
    pub fn metrics(&self) -> &ModuleMetrics {
        &self.metrics
    }

    /// Registers a module, runs its init hook, and enables it when the
    /// configuration and the compatibility gate both allow.
    ///
    /// An init-hook failure leaves the module registered but permanently
    /// un-enableable for the session; it is logged, not propagated.
    pub fn register(
        &mut self,
        module: Box<dyn OptimizationModule>,
        config: &EngineConfig,
    ) -> Result<(), RegistryError> {
        let Some(profile) = self.profile else {
            return Err(RegistryError::NotInitialized);
        };
        if !self.is_ready() {
            return Err(RegistryError::NotInitialized);
        }

        let id = module.module_id().to_string();
        if self.index.contains_key(&id) {
            return Err(RegistryError::DuplicateId(id));
        }

        log::info!(
            "Registering module: {} (priority {})",
            module.display_name(),
            module.priority()
        );

        let entry_index = self.entries.len();
        self.entries.push(ModuleEntry {
            module,
            state: LifecycleState::Constructed,
            tick_failures: 0,
        });
        self.index.insert(id.clone(), entry_index);
        self.rebuild_tick_order();

        let entry = &mut self.entries[entry_index];
        let start = Instant::now();
        match entry.module.on_initialize(&ModuleInit {
            config,
            profile: &profile,
        }) {
            Ok(()) => {
                entry.state = LifecycleState::Initialized;
                log::info!(
                    "Module {} initialized in {}ms",
                    entry.module.display_name(),
                    start.elapsed().as_millis()
                );
            }
            Err(e) => {
                entry.state = LifecycleState::InitFailed;
                log::error!("Failed to initialize module {id}: {e:#}");
            }
        }

        if config.is_module_enabled(&id) {
            self.enable(&id);
        }

        self.metrics
            .set_gauge("registered_modules", self.entries.len() as i64);
        self.metrics
            .set_gauge("enabled_modules", self.enabled_count() as i64);
        Ok(())
    }

    /// Enables a module. Idempotent: enabling an enabled module is a no-op
    /// that reports `true`. Returns `false` ("not applied") for unknown ids,
    /// init-failed modules, and compatibility vetoes.
    pub fn enable(&mut self, module_id: &str) -> bool {
        let Some(&idx) = self.index.get(module_id) else {
            log::warn!("Cannot enable unknown module: {module_id}");
            return false;
        };

        match self.entries[idx].state {
            LifecycleState::Enabled => true,
            LifecycleState::Initialized | LifecycleState::Disabled => {
                if !self.compat.allows(module_id) {
                    log::info!("Module {module_id} not enabled: vetoed by host compatibility");
                    return false;
                }
                let entry = &mut self.entries[idx];
                entry.module.on_enable();
                entry.state = LifecycleState::Enabled;
                log::info!("Enabled module: {}", entry.module.display_name());
                self.metrics
                    .set_gauge("enabled_modules", self.enabled_count() as i64);
                true
            }
            state => {
                log::warn!("Cannot enable module {module_id} in state {state:?}");
                false
            }
        }
    }

    /// Disables a module. Idempotent; returns `false` only for unknown ids
    /// or modules that were never initialized.
    pub fn disable(&mut self, module_id: &str) -> bool {
        let Some(&idx) = self.index.get(module_id) else {
            log::warn!("Cannot disable unknown module: {module_id}");
            return false;
        };

        match self.entries[idx].state {
            LifecycleState::Disabled | LifecycleState::Initialized => true,
            LifecycleState::Enabled => {
                let entry = &mut self.entries[idx];
                entry.module.on_disable();
                entry.state = LifecycleState::Disabled;
                log::info!("Disabled module: {}", entry.module.display_name());
                self.metrics
                    .set_gauge("enabled_modules", self.enabled_count() as i64);
                true
            }
            state => {
                log::warn!("Cannot disable module {module_id} in state {state:?}");
                false
            }
        }
    }

    /// Ticks every enabled module once, in descending priority order.
    ///
    /// A failing tick hook is logged and counted but the module stays
    /// enabled; transient failures self-heal on a later frame. No-op while
    /// the controller is not ready.
    pub fn tick_all(&mut self, budget: &mut FrameBudgetManager) {
        if !self.is_ready() {
            return;
        }

        let start = Instant::now();
        self.frame_count += 1;

        let mut ticked = 0u32;
        for &idx in &self.tick_order {
            let entry = &mut self.entries[idx];
            if !entry.state.is_enabled() {
                continue;
            }
            let mut ctx = TickContext {
                frame: self.frame_count,
                budget: &mut *budget,
            };
            if let Err(e) = entry.module.on_tick(&mut ctx) {
                entry.tick_failures += 1;
                entry.module.metrics().increment_counter("tick_errors");
                log::error!(
                    "Error during tick for module {}: {e:#}",
                    entry.module.module_id()
                );
            }
            ticked += 1;
        }

        self.metrics
            .set_gauge("tick_time_us", start.elapsed().as_micros() as i64);
        self.metrics.set_gauge("modules_ticked", i64::from(ticked));
        self.metrics.increment_counter("total_ticks");
    }

    /// Shuts every module down in reverse tick order (dependents before
    /// dependencies), attempting all modules even when hooks fail. The
    /// controller rejects registrations afterwards.
    pub fn shutdown_all(&mut self) {
        if !self.initialized {
            return;
        }
        log::info!("Shutting down module controller");
        self.shutting_down = true;

        for &idx in self.tick_order.clone().iter().rev() {
            let entry = &mut self.entries[idx];
            if entry.state.is_enabled() {
                entry.module.on_disable();
                entry.state = LifecycleState::Disabled;
            }
            if let Err(e) = entry.module.on_shutdown() {
                log::error!(
                    "Error shutting down module {}: {e:#}",
                    entry.module.module_id()
                );
            }
            entry.state = LifecycleState::Shutdown;
        }

        self.initialized = false;
        log::info!("Module controller shutdown complete");
    }

    /// Applies hardware-tier presets and reconciles enabled states against
    /// the configuration.
    pub fn apply_auto_configuration(&mut self, config: &mut EngineConfig) {
        let Some(profile) = self.profile.clone() else {
            log::warn!("Cannot auto-configure without a hardware profile");
            return;
        };

        log::info!("Applying auto-configuration for tier {}", profile.tier());
        config.apply_tier_presets(&profile);

        let ids: Vec<String> = self.index.keys().cloned().collect();
        for id in ids {
            if config.is_module_enabled(&id) {
                self.enable(&id);
            } else {
                self.disable(&id);
            }
        }
    }

    /// The lifecycle state of a module, if registered.
    pub fn state(&self, module_id: &str) -> Option<LifecycleState> {
        self.index.get(module_id).map(|&idx| self.entries[idx].state)
    }

    /// How many times a module's tick hook has failed.
    pub fn tick_failures(&self, module_id: &str) -> u64 {
        self.index
            .get(module_id)
            .map_or(0, |&idx| self.entries[idx].tick_failures)
    }

    /// Number of registered modules.
    pub fn module_count(&self) -> usize {
        self.entries.len()
    }

    /// Borrow a registered module as its concrete type.
    pub fn module_as<T: OptimizationModule + 'static>(&self, module_id: &str) -> Option<&T> {
        let &idx = self.index.get(module_id)?;
        self.entries[idx].module.as_any().downcast_ref()
    }

    /// Borrow a registered module mutably as its concrete type.
    pub fn module_as_mut<T: OptimizationModule + 'static>(
        &mut self,
        module_id: &str,
    ) -> Option<&mut T> {
        let &idx = self.index.get(module_id)?;
        self.entries[idx].module.as_any_mut().downcast_mut()
    }

    fn enabled_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.state.is_enabled())
            .count()
    }

    fn rebuild_tick_order(&mut self) {
        let mut order: Vec<usize> = (0..self.entries.len()).collect();
        // Stable sort keeps registration order among equal priorities.
        order.sort_by_key(|&idx| std::cmp::Reverse(self.entries[idx].module.priority()));
        self.tick_order = order;
    }
}

impl Default for ModuleController {
    fn default() -> Self {
        Self::new()
    }
}
