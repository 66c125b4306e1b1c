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

//! Integration tests for the module controller's lifecycle machine and its
//! failure containment.

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use cadence_core::config::EngineConfig;
use cadence_core::hardware::{HardwareProfile, HardwareSnapshot};
use cadence_core::metrics::ModuleMetrics;
use cadence_core::module::{
    LifecycleState, ModuleCategory, ModuleInit, OptimizationModule, RegistryError, TickContext,
};
use cadence_engine::budget::FrameBudgetManager;
use cadence_engine::controller::{HostCompat, ModuleController};

/// Scripted module used to observe the controller from the outside.
struct ProbeModule {
    id: &'static str,
    priority: i32,
    fail_init: bool,
    fail_tick: bool,
    ticks: Arc<AtomicU64>,
    tick_log: Option<Arc<std::sync::Mutex<Vec<&'static str>>>>,
    shutdown_log: Option<Arc<std::sync::Mutex<Vec<&'static str>>>>,
    metrics: ModuleMetrics,
}

impl ProbeModule {
    fn new(id: &'static str, priority: i32) -> Self {
        Self {
            id,
            priority,
            fail_init: false,
            fail_tick: false,
            ticks: Arc::new(AtomicU64::new(0)),
            tick_log: None,
            shutdown_log: None,
            metrics: ModuleMetrics::new(),
        }
    }
}

impl OptimizationModule for ProbeModule {
    fn module_id(&self) -> &'static str {
        self.id
    }

    fn display_name(&self) -> &'static str {
        "Probe"
    }

    fn category(&self) -> ModuleCategory {
        ModuleCategory::Scene
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn metrics(&self) -> &ModuleMetrics {
        &self.metrics
    }

    fn on_initialize(&mut self, _init: &ModuleInit<'_>) -> anyhow::Result<()> {
        if self.fail_init {
            anyhow::bail!("scripted init failure");
        }
        Ok(())
    }

    fn on_tick(&mut self, _ctx: &mut TickContext<'_>) -> anyhow::Result<()> {
        self.ticks.fetch_add(1, Ordering::SeqCst);
        if let Some(log) = &self.tick_log {
            log.lock().unwrap().push(self.id);
        }
        if self.fail_tick {
            anyhow::bail!("scripted tick failure");
        }
        Ok(())
    }

    fn on_shutdown(&mut self) -> anyhow::Result<()> {
        if let Some(log) = &self.shutdown_log {
            log.lock().unwrap().push(self.id);
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn ready_controller() -> (ModuleController, EngineConfig) {
    let mut controller = ModuleController::new();
    controller.initialize(HardwareProfile::from_snapshot(HardwareSnapshot {
        cpu_cores: 8,
        cpu_threads: 16,
        total_memory_mb: 32768,
        heap_limit_mb: 8192,
    }));
    (controller, EngineConfig::new())
}

#[test]
fn test_register_before_initialize_is_rejected() {
    let mut controller = ModuleController::new();
    let config = EngineConfig::new();
    let err = controller
        .register(Box::new(ProbeModule::new("x", 1)), &config)
        .unwrap_err();
    assert!(matches!(err, RegistryError::NotInitialized));
}

#[test]
fn test_duplicate_id_is_rejected_and_registry_unchanged() {
    let (mut controller, config) = ready_controller();
    controller
        .register(Box::new(ProbeModule::new("x", 1)), &config)
        .unwrap();
    let err = controller
        .register(Box::new(ProbeModule::new("x", 2)), &config)
        .unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateId(ref id) if id == "x"));
    assert_eq!(controller.module_count(), 1);
}

#[test]
fn test_init_failure_leaves_module_unenableable() {
    let (mut controller, config) = ready_controller();
    let mut module = ProbeModule::new("broken", 10);
    module.fail_init = true;
    controller.register(Box::new(module), &config).unwrap();

    assert_eq!(controller.state("broken"), Some(LifecycleState::InitFailed));
    assert!(!controller.enable("broken"));
    assert_eq!(controller.state("broken"), Some(LifecycleState::InitFailed));

    // Its failure never stops a healthy sibling from registering and ticking.
    let healthy = ProbeModule::new("healthy", 5);
    let ticks = healthy.ticks.clone();
    controller.register(Box::new(healthy), &config).unwrap();
    let mut budget = FrameBudgetManager::new();
    controller.tick_all(&mut budget);
    assert_eq!(ticks.load(Ordering::SeqCst), 1);
}

#[test]
fn test_failing_tick_hook_is_contained_for_100_frames() {
    let (mut controller, config) = ready_controller();
    let mut module = ProbeModule::new("flaky", 1);
    module.fail_tick = true;
    let ticks = module.ticks.clone();
    controller.register(Box::new(module), &config).unwrap();

    let mut budget = FrameBudgetManager::new();
    for _ in 0..100 {
        budget.begin_frame();
        controller.tick_all(&mut budget);
        budget.end_frame();
    }

    // The hook ran every frame, stayed enabled, and every failure was counted.
    assert_eq!(ticks.load(Ordering::SeqCst), 100);
    assert_eq!(controller.state("flaky"), Some(LifecycleState::Enabled));
    assert_eq!(controller.tick_failures("flaky"), 100);
}

#[test]
fn test_tick_order_is_descending_priority() {
    let (mut controller, config) = ready_controller();
    let log = Arc::new(std::sync::Mutex::new(Vec::new()));
    for (id, priority) in [("low", 100), ("high", 600), ("mid", 400)] {
        let mut module = ProbeModule::new(id, priority);
        module.tick_log = Some(log.clone());
        controller.register(Box::new(module), &config).unwrap();
    }

    let mut budget = FrameBudgetManager::new();
    controller.tick_all(&mut budget);
    assert_eq!(*log.lock().unwrap(), vec!["high", "mid", "low"]);
}

#[test]
fn test_shutdown_runs_in_reverse_tick_order() {
    let (mut controller, config) = ready_controller();
    let log = Arc::new(std::sync::Mutex::new(Vec::new()));
    for (id, priority) in [("a", 600), ("b", 400), ("c", 100)] {
        let mut module = ProbeModule::new(id, priority);
        module.shutdown_log = Some(log.clone());
        controller.register(Box::new(module), &config).unwrap();
    }

    controller.shutdown_all();
    assert_eq!(*log.lock().unwrap(), vec!["c", "b", "a"]);
    assert_eq!(controller.state("a"), Some(LifecycleState::Shutdown));
}

#[test]
fn test_registration_after_shutdown_is_rejected() {
    let (mut controller, config) = ready_controller();
    controller.shutdown_all();
    let err = controller
        .register(Box::new(ProbeModule::new("late", 1)), &config)
        .unwrap_err();
    assert!(matches!(err, RegistryError::NotInitialized));
}

#[test]
fn test_enable_disable_are_idempotent() {
    let (mut controller, config) = ready_controller();
    controller
        .register(Box::new(ProbeModule::new("x", 1)), &config)
        .unwrap();

    assert!(controller.enable("x"));
    assert!(controller.enable("x"));
    assert_eq!(controller.state("x"), Some(LifecycleState::Enabled));

    assert!(controller.disable("x"));
    assert!(controller.disable("x"));
    assert_eq!(controller.state("x"), Some(LifecycleState::Disabled));

    assert!(!controller.enable("unknown"));
    assert!(!controller.disable("unknown"));
}

struct VetoProbe;

impl HostCompat for VetoProbe {
    fn allows(&self, module_id: &str) -> bool {
        module_id != "vetoed"
    }
}

#[test]
fn test_host_veto_reports_not_applied() {
    let mut controller = ModuleController::with_compat(Box::new(VetoProbe));
    controller.initialize(HardwareProfile::from_snapshot(HardwareSnapshot {
        cpu_cores: 4,
        cpu_threads: 8,
        total_memory_mb: 16384,
        heap_limit_mb: 4096,
    }));
    let config = EngineConfig::new();

    controller
        .register(Box::new(ProbeModule::new("vetoed", 1)), &config)
        .unwrap();
    controller
        .register(Box::new(ProbeModule::new("allowed", 1)), &config)
        .unwrap();

    // Auto-enable at registration was vetoed for one and applied for the other.
    assert_eq!(controller.state("vetoed"), Some(LifecycleState::Initialized));
    assert_eq!(controller.state("allowed"), Some(LifecycleState::Enabled));

    assert!(!controller.enable("vetoed"));
    assert_eq!(controller.state("vetoed"), Some(LifecycleState::Initialized));
}

#[test]
fn test_disabled_modules_do_not_tick() {
    let (mut controller, config) = ready_controller();
    let module = ProbeModule::new("x", 1);
    let ticks = module.ticks.clone();
    controller.register(Box::new(module), &config).unwrap();

    let mut budget = FrameBudgetManager::new();
    controller.tick_all(&mut budget);
    controller.disable("x");
    controller.tick_all(&mut budget);
    controller.tick_all(&mut budget);
    assert_eq!(ticks.load(Ordering::SeqCst), 1);
}

#[test]
fn test_auto_configuration_reconciles_states() {
    let (mut controller, mut config) = ready_controller();
    controller
        .register(Box::new(ProbeModule::new("x", 1)), &config)
        .unwrap();
    assert_eq!(controller.state("x"), Some(LifecycleState::Enabled));

    config.set_module_enabled("x", false);
    controller.apply_auto_configuration(&mut config);
    assert_eq!(controller.state("x"), Some(LifecycleState::Disabled));
    // The ULTRA profile's presets landed in the config as part of the pass.
    assert_eq!(config.setting_u64("scene_culler", "culling_distance", 0), 96);
}
