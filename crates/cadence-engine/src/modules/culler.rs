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

//! Scene culling module.
//!
//! Thin stateful wrapper around [`CullPolicy`]: loads the culling distance
//! and aggressive flag from configuration, answers `should_skip` queries
//! from the render backend, and rolls per-frame stats into metrics once per
//! tick rather than per object.

use std::any::Any;

use cadence_core::metrics::ModuleMetrics;
use cadence_core::module::{ModuleCategory, ModuleInit, OptimizationModule, TickContext};
use cadence_core::scene::{ObjectState, Viewpoint};

use crate::policy::cull::{CullPolicy, DEFAULT_CULL_DISTANCE};
use crate::policy::lod::{self, DetailBand};

/// Registry id of the scene culler.
pub const MODULE_ID: &str = "scene_culler";

/// Valid range for the configured culling distance, in world units.
const CULL_DISTANCE_RANGE: std::ops::RangeInclusive<u64> = 16..=128;

/// Distance and view-direction culling for scene objects.
pub struct SceneCullerModule {
    policy: CullPolicy,
    metrics: ModuleMetrics,
    checked_this_frame: u32,
    culled_this_frame: u32,
}

impl SceneCullerModule {
    /// Creates the module with default policy values; real values load at
    /// init from configuration.
    pub fn new() -> Self {
        Self {
            policy: CullPolicy::default(),
            metrics: ModuleMetrics::new(),
            checked_this_frame: 0,
            culled_this_frame: 0,
        }
    }

    /// Whether the render backend should skip this object entirely.
    pub fn should_skip(&mut self, object: &ObjectState, view: &Viewpoint) -> bool {
        self.checked_this_frame += 1;
        let culled = self.policy.should_cull(object, view);
        if culled {
            self.culled_this_frame += 1;
        }
        culled
    }

    /// The detail band the object should render at, for objects that passed
    /// the cull check.
    pub fn current_lod(&self, object: &ObjectState, view: &Viewpoint) -> DetailBand {
        lod::detail_band(object, view)
    }

    /// Updates the culling distance at runtime, e.g. from a settings change.
    pub fn set_culling_distance(&mut self, distance: f32) {
        self.policy.culling_distance_sq = distance * distance;
    }

    /// The active policy, for diagnostics.
    pub fn policy(&self) -> &CullPolicy {
        &self.policy
    }
}

impl OptimizationModule for SceneCullerModule {
    fn module_id(&self) -> &'static str {
        MODULE_ID
    }

    fn display_name(&self) -> &'static str {
        "Scene Culler"
    }

    fn category(&self) -> ModuleCategory {
        ModuleCategory::Scene
    }

    fn priority(&self) -> i32 {
        600
    }

    fn metrics(&self) -> &ModuleMetrics {
        &self.metrics
    }

    fn on_initialize(&mut self, init: &ModuleInit<'_>) -> anyhow::Result<()> {
        let distance = init
            .config
            .setting_u64(MODULE_ID, "culling_distance", DEFAULT_CULL_DISTANCE as u64)
            .clamp(*CULL_DISTANCE_RANGE.start(), *CULL_DISTANCE_RANGE.end());
        let aggressive = init.config.setting_bool(MODULE_ID, "aggressive_mode", false);
        self.policy = CullPolicy::new(distance as f32, aggressive);
        log::info!("Scene culler: distance={distance}, aggressive={aggressive}");
        Ok(())
    }

    fn on_enable(&mut self) {
        self.checked_this_frame = 0;
        self.culled_this_frame = 0;
    }

    fn on_tick(&mut self, _ctx: &mut TickContext<'_>) -> anyhow::Result<()> {
        self.metrics
            .set_gauge("objects_checked", i64::from(self.checked_this_frame));
        self.metrics
            .set_gauge("objects_culled", i64::from(self.culled_this_frame));
        self.metrics
            .add_to_counter("total_culled", u64::from(self.culled_this_frame));
        self.checked_this_frame = 0;
        self.culled_this_frame = 0;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Default for SceneCullerModule {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::config::EngineConfig;
    use cadence_core::hardware::{HardwareProfile, HardwareSnapshot};
    use cadence_core::math::Vec3;
    use cadence_core::scene::ObjectClass;

    fn init_args() -> (EngineConfig, HardwareProfile) {
        let mut config = EngineConfig::new();
        config.set_setting(MODULE_ID, "culling_distance", 500u64.into());
        let profile = HardwareProfile::from_snapshot(HardwareSnapshot {
            cpu_cores: 4,
            cpu_threads: 8,
            total_memory_mb: 16384,
            heap_limit_mb: 4096,
        });
        (config, profile)
    }

    #[test]
    fn test_configured_distance_is_clamped() {
        let (config, profile) = init_args();
        let mut module = SceneCullerModule::new();
        module
            .on_initialize(&ModuleInit {
                config: &config,
                profile: &profile,
            })
            .unwrap();
        // 500 exceeds the accepted range and clamps to 128.
        assert_eq!(module.policy().culling_distance_sq, 128.0 * 128.0);
    }

    #[test]
    fn test_stats_roll_over_on_tick() {
        let mut module = SceneCullerModule::new();
        let view = Viewpoint::new(Vec3::ZERO, Vec3::Z);
        let far = ObjectState::at(ObjectClass::Neutral, Vec3::new(0.0, 0.0, 1000.0));
        let near = ObjectState::at(ObjectClass::Neutral, Vec3::new(0.0, 0.0, 5.0));

        assert!(module.should_skip(&far, &view));
        assert!(!module.should_skip(&near, &view));

        let mut budget = crate::budget::FrameBudgetManager::new();
        let mut ctx = TickContext {
            frame: 1,
            budget: &mut budget,
        };
        module.on_tick(&mut ctx).unwrap();
        assert_eq!(module.metrics().gauge("objects_checked"), 2);
        assert_eq!(module.metrics().gauge("objects_culled"), 1);
    }
}
