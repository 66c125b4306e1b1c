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

//! Scene tick-throttling module.
//!
//! Owns the throttle ledger, answers `should_tick_this_frame` queries from
//! the host's update loop, and sweeps stale tracking records periodically
//! so the ledger does not grow as objects leave the scene.

use std::any::Any;

use cadence_core::metrics::ModuleMetrics;
use cadence_core::module::{ModuleCategory, ModuleInit, OptimizationModule, TickContext};
use cadence_core::scene::{ObjectHandle, ObjectState, Viewpoint};

use crate::policy::throttle::{ThrottleLedger, ThrottlePolicy};

/// Registry id of the scene throttler.
pub const MODULE_ID: &str = "scene_throttler";

/// Frames between staleness sweeps.
const SWEEP_EVERY_FRAMES: u64 = 100;
/// Records unseen this long are evicted by the sweep.
const STALE_AFTER_FRAMES: u64 = 200;

/// Tick-rate throttling for dynamic scene objects.
pub struct SceneThrottlerModule {
    policy: ThrottlePolicy,
    ledger: ThrottleLedger,
    metrics: ModuleMetrics,
    current_frame: u64,
    throttled_this_frame: u32,
    full_rate_this_frame: u32,
}

impl SceneThrottlerModule {
    /// Creates the module; intervals load from configuration at init.
    pub fn new() -> Self {
        Self {
            policy: ThrottlePolicy::default(),
            ledger: ThrottleLedger::new(),
            metrics: ModuleMetrics::new(),
            current_frame: 0,
            throttled_this_frame: 0,
            full_rate_this_frame: 0,
        }
    }

    /// Whether the object should run its update this frame. Skipped objects
    /// accumulate a consecutive-skip count the renderer can interpolate
    /// against.
    pub fn should_tick_this_frame(
        &mut self,
        handle: ObjectHandle,
        object: &ObjectState,
        view: &Viewpoint,
    ) -> bool {
        let ticked =
            self.ledger
                .should_tick(&self.policy, handle, object, view, self.current_frame);
        if ticked {
            self.full_rate_this_frame += 1;
        } else {
            self.throttled_this_frame += 1;
        }
        ticked
    }

    /// Consecutive frames the object has skipped.
    pub fn skipped_frames(&self, handle: ObjectHandle) -> u32 {
        self.ledger.skipped_frames(handle)
    }

    /// The tick interval currently assigned to the object.
    pub fn current_interval(&self, handle: ObjectHandle) -> u32 {
        self.ledger.interval(handle)
    }

    /// Replaces the configured intervals at runtime.
    pub fn set_intervals(&mut self, idle_interval: u32, distant_interval: u32) {
        self.policy.idle_interval = idle_interval.max(1);
        self.policy.distant_interval = distant_interval.max(1);
        log::info!(
            "Scene throttler intervals updated: idle={}, distant={}",
            self.policy.idle_interval,
            self.policy.distant_interval
        );
    }
}

impl OptimizationModule for SceneThrottlerModule {
    fn module_id(&self) -> &'static str {
        MODULE_ID
    }

    fn display_name(&self) -> &'static str {
        "Scene Throttler"
    }

    fn category(&self) -> ModuleCategory {
        ModuleCategory::Scene
    }

    fn priority(&self) -> i32 {
        550
    }

    fn metrics(&self) -> &ModuleMetrics {
        &self.metrics
    }

    fn on_initialize(&mut self, init: &ModuleInit<'_>) -> anyhow::Result<()> {
        let idle = init.config.setting_u64(MODULE_ID, "idle_interval", 3).max(1) as u32;
        let distant = init
            .config
            .setting_u64(MODULE_ID, "distant_interval", 2)
            .max(1) as u32;
        self.policy = ThrottlePolicy {
            idle_interval: idle,
            distant_interval: distant,
        };
        log::info!("Scene throttler: idle interval={idle}, distant interval={distant}");
        Ok(())
    }

    fn on_enable(&mut self) {
        self.ledger = ThrottleLedger::new();
        self.throttled_this_frame = 0;
        self.full_rate_this_frame = 0;
    }

    fn on_disable(&mut self) {
        self.ledger = ThrottleLedger::new();
    }

    fn on_tick(&mut self, ctx: &mut TickContext<'_>) -> anyhow::Result<()> {
        self.current_frame = ctx.frame;

        if ctx.frame % SWEEP_EVERY_FRAMES == 0 {
            let evicted = self.ledger.sweep(ctx.frame, STALE_AFTER_FRAMES);
            self.metrics.add_to_counter("records_evicted", evicted as u64);
        }

        self.metrics
            .set_gauge("objects_throttled", i64::from(self.throttled_this_frame));
        self.metrics
            .set_gauge("objects_full_rate", i64::from(self.full_rate_this_frame));
        self.metrics
            .set_gauge("tracked_objects", self.ledger.tracked() as i64);
        self.metrics
            .add_to_counter("total_skips", u64::from(self.throttled_this_frame));
        self.throttled_this_frame = 0;
        self.full_rate_this_frame = 0;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Default for SceneThrottlerModule {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::math::Vec3;
    use cadence_core::scene::ObjectClass;

    #[test]
    fn test_query_tracks_current_frame() {
        let mut module = SceneThrottlerModule::new();
        module.current_frame = 8;
        let view = Viewpoint::new(Vec3::ZERO, Vec3::Z);
        let near = ObjectState::at(ObjectClass::Neutral, Vec3::new(0.0, 0.0, 4.0));
        assert!(module.should_tick_this_frame(ObjectHandle(0), &near, &view));
        assert_eq!(module.current_interval(ObjectHandle(0)), 1);
    }

    #[test]
    fn test_disable_clears_ledger() {
        let mut module = SceneThrottlerModule::new();
        let view = Viewpoint::new(Vec3::ZERO, Vec3::Z);
        let object = ObjectState::at(ObjectClass::Neutral, Vec3::new(0.0, 0.0, 40.0));
        module.should_tick_this_frame(ObjectHandle(3), &object, &view);
        assert_eq!(module.ledger.tracked(), 1);
        module.on_disable();
        assert_eq!(module.ledger.tracked(), 0);
    }
}
