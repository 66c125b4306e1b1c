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

//! Demonstration host for the cadence engine.
//!
//! Probes the hardware, builds the engine context, registers the standard
//! modules, and drives a short synthetic frame loop with a scripted scene
//! so the scheduling, throttling, and batching behavior shows up in the
//! logs. A real host would replace the scripted scene with its world model
//! and call `tick()` from its main loop.

use std::path::Path;

use cadence_core::config::EngineConfig;
use cadence_core::math::Vec3;
use cadence_core::module::OptimizationModule;
use cadence_core::scene::{ObjectClass, ObjectHandle, ObjectState, Viewpoint};
use cadence_engine::batch::{priority_for_distance_sq, CellPos};
use cadence_engine::modules::{
    FramePacerModule, LightingBatcherModule, SceneCullerModule, SceneThrottlerModule,
};
use cadence_engine::EngineContext;

const CONFIG_PATH: &str = "cadence.json";
const FRAMES: u64 = 240;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let snapshot = cadence_infra::detect_snapshot();
    let config = EngineConfig::load(Path::new(CONFIG_PATH))?;

    let mut ctx = EngineContext::new(snapshot, config)?;

    ctx.register(Box::new(SceneCullerModule::new()))?;
    ctx.register(Box::new(SceneThrottlerModule::new()))?;
    ctx.register(Box::new(LightingBatcherModule::new(Box::new(|cell| {
        log::trace!("recomputing lighting for cell {cell:?}");
    }))))?;
    ctx.register(Box::new(FramePacerModule::new()))?;

    if ctx.config().global.auto_configure {
        ctx.apply_auto_configuration();
    }

    run_synthetic_scene(&mut ctx);

    log::info!(
        "Controller metrics after {} frames:\n{}",
        ctx.controller().current_frame(),
        ctx.controller().metrics()
    );
    if let Some(culler) = ctx.controller().module_as::<SceneCullerModule>("scene_culler") {
        log::info!("Culler metrics:\n{}", culler.metrics());
    }

    ctx.shutdown();
    ctx.config().save(Path::new(CONFIG_PATH))?;
    Ok(())
}

/// Drives a handful of scripted objects through the query surfaces.
fn run_synthetic_scene(ctx: &mut EngineContext) {
    let view = Viewpoint::new(Vec3::ZERO, Vec3::Z);

    for frame in 0..FRAMES {
        ctx.tick();

        // A wandering neutral, a distant decoration, and a hostile closing in.
        let wanderer = ObjectState {
            velocity: Vec3::new(0.2, 0.0, 0.0),
            ..ObjectState::at(
                ObjectClass::Neutral,
                Vec3::new(30.0 + (frame % 20) as f32, 0.0, 40.0),
            )
        };
        let decoration = ObjectState::at(ObjectClass::Decoration, Vec3::new(0.0, 0.0, 90.0));
        let hostile = ObjectState::at(
            ObjectClass::Hostile,
            Vec3::new(0.0, 0.0, 120.0 - (frame as f32) * 0.4),
        );

        let controller = ctx.controller_mut();
        if let Some(culler) = controller.module_as_mut::<SceneCullerModule>("scene_culler") {
            for object in [&wanderer, &decoration, &hostile] {
                if !culler.should_skip(object, &view) {
                    let _band = culler.current_lod(object, &view);
                }
            }
        }
        if let Some(throttler) =
            controller.module_as_mut::<SceneThrottlerModule>("scene_throttler")
        {
            throttler.should_tick_this_frame(ObjectHandle(0), &wanderer, &view);
            throttler.should_tick_this_frame(ObjectHandle(1), &decoration, &view);
            throttler.should_tick_this_frame(ObjectHandle(2), &hostile, &view);
        }
        if frame % 30 == 0 {
            if let Some(lighting) =
                controller.module_as_mut::<LightingBatcherModule>("lighting_batcher")
            {
                let cell = CellPos::new(frame as i32, 0, 64);
                let dist_sq = view.distance_squared_to(Vec3::new(
                    cell.x as f32,
                    cell.y as f32,
                    cell.z as f32,
                ));
                lighting.schedule(cell, priority_for_distance_sq(dist_sq));
            }
        }
    }
}
