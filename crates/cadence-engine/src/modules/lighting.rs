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

//! Lighting recalculation batching module.
//!
//! Owns the recalculation queue and the external recompute callback the
//! actual light-propagation backend supplies. While enabled and deferring,
//! pending recalculations drain each frame within the update budget; on
//! disable the queue drains synchronously so no stale lighting is left
//! behind.

use std::any::Any;

use cadence_core::metrics::ModuleMetrics;
use cadence_core::module::{ModuleCategory, ModuleInit, OptimizationModule, TickContext};

use crate::batch::{CellPos, RecalcQueue, RecalcScheduler};

/// Registry id of the lighting batcher.
pub const MODULE_ID: &str = "lighting_batcher";

/// Default per-frame drain cap.
const DEFAULT_BATCH_SIZE: u64 = 128;

/// Callback into the external light-propagation backend.
pub type RecomputeFn = Box<dyn FnMut(CellPos) + Send>;

/// Batches and prioritizes derived-lighting recalculation.
pub struct LightingBatcherModule {
    queue: RecalcQueue,
    recompute: RecomputeFn,
    defer_updates: bool,
    metrics: ModuleMetrics,
}

impl LightingBatcherModule {
    /// Creates the module around the backend's recompute function.
    pub fn new(recompute: RecomputeFn) -> Self {
        Self {
            queue: RecalcQueue::new(DEFAULT_BATCH_SIZE as usize),
            recompute,
            defer_updates: true,
            metrics: ModuleMetrics::new(),
        }
    }

    /// Producer handle for worker threads (e.g. a chunk load completing).
    pub fn scheduler(&self) -> RecalcScheduler {
        self.queue.scheduler()
    }

    /// Schedules a recalculation from the tick thread.
    pub fn schedule(&self, cell: CellPos, priority: u32) {
        self.queue.schedule(cell, priority);
    }

    /// Whether the cell's region has a recalculation pending, letting the
    /// render backend treat its light values as unstable.
    pub fn has_pending(&mut self, cell: CellPos) -> bool {
        self.queue.has_pending_region(cell)
    }

    /// Number of deduplicated recalculations waiting.
    pub fn pending_len(&mut self) -> usize {
        self.queue.pending_len()
    }
}

impl OptimizationModule for LightingBatcherModule {
    fn module_id(&self) -> &'static str {
        MODULE_ID
    }

    fn display_name(&self) -> &'static str {
        "Lighting Batcher"
    }

    fn category(&self) -> ModuleCategory {
        ModuleCategory::Lighting
    }

    fn priority(&self) -> i32 {
        400
    }

    fn metrics(&self) -> &ModuleMetrics {
        &self.metrics
    }

    fn on_initialize(&mut self, init: &ModuleInit<'_>) -> anyhow::Result<()> {
        let batch_size = init
            .config
            .setting_u64(MODULE_ID, "batch_size", DEFAULT_BATCH_SIZE)
            .max(1);
        self.defer_updates = init.config.setting_bool(MODULE_ID, "defer_updates", true);
        self.queue.set_batch_size(batch_size as usize);
        log::info!(
            "Lighting batcher: batch_size={batch_size}, defer_updates={}",
            self.defer_updates
        );
        Ok(())
    }

    fn on_disable(&mut self) {
        // Flush synchronously so no stale derived state survives the disable.
        let flushed = self.queue.drain_all(&mut self.recompute);
        if flushed > 0 {
            log::info!("Lighting batcher flushed {flushed} pending updates on disable");
        }
    }

    fn on_tick(&mut self, ctx: &mut TickContext<'_>) -> anyhow::Result<()> {
        let processed = if self.defer_updates {
            self.queue.drain(&mut *ctx.budget, &mut self.recompute)
        } else {
            self.queue.drain_all(&mut self.recompute)
        };

        self.metrics
            .set_gauge("updates_processed", processed as i64);
        self.metrics
            .set_gauge("pending_updates", self.queue.pending_len() as i64);
        self.metrics
            .add_to_counter("total_processed", processed as u64);
        Ok(())
    }

    fn on_shutdown(&mut self) -> anyhow::Result<()> {
        let dropped = self.queue.pending_len();
        if dropped > 0 {
            log::debug!("Lighting batcher shut down with {dropped} updates outstanding");
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::priority_for_distance_sq;
    use crate::budget::FrameBudgetManager;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_module() -> (LightingBatcherModule, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let module = LightingBatcherModule::new(Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        (module, count)
    }

    #[test]
    fn test_tick_drains_scheduled_updates() {
        let (mut module, count) = counting_module();
        module.schedule(CellPos::new(0, 0, 0), priority_for_distance_sq(4.0));
        module.schedule(CellPos::new(64, 0, 0), priority_for_distance_sq(900.0));

        let mut budget = FrameBudgetManager::new();
        budget.begin_frame();
        let mut ctx = TickContext {
            frame: 1,
            budget: &mut budget,
        };
        module.on_tick(&mut ctx).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(module.pending_len(), 0);
    }

    #[test]
    fn test_disable_flushes_synchronously() {
        let (mut module, count) = counting_module();
        for x in 0..6 {
            module.schedule(CellPos::new(x * 16, 0, 0), 100);
        }
        module.on_disable();
        assert_eq!(count.load(Ordering::SeqCst), 6);
        assert_eq!(module.pending_len(), 0);
    }
}
