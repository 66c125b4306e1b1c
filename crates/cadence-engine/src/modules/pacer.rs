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

//! Frame pacing diagnostics.
//!
//! Tracks recent frame times in a fixed ring, flags spikes that exceed the
//! stutter threshold, and publishes min/max/average gauges. The budget
//! manager does the actual adaptation; this module gives the host the
//! numbers to display and alarm on.

use std::any::Any;
use std::time::Duration;

use cadence_core::budget::FrameBudget;
use cadence_core::metrics::ModuleMetrics;
use cadence_core::module::{ModuleCategory, ModuleInit, OptimizationModule, TickContext};

/// Registry id of the frame pacer.
pub const MODULE_ID: &str = "frame_pacer";

/// Number of recent frames kept in the ring.
const FRAME_HISTORY: usize = 60;
/// A frame longer than this counts as a stutter.
const STUTTER_THRESHOLD: Duration = Duration::from_millis(50);

/// Frame-time spike tracking over a sliding window.
pub struct FramePacerModule {
    frame_times: [Duration; FRAME_HISTORY],
    next_slot: usize,
    samples: usize,
    stutter_count: u64,
    metrics: ModuleMetrics,
}

impl FramePacerModule {
    /// Creates the pacer with an empty history.
    pub fn new() -> Self {
        Self {
            frame_times: [Duration::ZERO; FRAME_HISTORY],
            next_slot: 0,
            samples: 0,
            stutter_count: 0,
            metrics: ModuleMetrics::new(),
        }
    }

    /// Stutters observed since the module was enabled.
    pub fn stutter_count(&self) -> u64 {
        self.stutter_count
    }

    /// Mean frame time over the window, in milliseconds.
    pub fn average_frame_time_ms(&self) -> f64 {
        if self.samples == 0 {
            return 0.0;
        }
        let total: Duration = self.frame_times[..self.samples].iter().sum();
        total.as_secs_f64() * 1000.0 / self.samples as f64
    }

    fn record(&mut self, sample: Duration) {
        self.frame_times[self.next_slot] = sample;
        self.next_slot = (self.next_slot + 1) % FRAME_HISTORY;
        self.samples = (self.samples + 1).min(FRAME_HISTORY);

        if sample > STUTTER_THRESHOLD {
            self.stutter_count += 1;
            log::debug!("Frame spike: {:.1}ms", sample.as_secs_f64() * 1000.0);
        }
    }
}

impl OptimizationModule for FramePacerModule {
    fn module_id(&self) -> &'static str {
        MODULE_ID
    }

    fn display_name(&self) -> &'static str {
        "Frame Pacer"
    }

    fn category(&self) -> ModuleCategory {
        ModuleCategory::FrameControl
    }

    fn priority(&self) -> i32 {
        150
    }

    fn metrics(&self) -> &ModuleMetrics {
        &self.metrics
    }

    fn on_initialize(&mut self, _init: &ModuleInit<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_enable(&mut self) {
        self.frame_times = [Duration::ZERO; FRAME_HISTORY];
        self.next_slot = 0;
        self.samples = 0;
        self.stutter_count = 0;
    }

    fn on_tick(&mut self, ctx: &mut TickContext<'_>) -> anyhow::Result<()> {
        let last = ctx.budget.last_frame_time();
        if !last.is_zero() {
            self.record(last);
        }

        let window = &self.frame_times[..self.samples];
        let max = window.iter().max().copied().unwrap_or_default();
        let min = window.iter().min().copied().unwrap_or_default();
        self.metrics
            .set_gauge("avg_frame_time_us", (self.average_frame_time_ms() * 1000.0) as i64);
        self.metrics
            .set_gauge("max_frame_time_us", max.as_micros() as i64);
        self.metrics
            .set_gauge("min_frame_time_us", min.as_micros() as i64);
        self.metrics.set_gauge("stutters", self.stutter_count as i64);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Default for FramePacerModule {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_spikes_increment_stutter_count() {
        let mut pacer = FramePacerModule::new();
        pacer.record(Duration::from_millis(10));
        pacer.record(Duration::from_millis(80));
        pacer.record(Duration::from_millis(12));
        assert_eq!(pacer.stutter_count(), 1);
    }

    #[test]
    fn test_window_wraps_without_growing() {
        let mut pacer = FramePacerModule::new();
        for _ in 0..200 {
            pacer.record(Duration::from_millis(16));
        }
        assert_eq!(pacer.samples, FRAME_HISTORY);
        assert_relative_eq!(pacer.average_frame_time_ms(), 16.0, epsilon = 0.5);
    }
}
