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

//! Frame time budget management.
//!
//! Each frame gets a target duration split across work categories
//! (render/update/misc). Work that would exceed the update allotment is
//! deferred to future frames under priority ordering, and the target itself
//! adapts: a smoothed average of measured frame times switches between the
//! primary and secondary targets with a hysteresis band so the rate does not
//! oscillate.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use cadence_core::budget::{BudgetCategory, FrameBudget};

/// Primary target: 60 frames per second.
const PRIMARY_TARGET: Duration = Duration::from_nanos(16_666_666);
/// Secondary (degraded) target: 30 frames per second.
const SECONDARY_TARGET: Duration = Duration::from_nanos(33_333_333);
/// Floor for any category allotment, preventing starvation.
const MIN_ALLOTMENT: Duration = Duration::from_millis(1);
/// Smoothing factor for the frame-time moving average.
const EMA_FACTOR: f64 = 0.1;
/// The average must exceed this multiple of the primary target to degrade.
const DEGRADE_RATIO: f64 = 1.2;
/// The average must fall below this multiple of the primary target to restore.
const RESTORE_RATIO: f64 = 0.9;
/// Default cap on deferred tasks drained per frame, bounding catch-up latency.
const DEFAULT_DRAIN_CAP: usize = 16;

/// Work postponed past its original frame.
struct DeferredTask {
    work: Box<dyn FnOnce() + Send>,
    priority: i32,
    seq: u64,
    created_frame: u64,
}

impl PartialEq for DeferredTask {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for DeferredTask {}

impl PartialOrd for DeferredTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DeferredTask {
    // Max-heap: higher priority first, earlier insertion among equals.
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Per-frame budget accounting with an adaptive target and a deferred queue.
pub struct FrameBudgetManager {
    frame_start: Instant,
    frame_count: u64,
    current_target: Duration,
    average_frame_time: f64,
    last_frame_time: Duration,
    allotments: [Duration; 3],
    consumed: [Duration; 3],
    deferred: BinaryHeap<DeferredTask>,
    next_seq: u64,
    drain_cap: usize,
    work_completed_this_frame: u32,
    work_deferred_this_frame: u32,
}

impl FrameBudgetManager {
    /// Creates a manager targeting 60 FPS with default drain settings.
    pub fn new() -> Self {
        Self {
            frame_start: Instant::now(),
            frame_count: 0,
            current_target: PRIMARY_TARGET,
            average_frame_time: PRIMARY_TARGET.as_secs_f64(),
            last_frame_time: Duration::ZERO,
            allotments: [Duration::ZERO; 3],
            consumed: [Duration::ZERO; 3],
            deferred: BinaryHeap::new(),
            next_seq: 0,
            drain_cap: DEFAULT_DRAIN_CAP,
            work_completed_this_frame: 0,
            work_deferred_this_frame: 0,
        }
    }

    /// Overrides the per-frame deferred drain cap.
    pub fn set_drain_cap(&mut self, cap: usize) {
        self.drain_cap = cap;
    }

    /// Starts a frame: zeroes consumed counters, recomputes allotments from
    /// the current target, and drains deferred work while update budget and
    /// the drain cap allow.
    pub fn begin_frame(&mut self) {
        self.frame_start = Instant::now();
        self.frame_count += 1;
        self.consumed = [Duration::ZERO; 3];
        self.work_completed_this_frame = 0;
        self.work_deferred_this_frame = 0;

        for category in [
            BudgetCategory::Render,
            BudgetCategory::Update,
            BudgetCategory::Misc,
        ] {
            let share = self.current_target.mul_f64(category.share());
            self.allotments[category_index(category)] = share.max(MIN_ALLOTMENT);
        }

        self.drain_deferred();
    }

    /// Ends a frame: measures elapsed wall time, updates the moving average,
    /// and adapts the target with hysteresis.
    pub fn end_frame(&mut self) {
        self.last_frame_time = self.frame_start.elapsed();
        self.average_frame_time = self.average_frame_time * (1.0 - EMA_FACTOR)
            + self.last_frame_time.as_secs_f64() * EMA_FACTOR;
        self.adapt_target();
    }

    fn adapt_target(&mut self) {
        let primary = PRIMARY_TARGET.as_secs_f64();
        if self.average_frame_time > primary * DEGRADE_RATIO {
            if self.current_target != SECONDARY_TARGET {
                log::info!(
                    "Frame average {:.1}ms over target, degrading to 30 FPS pacing",
                    self.average_frame_time * 1000.0
                );
            }
            self.current_target = SECONDARY_TARGET;
        } else if self.average_frame_time < primary * RESTORE_RATIO {
            if self.current_target != PRIMARY_TARGET {
                log::info!(
                    "Frame average {:.1}ms recovered, restoring 60 FPS pacing",
                    self.average_frame_time * 1000.0
                );
            }
            self.current_target = PRIMARY_TARGET;
        }
    }

    fn drain_deferred(&mut self) {
        let mut processed = 0;
        while processed < self.drain_cap
            && self.has_budget(BudgetCategory::Update)
            && !self.deferred.is_empty()
        {
            if let Some(task) = self.deferred.pop() {
                let waited = self.frame_count.saturating_sub(task.created_frame);
                if waited > 120 {
                    log::debug!(
                        "Deferred task (priority {}) waited {} frames",
                        task.priority,
                        waited
                    );
                }
                let start = Instant::now();
                (task.work)();
                self.record(BudgetCategory::Update, start.elapsed());
                processed += 1;
            }
        }
        self.work_completed_this_frame += processed as u32;
    }

    /// Enqueues work for a future frame under the given priority.
    pub fn defer(&mut self, work: Box<dyn FnOnce() + Send>, priority: i32) {
        self.deferred.push(DeferredTask {
            work,
            priority,
            seq: self.next_seq,
            created_frame: self.frame_count,
        });
        self.next_seq += 1;
    }

    /// Frames started so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// The smoothed frame-time average, in seconds.
    pub fn average_frame_time_secs(&self) -> f64 {
        self.average_frame_time
    }

    /// Work items executed immediately or drained so far this frame.
    pub fn work_completed_this_frame(&self) -> u32 {
        self.work_completed_this_frame
    }

    /// Work items pushed to the deferred queue this frame.
    pub fn work_deferred_this_frame(&self) -> u32 {
        self.work_deferred_this_frame
    }

    /// Fraction of a category's allotment consumed so far this frame.
    pub fn usage(&self, category: BudgetCategory) -> f64 {
        let idx = category_index(category);
        let allotment = self.allotments[idx];
        if allotment.is_zero() {
            return 0.0;
        }
        self.consumed[idx].as_secs_f64() / allotment.as_secs_f64()
    }
}

impl Default for FrameBudgetManager {
    fn default() -> Self {
        Self::new()
    }
}

fn category_index(category: BudgetCategory) -> usize {
    match category {
        BudgetCategory::Render => 0,
        BudgetCategory::Update => 1,
        BudgetCategory::Misc => 2,
    }
}

impl FrameBudget for FrameBudgetManager {
    fn has_budget(&self, category: BudgetCategory) -> bool {
        let idx = category_index(category);
        self.consumed[idx] < self.allotments[idx]
            && self.frame_start.elapsed() < self.current_target
    }

    fn record(&mut self, category: BudgetCategory, elapsed: Duration) {
        self.consumed[category_index(category)] += elapsed;
    }

    fn execute_or_defer(
        &mut self,
        work: Box<dyn FnOnce() + Send>,
        _estimated_cost: Duration,
        priority: i32,
    ) -> bool {
        if self.has_budget(BudgetCategory::Update) {
            let start = Instant::now();
            work();
            self.record(BudgetCategory::Update, start.elapsed());
            self.work_completed_this_frame += 1;
            true
        } else {
            self.defer(work, priority);
            self.work_deferred_this_frame += 1;
            false
        }
    }

    fn last_frame_time(&self) -> Duration {
        self.last_frame_time
    }

    fn current_target(&self) -> Duration {
        self.current_target
    }

    fn deferred_len(&self) -> usize {
        self.deferred.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::Arc;

    #[test]
    fn test_allotments_follow_target_split() {
        let mut budget = FrameBudgetManager::new();
        budget.begin_frame();
        // 60% of 16.67ms = 10ms, 30% = 5ms, 10% = 1.67ms; all above the floor.
        assert_eq!(budget.allotments[0], PRIMARY_TARGET.mul_f64(0.60));
        assert_eq!(budget.allotments[1], PRIMARY_TARGET.mul_f64(0.30));
        assert_eq!(budget.allotments[2], PRIMARY_TARGET.mul_f64(0.10));
    }

    #[test]
    fn test_idle_frame_never_raises_target() {
        let mut budget = FrameBudgetManager::new();
        for _ in 0..10 {
            budget.begin_frame();
            budget.end_frame();
        }
        assert_eq!(budget.current_target(), PRIMARY_TARGET);
    }

    #[test]
    fn test_category_gate_closes_when_consumed() {
        let mut budget = FrameBudgetManager::new();
        budget.begin_frame();
        assert!(budget.has_budget(BudgetCategory::Update));
        budget.record(BudgetCategory::Update, Duration::from_millis(50));
        assert!(!budget.has_budget(BudgetCategory::Update));
        // Other categories still have their own allotments.
        assert!(budget.has_budget(BudgetCategory::Render));
    }

    #[test]
    fn test_execute_runs_immediately_with_budget() {
        let mut budget = FrameBudgetManager::new();
        budget.begin_frame();
        let ran = Arc::new(AtomicUsize::new(0));
        let flag = ran.clone();
        let immediate = budget.execute_or_defer(
            Box::new(move || {
                flag.fetch_add(1, AtomicOrdering::SeqCst);
            }),
            Duration::from_micros(10),
            0,
        );
        assert!(immediate);
        assert_eq!(ran.load(AtomicOrdering::SeqCst), 1);
        assert_eq!(budget.work_completed_this_frame(), 1);
    }

    #[test]
    fn test_exhausted_budget_defers() {
        let mut budget = FrameBudgetManager::new();
        budget.begin_frame();
        budget.record(BudgetCategory::Update, Duration::from_millis(50));
        let immediate = budget.execute_or_defer(Box::new(|| {}), Duration::from_micros(10), 3);
        assert!(!immediate);
        assert_eq!(budget.deferred_len(), 1);
        assert_eq!(budget.work_deferred_this_frame(), 1);
    }

    #[test]
    fn test_deferred_drain_respects_priority_order() {
        let mut budget = FrameBudgetManager::new();
        budget.set_drain_cap(2);

        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        for priority in [1, 5, 3] {
            let order = order.clone();
            budget.defer(
                Box::new(move || order.lock().unwrap().push(priority)),
                priority,
            );
        }

        budget.begin_frame();
        assert_eq!(*order.lock().unwrap(), vec![5, 3]);
        assert_eq!(budget.deferred_len(), 1);

        budget.begin_frame();
        assert_eq!(*order.lock().unwrap(), vec![5, 3, 1]);
        assert_eq!(budget.deferred_len(), 0);
    }

    #[test]
    fn test_deferred_fifo_among_equal_priorities() {
        let mut budget = FrameBudgetManager::new();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let order = order.clone();
            budget.defer(Box::new(move || order.lock().unwrap().push(tag)), 7);
        }
        budget.begin_frame();
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }
}
