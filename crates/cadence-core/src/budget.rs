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

//! The frame-budget contract consulted by modules during their per-frame tick.
//!
//! The concrete budget manager lives in the engine crate; this trait is the
//! seam that lets modules (and tests) depend only on the contract. Budget
//! checks are cooperative: a caller that ignores them can still overrun the
//! frame, so the design relies on callers being well-behaved rather than on
//! preemption.

use std::time::Duration;

/// The category of work a slice of frame time is charged against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BudgetCategory {
    /// Drawing: entities, geometry, particles.
    Render,
    /// Simulation and derived-state work: object ticks, recalculation batches.
    Update,
    /// Everything else: input, audio, bookkeeping.
    Misc,
}

impl BudgetCategory {
    /// The share of the target frame time allotted to this category.
    pub fn share(self) -> f64 {
        match self {
            BudgetCategory::Render => 0.60,
            BudgetCategory::Update => 0.30,
            BudgetCategory::Misc => 0.10,
        }
    }
}

impl std::fmt::Display for BudgetCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BudgetCategory::Render => write!(f, "render"),
            BudgetCategory::Update => write!(f, "update"),
            BudgetCategory::Misc => write!(f, "misc"),
        }
    }
}

/// Per-frame time accounting consulted by modules before doing work.
pub trait FrameBudget {
    /// Returns `true` while the category is under its allotment AND the frame
    /// as a whole is under the current target. The double gate keeps a single
    /// category from monopolizing the frame even when under its own allotment.
    fn has_budget(&self, category: BudgetCategory) -> bool;

    /// Charges elapsed time against a category.
    fn record(&mut self, category: BudgetCategory, elapsed: Duration);

    /// Runs `work` immediately if update budget remains, charging its actual
    /// elapsed time; otherwise defers it with the given priority. Returns
    /// whether the work ran immediately. Never blocks.
    fn execute_or_defer(
        &mut self,
        work: Box<dyn FnOnce() + Send>,
        estimated_cost: Duration,
        priority: i32,
    ) -> bool;

    /// Wall time measured for the most recently completed frame.
    fn last_frame_time(&self) -> Duration;

    /// The frame-time target currently in effect.
    fn current_target(&self) -> Duration;

    /// Number of tasks waiting in the deferred queue.
    fn deferred_len(&self) -> usize;
}
