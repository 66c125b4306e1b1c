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

//! Batched, prioritized derived-state recalculation.
//!
//! Recalculation cost (e.g. lighting) scales with how many triggering events
//! are batched together, so requests are collected instead of processed
//! immediately. Requests for the same coarse region collapse to one pending
//! entry, ordering is by a four-tier distance priority, and each frame
//! drains at most `batch_size` entries while update budget remains.
//!
//! Producers may live on worker threads (a chunk finishing its load, for
//! example), so the inlet is a channel; all draining and decision logic
//! stays on the tick thread.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::time::Instant;

use cadence_core::budget::{BudgetCategory, FrameBudget};

/// Side length of the dedup region, in cells.
const REGION_SIZE_SHIFT: i32 = 4; // 16^3 cells per region

/// Position of a cell whose derived state needs recalculating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellPos {
    /// Cell x coordinate.
    pub x: i32,
    /// Cell y coordinate.
    pub y: i32,
    /// Cell z coordinate.
    pub z: i32,
}

impl CellPos {
    /// Creates a cell position.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Packs the enclosing 16³ region into a single key. Nearby cells share
    /// a key, which is what the dedup set collapses on.
    pub fn region_key(&self) -> u64 {
        let rx = (self.x >> REGION_SIZE_SHIFT) as u64 & 0x1F_FFFF;
        let ry = (self.y >> REGION_SIZE_SHIFT) as u64 & 0x3FF;
        let rz = (self.z >> REGION_SIZE_SHIFT) as u64 & 0x1F_FFFF;
        (rx << 31) | (ry << 21) | rz
    }
}

/// Buckets a squared distance to the viewpoint into one of four fixed
/// priority tiers. Coarse on purpose: ordering stays cheap and stable.
pub fn priority_for_distance_sq(dist_sq: f32) -> u32 {
    if dist_sq < 16.0 {
        1000
    } else if dist_sq < 256.0 {
        500
    } else if dist_sq < 1024.0 {
        100
    } else {
        10
    }
}

/// A recalculation request traveling through the inlet.
#[derive(Debug, Clone, Copy)]
struct Request {
    cell: CellPos,
    priority: u32,
}

struct PendingEntry {
    cell: CellPos,
    priority: u32,
    seq: u64,
}

impl PartialEq for PendingEntry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for PendingEntry {}

impl PartialOrd for PendingEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingEntry {
    // Max-heap: higher tier first, earlier request among equals.
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Cloneable producer handle for scheduling recalculations from any thread.
#[derive(Debug, Clone)]
pub struct RecalcScheduler {
    tx: flume::Sender<Request>,
}

impl RecalcScheduler {
    /// Schedules a recalculation for the cell at the given priority tier.
    /// Safe to call concurrently with the tick thread's drain.
    pub fn schedule(&self, cell: CellPos, priority: u32) {
        if let Err(e) = self.tx.send(Request { cell, priority }) {
            log::error!("Failed to schedule recalculation: {e}. Queue likely dropped.");
        }
    }
}

/// Bounded-work, deduplicating, priority-ordered recalculation queue.
pub struct RecalcQueue {
    tx: flume::Sender<Request>,
    rx: flume::Receiver<Request>,
    pending: BinaryHeap<PendingEntry>,
    pending_regions: HashSet<u64>,
    batch_size: usize,
    next_seq: u64,
}

impl RecalcQueue {
    /// Creates a queue that drains up to `batch_size` entries per frame.
    pub fn new(batch_size: usize) -> Self {
        let (tx, rx) = flume::unbounded();
        Self {
            tx,
            rx,
            pending: BinaryHeap::new(),
            pending_regions: HashSet::new(),
            batch_size: batch_size.max(1),
            next_seq: 0,
        }
    }

    /// Changes the per-frame drain cap.
    pub fn set_batch_size(&mut self, batch_size: usize) {
        self.batch_size = batch_size.max(1);
    }

    /// Returns a producer handle for worker threads.
    pub fn scheduler(&self) -> RecalcScheduler {
        RecalcScheduler {
            tx: self.tx.clone(),
        }
    }

    /// Schedules from the tick thread directly.
    pub fn schedule(&self, cell: CellPos, priority: u32) {
        self.scheduler().schedule(cell, priority);
    }

    /// Moves inlet requests into the pending heap, collapsing requests whose
    /// region is already pending.
    fn absorb_inlet(&mut self) {
        while let Ok(request) = self.rx.try_recv() {
            if self.pending_regions.insert(request.cell.region_key()) {
                self.pending.push(PendingEntry {
                    cell: request.cell,
                    priority: request.priority,
                    seq: self.next_seq,
                });
                self.next_seq += 1;
            }
        }
    }

    /// Drains up to `batch_size` highest-priority entries while update
    /// budget remains, invoking `recompute` for each and charging its cost.
    /// Returns the number of entries processed; the rest stay queued.
    pub fn drain(
        &mut self,
        budget: &mut dyn FrameBudget,
        recompute: &mut dyn FnMut(CellPos),
    ) -> usize {
        self.absorb_inlet();

        let mut processed = 0;
        while processed < self.batch_size && budget.has_budget(BudgetCategory::Update) {
            let Some(entry) = self.pending.pop() else {
                break;
            };
            self.pending_regions.remove(&entry.cell.region_key());
            let start = Instant::now();
            recompute(entry.cell);
            budget.record(BudgetCategory::Update, start.elapsed());
            processed += 1;
        }
        processed
    }

    /// Synchronously drains everything, ignoring budgets and the batch cap.
    /// Used on disable so no stale derived state is left behind.
    pub fn drain_all(&mut self, recompute: &mut dyn FnMut(CellPos)) -> usize {
        self.absorb_inlet();
        let mut processed = 0;
        while let Some(entry) = self.pending.pop() {
            self.pending_regions.remove(&entry.cell.region_key());
            recompute(entry.cell);
            processed += 1;
        }
        processed
    }

    /// Number of deduplicated entries waiting, after absorbing the inlet.
    pub fn pending_len(&mut self) -> usize {
        self.absorb_inlet();
        self.pending.len()
    }

    /// Whether the cell's region already has a pending recalculation.
    pub fn has_pending_region(&mut self, cell: CellPos) -> bool {
        self.absorb_inlet();
        self.pending_regions.contains(&cell.region_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::FrameBudgetManager;

    #[test]
    fn test_same_region_requests_collapse() {
        let mut queue = RecalcQueue::new(64);
        queue.schedule(CellPos::new(1, 1, 1), 500);
        queue.schedule(CellPos::new(2, 3, 4), 500); // same 16^3 region
        queue.schedule(CellPos::new(40, 1, 1), 100); // different region
        assert_eq!(queue.pending_len(), 2);
    }

    #[test]
    fn test_drain_orders_by_tier_and_caps_at_batch_size() {
        let mut queue = RecalcQueue::new(2);
        let mut budget = FrameBudgetManager::new();
        budget.begin_frame();

        queue.schedule(CellPos::new(100, 0, 0), 10);
        queue.schedule(CellPos::new(0, 0, 0), 1000);
        queue.schedule(CellPos::new(40, 0, 0), 500);

        let mut drained = Vec::new();
        let processed = queue.drain(&mut budget, &mut |cell| drained.push(cell.x));
        assert_eq!(processed, 2);
        assert_eq!(drained, vec![0, 40]);
        assert_eq!(queue.pending_len(), 1);
    }

    #[test]
    fn test_drain_all_empties_the_queue() {
        let mut queue = RecalcQueue::new(1);
        for x in 0..5 {
            queue.schedule(CellPos::new(x * 16, 0, 0), 100);
        }
        let mut count = 0;
        queue.drain_all(&mut |_| count += 1);
        assert_eq!(count, 5);
        assert_eq!(queue.pending_len(), 0);
    }

    #[test]
    fn test_region_becomes_schedulable_after_drain() {
        let mut queue = RecalcQueue::new(8);
        let cell = CellPos::new(5, 5, 5);
        queue.schedule(cell, 500);
        assert!(queue.has_pending_region(cell));

        queue.drain_all(&mut |_| {});
        assert!(!queue.has_pending_region(cell));

        queue.schedule(cell, 500);
        assert_eq!(queue.pending_len(), 1);
    }

    #[test]
    fn test_cross_thread_scheduling() {
        let mut queue = RecalcQueue::new(16);
        let scheduler = queue.scheduler();
        let handle = std::thread::spawn(move || {
            for x in 0..4 {
                scheduler.schedule(CellPos::new(x * 16, 0, 0), 100);
            }
        });
        handle.join().unwrap();
        assert_eq!(queue.pending_len(), 4);
    }

    #[test]
    fn test_priority_tiers() {
        assert_eq!(priority_for_distance_sq(4.0), 1000);
        assert_eq!(priority_for_distance_sq(100.0), 500);
        assert_eq!(priority_for_distance_sq(900.0), 100);
        assert_eq!(priority_for_distance_sq(90000.0), 10);
    }
}
