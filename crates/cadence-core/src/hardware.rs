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

//! Hardware tier classification.
//!
//! An external probe supplies a [`HardwareSnapshot`] once at startup; the
//! pure [`classify`] function maps it to one of four ordinal tiers, and the
//! resulting [`HardwareProfile`] stays constant for the lifetime of the
//! session. The tier drives the auto-configuration presets and per-module
//! defaults; no code here performs I/O or re-detects hardware.

use serde::{Deserialize, Serialize};

/// Weight of the CPU sub-score in the composite tier calculation.
const CPU_WEIGHT: f64 = 0.5;
/// Weight of the heap-limit sub-score.
const HEAP_WEIGHT: f64 = 0.3;
/// Weight of the system-RAM sub-score.
const RAM_WEIGHT: f64 = 0.2;

/// One-time hardware measurements supplied by an external detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareSnapshot {
    /// Physical CPU core count.
    pub cpu_cores: u32,
    /// Logical CPU thread count (may exceed cores with SMT).
    pub cpu_threads: u32,
    /// Total system memory in megabytes.
    pub total_memory_mb: u64,
    /// Memory ceiling available to this process in megabytes.
    pub heap_limit_mb: u64,
}

/// Ordinal hardware classification driving default budgets and thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HardwareTier {
    /// Older or budget hardware needing aggressive degradation.
    Low,
    /// Average hardware with balanced settings.
    Medium,
    /// Modern hardware with headroom for quality.
    High,
    /// High-end hardware where degradation is rarely needed.
    Ultra,
}

impl HardwareTier {
    /// Recommended worker-thread count for background pools at this tier.
    pub fn recommended_worker_threads(self) -> u32 {
        match self {
            HardwareTier::Low => 1,
            HardwareTier::Medium => 2,
            HardwareTier::High => 3,
            HardwareTier::Ultra => 4,
        }
    }

    /// Recommended view distance, in world units of 16, at this tier.
    pub fn recommended_view_distance(self) -> u32 {
        match self {
            HardwareTier::Low => 6,
            HardwareTier::Medium => 10,
            HardwareTier::High => 16,
            HardwareTier::Ultra => 24,
        }
    }
}

impl std::fmt::Display for HardwareTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Buckets a physical core count into a 1–4 sub-score.
fn cpu_score(cores: u32) -> u32 {
    match cores {
        c if c >= 8 => 4,
        c if c >= 6 => 3,
        c if c >= 4 => 2,
        _ => 1,
    }
}

/// Buckets a heap limit (MB) into a 1–4 sub-score.
fn heap_score(heap_limit_mb: u64) -> u32 {
    match heap_limit_mb {
        m if m >= 8192 => 4,
        m if m >= 4096 => 3,
        m if m >= 2048 => 2,
        _ => 1,
    }
}

/// Buckets total system RAM (MB) into a 1–4 sub-score.
fn ram_score(total_memory_mb: u64) -> u32 {
    match total_memory_mb {
        m if m >= 32768 => 4,
        m if m >= 16384 => 3,
        m if m >= 8192 => 2,
        _ => 1,
    }
}

/// Maps a hardware snapshot to a tier.
///
/// Deterministic and side-effect free. Zero (or otherwise nonsensical)
/// inputs fall into the lowest score bucket rather than failing.
pub fn classify(snapshot: &HardwareSnapshot) -> HardwareTier {
    let weighted = f64::from(cpu_score(snapshot.cpu_cores)) * CPU_WEIGHT
        + f64::from(heap_score(snapshot.heap_limit_mb)) * HEAP_WEIGHT
        + f64::from(ram_score(snapshot.total_memory_mb)) * RAM_WEIGHT;

    if weighted >= 3.5 {
        HardwareTier::Ultra
    } else if weighted >= 2.5 {
        HardwareTier::High
    } else if weighted >= 1.5 {
        HardwareTier::Medium
    } else {
        HardwareTier::Low
    }
}

/// Immutable hardware description created once at startup.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HardwareProfile {
    snapshot: HardwareSnapshot,
    tier: HardwareTier,
}

impl HardwareProfile {
    /// Builds a profile by classifying the snapshot.
    pub fn from_snapshot(snapshot: HardwareSnapshot) -> Self {
        Self {
            tier: classify(&snapshot),
            snapshot,
        }
    }

    /// The raw measurements this profile was built from.
    pub fn snapshot(&self) -> &HardwareSnapshot {
        &self.snapshot
    }

    /// The classified tier.
    pub fn tier(&self) -> HardwareTier {
        self.tier
    }

    /// Worker-thread count derived from the logical thread count, leaving at
    /// least two threads for the host's main loop and the OS, and capping at
    /// half the available threads.
    pub fn worker_threads_from_host(&self) -> u32 {
        let threads = self.snapshot.cpu_threads;
        let available = threads.saturating_sub(2);
        available.min(threads / 2).max(1)
    }

    /// One-line description for startup logging.
    pub fn summary(&self) -> String {
        format!(
            "tier={}, cpu={} cores/{} threads, memory={}MB heap/{}MB total",
            self.tier,
            self.snapshot.cpu_cores,
            self.snapshot.cpu_threads,
            self.snapshot.heap_limit_mb,
            self.snapshot.total_memory_mb,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(cores: u32, threads: u32, total_mb: u64, heap_mb: u64) -> HardwareSnapshot {
        HardwareSnapshot {
            cpu_cores: cores,
            cpu_threads: threads,
            total_memory_mb: total_mb,
            heap_limit_mb: heap_mb,
        }
    }

    #[test]
    fn test_high_end_machine_is_ultra() {
        // 8 cores / 16 threads / 32 GB RAM / 8 GB heap: all sub-scores max out.
        let tier = classify(&snapshot(8, 16, 32768, 8192));
        assert_eq!(tier, HardwareTier::Ultra);
    }

    #[test]
    fn test_zero_inputs_are_low() {
        assert_eq!(classify(&snapshot(0, 0, 0, 0)), HardwareTier::Low);
    }

    #[test]
    fn test_mid_range_is_medium() {
        // 4 cores, 4 GB heap, 8 GB RAM: 2*0.5 + 3*0.3 + 2*0.2 = 2.3
        assert_eq!(classify(&snapshot(4, 8, 8192, 4096)), HardwareTier::Medium);
    }

    #[test]
    fn test_six_core_gaming_box_is_high() {
        // 3*0.5 + 3*0.3 + 3*0.2 = 3.0
        assert_eq!(classify(&snapshot(6, 12, 16384, 4096)), HardwareTier::High);
    }

    #[test]
    fn test_tier_tables_are_monotonic() {
        let tiers = [
            HardwareTier::Low,
            HardwareTier::Medium,
            HardwareTier::High,
            HardwareTier::Ultra,
        ];
        for pair in tiers.windows(2) {
            assert!(
                pair[0].recommended_worker_threads() < pair[1].recommended_worker_threads()
            );
            assert!(pair[0].recommended_view_distance() < pair[1].recommended_view_distance());
        }
    }

    #[test]
    fn test_worker_threads_leave_host_headroom() {
        let profile = HardwareProfile::from_snapshot(snapshot(8, 16, 32768, 8192));
        assert_eq!(profile.worker_threads_from_host(), 8);
        let small = HardwareProfile::from_snapshot(snapshot(2, 2, 4096, 1024));
        assert_eq!(small.worker_threads_from_host(), 1);
    }
}
