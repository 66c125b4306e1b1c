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

//! sysinfo-based hardware snapshot probe.
//!
//! Runs once at startup and never again; everything downstream treats the
//! returned snapshot as constant for the session. Values sysinfo cannot
//! provide on a platform are estimated conservatively so classification
//! degrades toward a lower tier rather than failing.

use cadence_core::hardware::HardwareSnapshot;
use sysinfo::System;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Collects the one-time hardware snapshot.
pub fn detect_snapshot() -> HardwareSnapshot {
    log::info!("Starting hardware detection");

    let mut system = System::new_all();
    system.refresh_all();

    let cpu_threads = system.cpus().len().max(1) as u32;
    let cpu_cores = System::physical_core_count()
        .map(|cores| cores as u32)
        .unwrap_or_else(|| {
            log::warn!("Physical core count unavailable, assuming SMT pairs");
            (cpu_threads / 2).max(1)
        });

    let total_memory_mb = system.total_memory() / BYTES_PER_MB;
    let heap_limit_mb = heap_limit_mb(&system, total_memory_mb);

    let snapshot = HardwareSnapshot {
        cpu_cores,
        cpu_threads,
        total_memory_mb,
        heap_limit_mb,
    };
    log::info!(
        "Hardware detection complete: {} cores, {} threads, {}MB RAM, {}MB limit",
        snapshot.cpu_cores,
        snapshot.cpu_threads,
        snapshot.total_memory_mb,
        snapshot.heap_limit_mb
    );
    snapshot
}

/// The memory ceiling for this process: the cgroup limit when the process
/// runs inside one, otherwise the memory currently available, clamped to
/// the physical total.
fn heap_limit_mb(system: &System, total_memory_mb: u64) -> u64 {
    if let Some(limits) = system.cgroup_limits() {
        let limit_mb = limits.total_memory / BYTES_PER_MB;
        if limit_mb > 0 && limit_mb < total_memory_mb {
            return limit_mb;
        }
    }

    let available_mb = system.available_memory() / BYTES_PER_MB;
    if available_mb == 0 {
        log::warn!("Available memory unreadable, falling back to total");
        return total_memory_mb;
    }
    available_mb.min(total_memory_mb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::hardware::classify;

    #[test]
    fn test_snapshot_has_sane_values() {
        let snapshot = detect_snapshot();
        assert!(snapshot.cpu_threads >= 1);
        assert!(snapshot.cpu_cores >= 1);
        assert!(snapshot.cpu_cores <= snapshot.cpu_threads);
        assert!(snapshot.heap_limit_mb <= snapshot.total_memory_mb);
    }

    #[test]
    fn test_snapshot_classifies_without_panicking() {
        let snapshot = detect_snapshot();
        let _ = classify(&snapshot);
    }
}
