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

//! Thread-safe metric containers for optimization modules.
//!
//! Counters accumulate event totals (e.g. `objects_culled`); gauges hold
//! current values (e.g. `pending_updates`). Updates may come from the tick
//! thread or from worker threads reporting completions, so access is guarded.

use std::collections::HashMap;
use std::sync::Mutex;

/// Named counters and gauges collected by a module.
#[derive(Debug, Default)]
pub struct ModuleMetrics {
    counters: Mutex<HashMap<String, u64>>,
    gauges: Mutex<HashMap<String, i64>>,
}

impl ModuleMetrics {
    /// Creates an empty metrics container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments a counter by one, creating it at zero if absent.
    pub fn increment_counter(&self, name: &str) {
        self.add_to_counter(name, 1);
    }

    /// Adds an amount to a counter, creating it at zero if absent.
    pub fn add_to_counter(&self, name: &str, amount: u64) {
        let mut counters = self.counters.lock().unwrap();
        *counters.entry(name.to_string()).or_insert(0) += amount;
    }

    /// Returns the current value of a counter, or 0 if it does not exist.
    pub fn counter(&self, name: &str) -> u64 {
        self.counters.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    /// Sets a gauge to a value, creating it if absent.
    pub fn set_gauge(&self, name: &str, value: i64) {
        let mut gauges = self.gauges.lock().unwrap();
        gauges.insert(name.to_string(), value);
    }

    /// Returns the current value of a gauge, or 0 if it does not exist.
    pub fn gauge(&self, name: &str) -> i64 {
        self.gauges.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    /// Returns a copy of all counters, for display or serialization.
    pub fn counters_snapshot(&self) -> HashMap<String, u64> {
        self.counters.lock().unwrap().clone()
    }

    /// Returns a copy of all gauges, for display or serialization.
    pub fn gauges_snapshot(&self) -> HashMap<String, i64> {
        self.gauges.lock().unwrap().clone()
    }

    /// Clears all counters and gauges.
    pub fn reset(&self) {
        self.counters.lock().unwrap().clear();
        self.gauges.lock().unwrap().clear();
    }
}

impl std::fmt::Display for ModuleMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut counters: Vec<_> = self.counters_snapshot().into_iter().collect();
        counters.sort();
        let mut gauges: Vec<_> = self.gauges_snapshot().into_iter().collect();
        gauges.sort();

        writeln!(f, "counters:")?;
        for (name, value) in counters {
            writeln!(f, "  {name}: {value}")?;
        }
        writeln!(f, "gauges:")?;
        for (name, value) in gauges {
            writeln!(f, "  {name}: {value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_accumulates() {
        let metrics = ModuleMetrics::new();
        metrics.increment_counter("objects_culled");
        metrics.add_to_counter("objects_culled", 4);
        assert_eq!(metrics.counter("objects_culled"), 5);
        assert_eq!(metrics.counter("missing"), 0);
    }

    #[test]
    fn test_gauge_overwrites() {
        let metrics = ModuleMetrics::new();
        metrics.set_gauge("pending", 10);
        metrics.set_gauge("pending", 3);
        assert_eq!(metrics.gauge("pending"), 3);
    }

    #[test]
    fn test_reset_clears_everything() {
        let metrics = ModuleMetrics::new();
        metrics.increment_counter("a");
        metrics.set_gauge("b", 1);
        metrics.reset();
        assert_eq!(metrics.counter("a"), 0);
        assert_eq!(metrics.gauge("b"), 0);
        assert!(metrics.counters_snapshot().is_empty());
    }
}
