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

//! Engine configuration: global flags, per-module enable states, and
//! per-module key/value settings.
//!
//! The store is read by modules at init time as plain key/value lookups and
//! persisted as a single JSON document. Saving writes a temp file and renames
//! it over the target so a crash mid-save cannot corrupt the config.
//! Hardware-tier presets bulk-set the per-module settings to values suited
//! to the classified tier.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::hardware::{HardwareProfile, HardwareTier};

/// Version stamp written into saved files; bump on breaking layout changes.
const CONFIG_VERSION: u32 = 1;

/// Errors from loading or saving the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read or written.
    #[error("config I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// The file contents were not valid configuration JSON.
    #[error("config parse failed: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Settings that apply to the engine as a whole.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalSettings {
    /// Whether tier presets are applied automatically at startup.
    pub auto_configure: bool,
    /// Enables verbose diagnostics in the host.
    pub debug_mode: bool,
    /// The tier the presets were last applied for, recorded for display.
    pub hardware_tier: String,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            auto_configure: true,
            debug_mode: false,
            hardware_tier: "Medium".to_string(),
        }
    }
}

/// The engine's configuration store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Layout version of the persisted document.
    pub version: u32,
    /// Engine-wide settings.
    pub global: GlobalSettings,
    /// Per-module enabled flags, keyed by module id. Absent means enabled.
    module_states: HashMap<String, bool>,
    /// Per-module settings, keyed by module id then setting name.
    module_settings: HashMap<String, HashMap<String, Value>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            global: GlobalSettings::default(),
            module_states: HashMap::new(),
            module_settings: HashMap::new(),
        }
    }
}

impl EngineConfig {
    /// Creates a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a JSON file, or returns defaults if the file
    /// does not exist yet.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!("No configuration file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let mut config: EngineConfig = serde_json::from_str(&content)?;
        if config.version < CONFIG_VERSION {
            log::info!(
                "Migrating configuration from version {} to {}",
                config.version,
                CONFIG_VERSION
            );
            config.version = CONFIG_VERSION;
        }
        log::info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Saves the configuration as pretty-printed JSON.
    ///
    /// Writes to a sibling temp file and renames it over the target so the
    /// save is atomic with respect to crashes.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        log::info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Whether a module should be enabled. Unknown modules default to enabled.
    pub fn is_module_enabled(&self, module_id: &str) -> bool {
        self.module_states.get(module_id).copied().unwrap_or(true)
    }

    /// Records a module's enabled state.
    pub fn set_module_enabled(&mut self, module_id: &str, enabled: bool) {
        self.module_states.insert(module_id.to_string(), enabled);
    }

    /// Sets a per-module setting.
    pub fn set_setting(&mut self, module_id: &str, key: &str, value: Value) {
        self.module_settings
            .entry(module_id.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    fn setting(&self, module_id: &str, key: &str) -> Option<&Value> {
        self.module_settings.get(module_id)?.get(key)
    }

    /// Reads an unsigned integer setting, falling back to a default.
    pub fn setting_u64(&self, module_id: &str, key: &str, default: u64) -> u64 {
        self.setting(module_id, key)
            .and_then(Value::as_u64)
            .unwrap_or(default)
    }

    /// Reads a float setting, falling back to a default.
    pub fn setting_f64(&self, module_id: &str, key: &str, default: f64) -> f64 {
        self.setting(module_id, key)
            .and_then(Value::as_f64)
            .unwrap_or(default)
    }

    /// Reads a boolean setting, falling back to a default.
    pub fn setting_bool(&self, module_id: &str, key: &str, default: bool) -> bool {
        self.setting(module_id, key)
            .and_then(Value::as_bool)
            .unwrap_or(default)
    }

    /// Bulk-sets per-module settings to the presets for the profile's tier
    /// and records the tier in the global settings.
    pub fn apply_tier_presets(&mut self, profile: &HardwareProfile) {
        let tier = profile.tier();
        self.global.hardware_tier = tier.to_string();

        let (cull_distance, aggressive, idle_interval, distant_interval, batch_size, defer) =
            match tier {
                HardwareTier::Low => (32u64, true, 4u64, 3u64, 64u64, true),
                HardwareTier::Medium => (48, false, 3, 2, 128, true),
                HardwareTier::High => (64, false, 2, 1, 256, false),
                HardwareTier::Ultra => (96, false, 1, 1, 512, false),
            };

        self.set_setting("scene_culler", "culling_distance", cull_distance.into());
        self.set_setting("scene_culler", "aggressive_mode", aggressive.into());
        self.set_setting("scene_throttler", "idle_interval", idle_interval.into());
        self.set_setting(
            "scene_throttler",
            "distant_interval",
            distant_interval.into(),
        );
        self.set_setting("lighting_batcher", "batch_size", batch_size.into());
        self.set_setting("lighting_batcher", "defer_updates", defer.into());

        log::info!("Applied {tier} tier presets");
    }
}
