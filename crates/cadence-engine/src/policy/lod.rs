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

//! Importance-weighted level-of-detail banding.
//!
//! Raw distance is scaled by the object's priority multiplier before being
//! bucketed into five bands, so important objects hold detail farther out
//! and unimportant ones shed it sooner. Critical-priority objects resolve
//! to full detail unconditionally.

use cadence_core::scene::{DetailPriority, ObjectState, Viewpoint};

/// Discrete rendering-fidelity band assigned by effective distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DetailBand {
    /// Complete rendering with all effects.
    Full,
    /// Full model, reduced animation rate.
    High,
    /// Simplified rendering: fewer particles, no shadows.
    Medium,
    /// Minimal rendering.
    Low,
    /// Not rendered at all.
    Culled,
}

impl DetailBand {
    /// Band edges in effective world units: 16 / 32 / 64 / 128.
    pub fn for_distance(effective_distance: f32) -> Self {
        if effective_distance < 16.0 {
            DetailBand::Full
        } else if effective_distance < 32.0 {
            DetailBand::High
        } else if effective_distance < 64.0 {
            DetailBand::Medium
        } else if effective_distance < 128.0 {
            DetailBand::Low
        } else {
            DetailBand::Culled
        }
    }

    /// Frames between animation updates at this band; `None` means the
    /// animation never updates.
    pub fn animation_interval(self) -> Option<u32> {
        match self {
            DetailBand::Full => Some(1),
            DetailBand::High => Some(2),
            DetailBand::Medium => Some(4),
            DetailBand::Low => Some(8),
            DetailBand::Culled => None,
        }
    }

    /// Particle spawn-rate multiplier at this band.
    pub fn particle_density(self) -> f32 {
        match self {
            DetailBand::Full => 1.0,
            DetailBand::High => 0.75,
            DetailBand::Medium => 0.5,
            DetailBand::Low => 0.25,
            DetailBand::Culled => 0.0,
        }
    }

    /// Whether shadows are still rendered at this band.
    pub fn renders_shadow(self) -> bool {
        matches!(self, DetailBand::Full | DetailBand::High)
    }
}

/// Resolves the detail band for an object as seen from the viewpoint.
pub fn detail_band(object: &ObjectState, view: &Viewpoint) -> DetailBand {
    let priority = object.class.detail_priority();
    if priority == DetailPriority::Critical {
        return DetailBand::Full;
    }
    let distance = view.distance_squared_to(object.position).sqrt();
    DetailBand::for_distance(distance * priority.distance_multiplier())
}

/// Whether an animation at this band should advance on the given frame.
pub fn should_update_animation(band: DetailBand, frame: u64) -> bool {
    match band.animation_interval() {
        Some(interval) => frame % u64::from(interval) == 0,
        None => false,
    }
}
