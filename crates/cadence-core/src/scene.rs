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

//! Read-only scene data the host supplies to the degradation policies.
//!
//! The engine never owns the world model. The host passes a snapshot of the
//! relevant object state (position, class, activity flags) into each query,
//! and identifies objects by a stable dense handle it assigns.

use serde::{Deserialize, Serialize};

use crate::math::Vec3;

/// Stable dense index identifying an object in the host's object table.
///
/// Handles index the engine's per-object tracking arenas directly, so hosts
/// should recycle small indices rather than hand out sparse values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectHandle(pub u32);

impl ObjectHandle {
    /// The handle's arena index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Coarse classification of scene objects, supplied by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectClass {
    /// The controlled viewpoint itself or another player-like actor.
    Avatar,
    /// A major encounter actor that must never degrade.
    Boss,
    /// An actor that can threaten the viewpoint.
    Hostile,
    /// A passive actor.
    Neutral,
    /// A rideable or steerable conveyance.
    Vehicle,
    /// Non-interactive decoration.
    Decoration,
    /// A physically simulated projectile.
    Projectile,
}

/// Importance ranking used to bias level-of-detail decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DetailPriority {
    /// Never degrade, regardless of distance.
    Critical,
    /// Degrade slowly.
    High,
    /// Standard degradation.
    Normal,
    /// Degrade aggressively.
    Low,
    /// Degrade most aggressively.
    Minimal,
}

impl DetailPriority {
    /// Multiplier applied to raw distance before detail banding. Higher
    /// priority shrinks the effective distance, keeping detail longer.
    pub fn distance_multiplier(self) -> f32 {
        match self {
            DetailPriority::Critical => 0.0,
            DetailPriority::High => 0.7,
            DetailPriority::Normal => 1.0,
            DetailPriority::Low => 1.2,
            DetailPriority::Minimal => 1.5,
        }
    }
}

impl ObjectClass {
    /// The detail priority this class degrades under.
    pub fn detail_priority(self) -> DetailPriority {
        match self {
            ObjectClass::Avatar | ObjectClass::Boss => DetailPriority::Critical,
            ObjectClass::Hostile => DetailPriority::High,
            ObjectClass::Neutral | ObjectClass::Vehicle => DetailPriority::Normal,
            ObjectClass::Decoration => DetailPriority::Low,
            ObjectClass::Projectile => DetailPriority::Minimal,
        }
    }
}

/// Snapshot of one object's state, read from the host per query.
#[derive(Debug, Clone, Copy)]
pub struct ObjectState {
    /// World position.
    pub position: Vec3,
    /// Current velocity.
    pub velocity: Vec3,
    /// Host-assigned class.
    pub class: ObjectClass,
    /// Exempt from culling for correctness (the viewpoint, attachments).
    pub never_cull: bool,
    /// Physically attached to the viewpoint (mounted, carried).
    pub attached_to_viewer: bool,
    /// The object has an active target or goal.
    pub has_goal: bool,
}

impl ObjectState {
    /// A minimal state for an object of the given class at a position; flags
    /// default to off and velocity to zero.
    pub fn at(class: ObjectClass, position: Vec3) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            class,
            never_cull: false,
            attached_to_viewer: false,
            has_goal: false,
        }
    }
}

/// The controlling viewpoint the policies measure against.
#[derive(Debug, Clone, Copy)]
pub struct Viewpoint {
    /// World position of the viewpoint.
    pub position: Vec3,
    /// Unit vector the viewpoint is facing along.
    pub forward: Vec3,
}

impl Viewpoint {
    /// Creates a viewpoint, normalizing the forward vector.
    pub fn new(position: Vec3, forward: Vec3) -> Self {
        Self {
            position,
            forward: forward.normalize(),
        }
    }

    /// Squared distance from this viewpoint to a position.
    pub fn distance_squared_to(&self, position: Vec3) -> f32 {
        self.position.distance_squared(position)
    }
}
