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

//! Distance and view-direction culling.
//!
//! Checks are ordered cheapest first: flag exemptions, then a squared
//! distance comparison, then a single dot product for the behind-view test.
//! The behind margin and the aggressive threshold are empirically chosen
//! constants carried over from field tuning; they are kept configurable
//! rather than re-derived.

use cadence_core::scene::{ObjectClass, ObjectState, Viewpoint};

/// Default culling distance in world units.
pub const DEFAULT_CULL_DISTANCE: f32 = 64.0;
/// Objects nearer than this are exempt from the behind-view test.
const BEHIND_TEST_MIN_DISTANCE_SQ: f32 = 400.0; // 20 units
/// Dot-product margin below which an object counts as behind the view.
/// Slightly negative so objects at the edge of the view do not pop.
const DEFAULT_BEHIND_MARGIN: f32 = -10.0;
/// Aggressive mode culls decorations beyond this distance.
const AGGRESSIVE_DISTANCE_SQ: f32 = 256.0; // 16 units

/// Configuration for the culling decision.
#[derive(Debug, Clone, Copy)]
pub struct CullPolicy {
    /// Squared culling distance.
    pub culling_distance_sq: f32,
    /// Additionally cull decorations at medium distance.
    pub aggressive: bool,
    /// Behind-view dot-product margin.
    pub behind_margin: f32,
}

impl CullPolicy {
    /// Builds a policy from a culling distance in world units.
    pub fn new(culling_distance: f32, aggressive: bool) -> Self {
        Self {
            culling_distance_sq: culling_distance * culling_distance,
            aggressive,
            behind_margin: DEFAULT_BEHIND_MARGIN,
        }
    }

    /// Decides whether the object should be skipped entirely this frame.
    ///
    /// Must stay cheap: it runs once per object per frame, and has to cost
    /// less than the rendering it saves.
    pub fn should_cull(&self, object: &ObjectState, view: &Viewpoint) -> bool {
        if object.never_cull
            || object.attached_to_viewer
            || object.class == ObjectClass::Avatar
        {
            return false;
        }

        let offset = object.position - view.position;
        let dist_sq = offset.length_squared();

        if dist_sq > self.culling_distance_sq {
            return true;
        }

        if dist_sq > BEHIND_TEST_MIN_DISTANCE_SQ && offset.dot(view.forward) < self.behind_margin
        {
            return true;
        }

        if self.aggressive
            && dist_sq > AGGRESSIVE_DISTANCE_SQ
            && object.class == ObjectClass::Decoration
        {
            return true;
        }

        false
    }
}

impl Default for CullPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_CULL_DISTANCE, false)
    }
}
