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

//! Per-object tick-rate throttling.
//!
//! Distant or idle objects do not need full tick rate. Each tracked object
//! gets a record in an arena indexed by its host-assigned handle; the record
//! carries the assigned interval and a consecutive-skip count a renderer can
//! use to compensate visually. An explicit sweep removes records unseen for
//! a while, bounding the arena as objects leave the scene.

use cadence_core::scene::{ObjectClass, ObjectHandle, ObjectState, Viewpoint};

/// Squared radius inside which every object ticks every frame.
const ALWAYS_TICK_DISTANCE_SQ: f32 = 256.0; // 16 units
/// Squared distance edges of the interval bands.
const NEAR_BAND_SQ: f32 = 256.0; // 16 units
const MID_BAND_SQ: f32 = 1024.0; // 32 units
const FAR_BAND_SQ: f32 = 4096.0; // 64 units
/// Frames without observed activity before an object counts as idle.
const IDLE_AFTER_FRAMES: u64 = 20;
/// Squared speed below which velocity counts as negligible.
const ACTIVITY_SPEED_SQ: f32 = 0.01;

/// Configured tick intervals for the outer distance bands.
#[derive(Debug, Clone, Copy)]
pub struct ThrottlePolicy {
    /// Interval assigned to idle objects.
    pub idle_interval: u32,
    /// Interval assigned to distant but active objects.
    pub distant_interval: u32,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            idle_interval: 3,
            distant_interval: 2,
        }
    }
}

/// Tracking record for one throttled object.
#[derive(Debug, Clone, Copy)]
pub struct ThrottleRecord {
    /// Frame the object last ticked on.
    pub last_ticked_frame: u64,
    /// Frame activity (movement or a goal) was last observed.
    pub last_active_frame: u64,
    /// Frame the object was last queried, for the staleness sweep.
    pub last_seen_frame: u64,
    /// Interval currently assigned.
    pub interval: u32,
    /// Consecutive frames skipped since the last tick.
    pub skipped: u32,
}

impl ThrottleRecord {
    fn new(frame: u64) -> Self {
        Self {
            last_ticked_frame: frame,
            last_active_frame: frame,
            last_seen_frame: frame,
            interval: 1,
            skipped: 0,
        }
    }
}

/// Arena of throttle records indexed by object handle.
#[derive(Debug, Default)]
pub struct ThrottleLedger {
    records: Vec<Option<ThrottleRecord>>,
}

impl ThrottleLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    fn record_mut(&mut self, handle: ObjectHandle, frame: u64) -> &mut ThrottleRecord {
        let index = handle.index();
        if index >= self.records.len() {
            self.records.resize(index + 1, None);
        }
        self.records[index].get_or_insert_with(|| ThrottleRecord::new(frame))
    }

    /// Looks up the record for a handle, if one is tracked.
    pub fn record(&self, handle: ObjectHandle) -> Option<&ThrottleRecord> {
        self.records.get(handle.index())?.as_ref()
    }

    /// Consecutive frames the object has skipped, 0 if untracked.
    pub fn skipped_frames(&self, handle: ObjectHandle) -> u32 {
        self.record(handle).map_or(0, |r| r.skipped)
    }

    /// The interval currently assigned to the object, 1 if untracked.
    pub fn interval(&self, handle: ObjectHandle) -> u32 {
        self.record(handle).map_or(1, |r| r.interval)
    }

    /// Number of objects currently tracked.
    pub fn tracked(&self) -> usize {
        self.records.iter().filter(|r| r.is_some()).count()
    }

    /// Decides whether the object ticks on this frame.
    ///
    /// Unthrottleable objects (the viewpoint, projectiles, attachments, and
    /// anything inside the always-tick radius) tick unconditionally. For the
    /// rest, an interval is chosen from the distance band and idleness, and
    /// the object ticks iff `frame % interval == 0`.
    pub fn should_tick(
        &mut self,
        policy: &ThrottlePolicy,
        handle: ObjectHandle,
        object: &ObjectState,
        view: &Viewpoint,
        frame: u64,
    ) -> bool {
        let dist_sq = view.distance_squared_to(object.position);

        if is_unthrottleable(object, dist_sq) {
            let record = self.record_mut(handle, frame);
            record.last_seen_frame = frame;
            record.last_ticked_frame = frame;
            record.interval = 1;
            record.skipped = 0;
            return true;
        }

        let active = object.velocity.length_squared() > ACTIVITY_SPEED_SQ || object.has_goal;

        let record = self.record_mut(handle, frame);
        record.last_seen_frame = frame;
        if active {
            record.last_active_frame = frame;
        }
        let idle = frame.saturating_sub(record.last_active_frame) > IDLE_AFTER_FRAMES;

        let interval = if dist_sq < NEAR_BAND_SQ {
            1
        } else if dist_sq < MID_BAND_SQ {
            if idle {
                policy.idle_interval.min(2)
            } else {
                1
            }
        } else if dist_sq < FAR_BAND_SQ {
            if idle {
                policy.idle_interval
            } else {
                policy.distant_interval
            }
        } else {
            policy.idle_interval
        };
        record.interval = interval;

        if interval <= 1 || frame % u64::from(interval) == 0 {
            record.last_ticked_frame = frame;
            record.skipped = 0;
            true
        } else {
            record.skipped += 1;
            false
        }
    }

    /// Removes records unseen for more than `max_idle_frames`, returning how
    /// many were evicted.
    pub fn sweep(&mut self, frame: u64, max_idle_frames: u64) -> usize {
        let mut evicted = 0;
        for slot in &mut self.records {
            if let Some(record) = slot {
                if frame.saturating_sub(record.last_seen_frame) > max_idle_frames {
                    *slot = None;
                    evicted += 1;
                }
            }
        }
        if evicted > 0 {
            log::debug!("Throttle sweep evicted {evicted} stale records");
        }
        evicted
    }
}

fn is_unthrottleable(object: &ObjectState, dist_sq: f32) -> bool {
    matches!(object.class, ObjectClass::Avatar | ObjectClass::Projectile)
        || object.attached_to_viewer
        || dist_sq < ALWAYS_TICK_DISTANCE_SQ
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::math::Vec3;

    fn view() -> Viewpoint {
        Viewpoint::new(Vec3::ZERO, Vec3::Z)
    }

    fn idle_neutral_at(distance: f32) -> ObjectState {
        ObjectState::at(ObjectClass::Neutral, Vec3::new(0.0, 0.0, distance))
    }

    /// Runs enough initial frames for the activity window to expire.
    fn settle_idle(ledger: &mut ThrottleLedger, policy: &ThrottlePolicy, object: &ObjectState) {
        for frame in 0..=IDLE_AFTER_FRAMES + 1 {
            ledger.should_tick(policy, ObjectHandle(0), object, &view(), frame);
        }
    }

    #[test]
    fn test_tick_iff_frame_divisible_by_interval() {
        let policy = ThrottlePolicy {
            idle_interval: 4,
            distant_interval: 2,
        };
        let mut ledger = ThrottleLedger::new();
        let object = idle_neutral_at(40.0); // far band, idle after settling
        settle_idle(&mut ledger, &policy, &object);

        for frame in 100..140 {
            let ticked = ledger.should_tick(&policy, ObjectHandle(0), &object, &view(), frame);
            assert_eq!(ticked, frame % 4 == 0, "frame {frame}");
        }
    }

    #[test]
    fn test_skip_count_resets_on_tick() {
        let policy = ThrottlePolicy::default();
        let mut ledger = ThrottleLedger::new();
        let object = idle_neutral_at(40.0);
        settle_idle(&mut ledger, &policy, &object);

        let mut seen_nonzero = false;
        for frame in 99..120 {
            let ticked = ledger.should_tick(&policy, ObjectHandle(0), &object, &view(), frame);
            if ticked {
                assert_eq!(ledger.skipped_frames(ObjectHandle(0)), 0);
            } else {
                assert!(ledger.skipped_frames(ObjectHandle(0)) > 0);
                seen_nonzero = true;
            }
        }
        assert!(seen_nonzero);
    }

    #[test]
    fn test_unthrottleable_objects_always_tick() {
        let policy = ThrottlePolicy::default();
        let mut ledger = ThrottleLedger::new();
        let projectile =
            ObjectState::at(ObjectClass::Projectile, Vec3::new(0.0, 0.0, 500.0));
        let near = idle_neutral_at(10.0);

        for frame in 0..50 {
            assert!(ledger.should_tick(&policy, ObjectHandle(1), &projectile, &view(), frame));
            assert!(ledger.should_tick(&policy, ObjectHandle(2), &near, &view(), frame));
        }
    }

    #[test]
    fn test_moving_object_in_mid_band_keeps_full_rate() {
        let policy = ThrottlePolicy::default();
        let mut ledger = ThrottleLedger::new();
        let mut mover = idle_neutral_at(24.0);
        mover.velocity = Vec3::new(0.5, 0.0, 0.0);

        for frame in 0..60 {
            assert!(ledger.should_tick(&policy, ObjectHandle(0), &mover, &view(), frame));
        }
        assert_eq!(ledger.interval(ObjectHandle(0)), 1);
    }

    #[test]
    fn test_goal_counts_as_activity() {
        let policy = ThrottlePolicy {
            idle_interval: 4,
            distant_interval: 2,
        };
        let mut ledger = ThrottleLedger::new();
        let mut hunter = idle_neutral_at(40.0);
        hunter.has_goal = true;
        settle_idle(&mut ledger, &policy, &hunter);
        // Active in the far band: distant interval, not the idle interval.
        assert_eq!(ledger.interval(ObjectHandle(0)), 2);
    }

    #[test]
    fn test_sweep_removes_stale_records() {
        let policy = ThrottlePolicy::default();
        let mut ledger = ThrottleLedger::new();
        let object = idle_neutral_at(40.0);
        ledger.should_tick(&policy, ObjectHandle(0), &object, &view(), 1);
        ledger.should_tick(&policy, ObjectHandle(1), &object, &view(), 250);
        assert_eq!(ledger.tracked(), 2);

        let evicted = ledger.sweep(250, 200);
        assert_eq!(evicted, 1);
        assert_eq!(ledger.tracked(), 1);
        assert!(ledger.record(ObjectHandle(0)).is_none());
        assert!(ledger.record(ObjectHandle(1)).is_some());
    }
}
