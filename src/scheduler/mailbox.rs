//! Single-slot latest-value mailbox for the device pose stream.
//!
//! Poses arrive once per render tick (tens of Hz) while tracking is active;
//! consumers run at much lower cadences. A keep-newest slot bounds memory
//! and guarantees consumers never work through a backlog of stale poses;
//! this is a backpressure policy, not a queue.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::core::WorldPose;

/// Keep-newest, drop-older pose slot shared between the pose producer and
/// its consumers.
#[derive(Debug, Default)]
pub struct PoseMailbox {
    slot: Mutex<Option<(WorldPose, Instant)>>,
}

impl PoseMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish the newest pose, replacing whatever was there.
    ///
    /// Called from the render-tick callback; nothing is published while
    /// tracking is lost, which is how consumers notice the loss (staleness).
    pub fn publish(&self, pose: WorldPose) {
        *self.slot.lock() = Some((pose, Instant::now()));
    }

    /// Most recent pose if it is younger than `max_age`.
    ///
    /// Non-consuming: the owner loop and the scheduler tick both read the
    /// same slot at their own cadences.
    pub fn latest(&self, max_age: Duration) -> Option<WorldPose> {
        let slot = self.slot.lock();
        match *slot {
            Some((pose, at)) if at.elapsed() <= max_age => Some(pose),
            _ => None,
        }
    }

    /// Drop any stored pose (session end).
    pub fn clear(&self) {
        *self.slot.lock() = None;
    }
}
