//! Visual smoothing of correction snaps
//!
//! When a reconciliation moves the simulated transform, the rendered
//! transform keeps showing the old pose and eases onto the new one. The
//! smoother owns that difference as a position/rotation offset and decays it
//! exponentially, so the rate is frame-rate independent: small errors vanish
//! within a frame or two, large ones stay visible just long enough to read
//! as motion instead of teleportation.

use glam::{Quat, Vec3};

const POSITION_EPSILON: f32 = 1e-4;
const ROTATION_EPSILON: f32 = 1e-5;

/// Decaying offset between the simulated and the rendered transform
#[derive(Debug, Clone)]
pub struct VisualSmoother {
    position_offset: Vec3,
    rotation_offset: Quat,
    smooth_time: f32,
    max_offset: f32,
}

impl VisualSmoother {
    /// Create a smoother at identity
    ///
    /// `smooth_time` is the decay time constant in seconds; corrections with
    /// a position offset longer than `max_offset` are discarded (the entity
    /// snaps instead of easing).
    pub fn new(smooth_time: f32, max_offset: f32) -> Self {
        Self {
            position_offset: Vec3::ZERO,
            rotation_offset: Quat::IDENTITY,
            smooth_time,
            max_offset,
        }
    }

    /// Load the offset left behind by a correction
    ///
    /// `position_offset` is `old visual position - new simulated position`,
    /// `rotation_offset` is `new rotation.inverse() * old visual rotation`.
    /// Oversized corrections reset to identity so the entity snaps.
    pub fn set_correction(&mut self, position_offset: Vec3, rotation_offset: Quat) {
        if position_offset.length() > self.max_offset {
            self.clear();
        } else {
            self.position_offset = position_offset;
            self.rotation_offset = rotation_offset.normalize();
        }
    }

    /// Reset to identity
    pub fn clear(&mut self) {
        self.position_offset = Vec3::ZERO;
        self.rotation_offset = Quat::IDENTITY;
    }

    /// Decay the offset toward identity over `dt` seconds
    pub fn decay(&mut self, dt: f32) {
        if self.is_identity() {
            return;
        }

        let factor = 1.0 - (-dt / self.smooth_time).exp();
        self.position_offset = self.position_offset.lerp(Vec3::ZERO, factor);
        self.rotation_offset = self.rotation_offset.lerp(Quat::IDENTITY, factor);

        if self.position_offset.length_squared() < POSITION_EPSILON * POSITION_EPSILON
            && self.rotation_offset.w.abs() > 1.0 - ROTATION_EPSILON
        {
            self.clear();
        }
    }

    /// Compose the rendered pose from a simulated pose
    pub fn apply(&self, position: Vec3, rotation: Quat) -> (Vec3, Quat) {
        (
            position + self.position_offset,
            (rotation * self.rotation_offset).normalize(),
        )
    }

    /// Current position offset
    pub fn position_offset(&self) -> Vec3 {
        self.position_offset
    }

    /// Current rotation offset
    pub fn rotation_offset(&self) -> Quat {
        self.rotation_offset
    }

    /// Whether the offset has fully decayed
    pub fn is_identity(&self) -> bool {
        self.position_offset == Vec3::ZERO && self.rotation_offset == Quat::IDENTITY
    }
}
