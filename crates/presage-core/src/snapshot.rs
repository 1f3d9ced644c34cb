//! State snapshots
//!
//! A snapshot captures the transform and the application payload of an entity
//! at the end of one simulated tick. Snapshots are stored in local history on
//! the predicting client, broadcast by the host, and buffered by observers.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::Tick;

/// Entity state at the end of a specific tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot<S> {
    /// Tick this snapshot was captured at
    pub tick: Tick,
    /// Wall-clock seconds on the capturing process
    pub wall_time: f64,
    /// World position
    pub position: Vec3,
    /// World rotation
    pub rotation: Quat,
    /// Application-defined payload (velocity, grounded flag, ...)
    pub payload: S,
}

impl<S> Snapshot<S> {
    /// Distance between this snapshot's position and another's
    pub fn position_error(&self, other: &Snapshot<S>) -> f32 {
        self.position.distance(other.position)
    }

    /// Tolerance-based equality on position
    ///
    /// Snapshots compare equal when their positions are within `tolerance`
    /// world units of each other. Payload comparison is left to the
    /// application via `Simulator::payload_matches`.
    pub fn within_tolerance(&self, other: &Snapshot<S>, tolerance: f32) -> bool {
        self.position_error(other) <= tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(x: f32) -> Snapshot<()> {
        Snapshot {
            tick: 100,
            wall_time: 1.0,
            position: Vec3::new(x, 0.0, 0.0),
            rotation: Quat::IDENTITY,
            payload: (),
        }
    }

    #[test]
    fn test_position_error() {
        let a = snapshot(10.0);
        let b = snapshot(9.0);
        assert!((a.position_error(&b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_within_tolerance() {
        let a = snapshot(10.0);
        let b = snapshot(10.05);
        assert!(a.within_tolerance(&b, 0.1));
        assert!(!a.within_tolerance(&snapshot(9.0), 0.1));
    }

    #[test]
    fn test_zero_tolerance_requires_identity() {
        let a = snapshot(10.0);
        assert!(a.within_tolerance(&snapshot(10.0), 0.0));
        assert!(!a.within_tolerance(&snapshot(10.0001), 0.0));
    }
}
