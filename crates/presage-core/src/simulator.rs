//! The simulator capability handle
//!
//! The engine never discovers the application's movement code; the
//! integrating code wires a [`Simulator`] into each controller at
//! construction. Everything the controller needs from the application goes
//! through this one trait: input sampling, the deterministic step, payload
//! capture and restore, transform access, and the render sink.

use glam::{Quat, Vec3};

use crate::Snapshot;

/// Application-side simulation of one entity
///
/// Determinism contract: `step` must be a pure function of the current state
/// and `(input, dt)`. The engine always passes `dt` equal to the configured
/// tick interval, both during forward prediction and during replay, so a
/// replayed input sequence reproduces the original trajectory exactly.
/// Gravity, friction and any other integration must use `dt`, never a
/// real frame delta and never ambient time.
pub trait Simulator {
    /// Per-tick control input (movement vector, view angles, actions)
    type Input: Clone + Default;
    /// Application state beyond the transform (velocity, grounded flag, ...)
    type State: Clone + Default;

    /// Current simulated world position
    fn position(&self) -> Vec3;

    /// Current simulated world rotation
    fn rotation(&self) -> Quat;

    /// Overwrite the simulated position (used when applying a correction)
    fn set_position(&mut self, position: Vec3);

    /// Overwrite the simulated rotation (used when applying a correction)
    fn set_rotation(&mut self, rotation: Quat);

    /// Fill `input` with the controls sampled for the current tick
    fn build_input(&mut self, input: &mut Self::Input);

    /// Advance the simulation by exactly `dt` seconds under `input`
    fn step(&mut self, input: &Self::Input, dt: f32);

    /// Capture application state into `state`
    fn write_state(&mut self, state: &mut Self::State);

    /// Restore application state from `state`
    fn read_state(&mut self, state: &Self::State);

    /// Present the pose the entity should be rendered at this frame
    ///
    /// This is the only place render state is written. The pose may differ
    /// from the simulated transform: local controllers add the smoothing
    /// offset, observers render a delayed interpolation.
    fn present(&mut self, position: Vec3, rotation: Quat);

    /// Called once per correction, with the authoritative snapshot and the
    /// prediction it replaced
    ///
    /// The application can use this to cancel predicted side-effects such as
    /// sounds or particles. The simulation has already been rewound and
    /// replayed when this fires.
    fn on_reconcile(
        &mut self,
        _server: &Snapshot<Self::State>,
        _predicted: &Snapshot<Self::State>,
    ) {
    }

    /// Payload part of the snapshot equality predicate
    ///
    /// Position is compared by the engine against the reconciliation
    /// tolerance; implementations can veto a match on payload fields as well
    /// (a velocity threshold, a grounded flag). The default accepts.
    fn payload_matches(&self, _ours: &Self::State, _server: &Self::State) -> bool {
        true
    }
}
