//! Per-controller tuning

use serde::{Deserialize, Serialize};

/// Configuration for one controller
///
/// Everything here can differ per controller; only the tick interval is
/// scene-wide (it lives in the clock configuration).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Capacity of the input, state and remote-state histories
    pub history_size: usize,
    /// Position distance below which a prediction counts as correct
    pub reconciliation_tolerance: f32,
    /// Time constant of the visual-offset decay, in seconds
    pub error_smooth_time: f32,
    /// Corrections larger than this snap instead of smoothing, world units
    pub max_visual_offset: f32,
    /// How far in the past observers render, in seconds
    pub interpolation_delay: f64,
    /// Observer snap distance for respawns and large corrections
    pub teleport_threshold: f32,
    /// Upper bound on remote inputs a host proxy consumes per tick
    pub max_inputs_per_tick: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            history_size: 128,
            reconciliation_tolerance: 0.1,
            error_smooth_time: 0.1,
            max_visual_offset: 2.0,
            interpolation_delay: 0.1,
            teleport_threshold: 5.0,
            max_inputs_per_tick: 5,
        }
    }
}
