//! Execution contexts handed down by the integrating engine
//!
//! The engine never reads process-wide state. Identity, host flag, wall
//! clock and frame delta all arrive as plain values through these contexts.

use crate::{PeerId, Tick};

/// Per-process facts: who we are and whether we are the authority
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeContext {
    /// Connection id of the local process
    pub local_peer: PeerId,
    /// Whether the local process is the authoritative host
    pub is_host: bool,
}

impl RuntimeContext {
    /// Context for the authoritative host process
    pub fn host(local_peer: PeerId) -> Self {
        Self {
            local_peer,
            is_host: true,
        }
    }

    /// Context for a connected client process
    pub fn client(local_peer: PeerId) -> Self {
        Self {
            local_peer,
            is_host: false,
        }
    }
}

/// Per-frame facts from the render loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameContext {
    /// Wall-clock seconds, monotonic within the process
    pub wall_now: f64,
    /// Seconds since the previous frame
    pub delta: f64,
}

/// Per-tick facts during simulation dispatch
///
/// `dt` is always the fixed tick interval, regardless of the frame delta
/// that released this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickContext {
    /// The tick being simulated
    pub tick: Tick,
    /// Wall-clock seconds at dispatch time
    pub wall_now: f64,
    /// Fixed simulation step in seconds
    pub dt: f32,
}
