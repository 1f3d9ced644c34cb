//! Fixed-step simulation clock with server alignment
//!
//! The clock turns variable frame deltas into whole simulation ticks and, on
//! clients, keeps the local tick counter a configurable lead ahead of the
//! last known server tick. The counter is monotonic: alignment may jump it
//! forward, never backward below the already-simulated range.

use serde::{Deserialize, Serialize};

use crate::Tick;

/// Clock configuration, shared by every controller in a scene
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClockConfig {
    /// Fixed simulation step in seconds
    pub tick_interval: f64,
    /// Upper bound on simulated ticks per render frame
    pub max_ticks_per_frame: u32,
    /// How many ticks a client runs ahead of the last known server tick
    pub target_tick_ahead: u64,
    /// Allowed deviation from the server tick before a hard resync
    pub max_tick_drift: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            tick_interval: 1.0 / 30.0,
            max_ticks_per_frame: 5,
            target_tick_ahead: 2,
            max_tick_drift: 30,
        }
    }
}

/// Outcome of a server tick observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    /// Stale observation, no change
    Ignored,
    /// Server tick advanced, client within the allowed window
    Advanced,
    /// First observation: the clock is now synchronized
    Synchronized,
    /// Drift exceeded the window; the counter was realigned
    Resynced,
}

/// Simulation clock state
#[derive(Debug, Clone)]
pub struct SyncClock {
    config: ClockConfig,
    current_tick: Tick,
    last_ack_tick: Tick,
    server_tick: Tick,
    synchronized: bool,
    accumulator: f64,
}

impl SyncClock {
    /// Create a clock at tick zero
    pub fn new(config: ClockConfig) -> Self {
        Self {
            config,
            current_tick: 0,
            last_ack_tick: 0,
            server_tick: 0,
            synchronized: false,
            accumulator: 0.0,
        }
    }

    /// The next tick to simulate
    pub fn current_tick(&self) -> Tick {
        self.current_tick
    }

    /// Last tick acknowledged by the authority
    pub fn last_ack_tick(&self) -> Tick {
        self.last_ack_tick
    }

    /// Newest server tick observed
    pub fn server_tick(&self) -> Tick {
        self.server_tick
    }

    /// Whether the clock has been aligned to a server tick
    ///
    /// Hosts are their own authority and never wait for alignment.
    pub fn is_synchronized(&self) -> bool {
        self.synchronized
    }

    /// Fixed simulation step in seconds
    pub fn tick_interval(&self) -> f64 {
        self.config.tick_interval
    }

    /// The clock configuration
    pub fn config(&self) -> &ClockConfig {
        &self.config
    }

    /// Record an acknowledged tick; the watermark only moves forward
    pub fn acknowledge_tick(&mut self, tick: Tick) {
        self.last_ack_tick = self.last_ack_tick.max(tick);
    }

    /// Observe a server tick and realign if needed
    ///
    /// Stale observations are ignored. The first observation snaps
    /// `current_tick` to `server + target_tick_ahead`. Afterwards the client
    /// is expected to stay within `[server, server + max_tick_drift]`;
    /// leaving that window triggers a hard resync that also drops any
    /// accumulated frame time.
    pub fn observe_server_tick(&mut self, tick: Tick) -> SyncEvent {
        if tick <= self.server_tick {
            return SyncEvent::Ignored;
        }
        self.server_tick = tick;

        if !self.synchronized {
            self.current_tick = self.server_tick + self.config.target_tick_ahead;
            self.synchronized = true;
            return SyncEvent::Synchronized;
        }

        let in_window = self.current_tick >= self.server_tick
            && self.current_tick - self.server_tick <= self.config.max_tick_drift;
        if in_window {
            SyncEvent::Advanced
        } else {
            self.current_tick = self.server_tick + self.config.target_tick_ahead;
            self.accumulator = 0.0;
            SyncEvent::Resynced
        }
    }

    /// Fold a frame delta into the accumulator and drain whole ticks
    ///
    /// Returns how many ticks to simulate this frame, at most
    /// `max_ticks_per_frame`. Time the frame budget cannot absorb is
    /// discarded rather than carried into a catch-up spiral.
    pub fn begin_frame(&mut self, frame_delta: f64) -> u32 {
        self.accumulator += frame_delta;

        let interval = self.config.tick_interval;
        let mut ticks = 0;
        while self.accumulator >= interval && ticks < self.config.max_ticks_per_frame {
            self.accumulator -= interval;
            ticks += 1;
        }

        if self.accumulator > interval * self.config.max_ticks_per_frame as f64 {
            self.accumulator = 0.0;
        }
        ticks
    }

    /// Advance to the next tick after one simulation step
    pub fn advance_tick(&mut self) {
        self.current_tick += 1;
    }

    /// Forget all alignment and accumulated time, keeping the configuration
    pub fn reset(&mut self) {
        self.current_tick = 0;
        self.last_ack_tick = 0;
        self.server_tick = 0;
        self.synchronized = false;
        self.accumulator = 0.0;
    }
}
