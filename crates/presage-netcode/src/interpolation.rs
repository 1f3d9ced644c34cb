//! Delayed interpolation of remote entities
//!
//! Observers never simulate. They buffer the authoritative snapshots the
//! host broadcasts and render a fixed delay in the past, so ordinary
//! arrival jitter stays inside the buffer instead of on screen. The
//! timeline is stamped with local arrival times: sender clocks are not
//! comparable across processes, arrival times are.

use std::collections::VecDeque;

use glam::{Quat, Vec3};
use presage_core::{Snapshot, Tick};
use tracing::trace;

struct Buffered<S> {
    snapshot: Snapshot<S>,
    received_at: f64,
}

/// Time-delayed snapshot interpolation for one observed entity
pub struct RemoteInterpolator<S> {
    buffer: VecDeque<Buffered<S>>,
    capacity: usize,
    delay: f64,
    teleport_threshold: f32,
}

impl<S> RemoteInterpolator<S> {
    /// Create an interpolator
    ///
    /// `delay` is how many seconds in the past to render; `capacity` bounds
    /// the snapshot buffer; gaps between consecutive snapshots wider than
    /// `teleport_threshold` are crossed by snapping instead of sliding.
    pub fn new(capacity: usize, delay: f64, teleport_threshold: f32) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
            delay,
            teleport_threshold,
        }
    }

    /// Buffer a received snapshot, stamped with the local arrival time
    ///
    /// Snapshots at or below the newest buffered tick are discarded.
    pub fn push(&mut self, snapshot: Snapshot<S>, received_at: f64) {
        if let Some(newest) = self.newest_tick() {
            if snapshot.tick <= newest {
                trace!(tick = snapshot.tick, newest, "discarding stale remote snapshot");
                return;
            }
        }
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(Buffered {
            snapshot,
            received_at,
        });
    }

    /// Pose to render at `wall_now`, or `None` while the buffer is empty
    ///
    /// Renders `delay` seconds in the past. Before the earliest buffered
    /// snapshot the earliest pose is held; past the newest, the newest.
    pub fn sample(&self, wall_now: f64) -> Option<(Vec3, Quat)> {
        let render_time = wall_now - self.delay;

        let first = self.buffer.front()?;
        let last = self.buffer.back()?;

        let (position, rotation) = if render_time <= first.received_at {
            (first.snapshot.position, first.snapshot.rotation)
        } else if render_time >= last.received_at {
            (last.snapshot.position, last.snapshot.rotation)
        } else {
            // Bracket render_time between two consecutive snapshots
            let next = self
                .buffer
                .iter()
                .position(|b| b.received_at >= render_time)
                .unwrap_or(self.buffer.len() - 1);
            let a = &self.buffer[next - 1];
            let b = &self.buffer[next];

            let span = b.received_at - a.received_at;
            let t = if span > 0.0 {
                (((render_time - a.received_at) / span) as f32).clamp(0.0, 1.0)
            } else {
                1.0
            };

            // A gap wider than the teleport threshold is a respawn or a
            // hard correction; sliding across it would look like flying
            if a.snapshot.position.distance(b.snapshot.position) > self.teleport_threshold {
                (b.snapshot.position, b.snapshot.rotation)
            } else {
                (
                    a.snapshot.position.lerp(b.snapshot.position, t),
                    a.snapshot.rotation.slerp(b.snapshot.rotation, t),
                )
            }
        };

        Some((position, rotation))
    }

    /// Newest buffered tick
    pub fn newest_tick(&self) -> Option<Tick> {
        self.buffer.back().map(|b| b.snapshot.tick)
    }

    /// Number of buffered snapshots
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing has been buffered yet
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drop all buffered snapshots
    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}
