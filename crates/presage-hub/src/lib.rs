//! Presage Hub - Scene-wide tick coordination
//!
//! One [`TickCoordinator`] per scene owns the simulation clock and drives
//! every registered controller:
//!
//! 1. Frame deltas accumulate in the clock; whole ticks are drained up to a
//!    per-frame cap.
//! 2. Each tick runs in two phases: host proxies consume queued remote
//!    inputs first, then local controllers simulate. Observers broadcast by
//!    the proxies therefore see every input dispatched in that tick.
//! 3. After the tick drain every controller runs its visual pass.
//!
//! The coordinator holds controllers weakly; dropping the last strong
//! reference to a controller removes it before the next frame.
//!
//! # Example
//!
//! ```rust,ignore
//! use presage_core::{ClockConfig, FrameContext, RuntimeContext, PeerId};
//! use presage_hub::TickCoordinator;
//!
//! let mut coordinator =
//!     TickCoordinator::new(RuntimeContext::client(PeerId(3)), ClockConfig::default());
//! coordinator.register(&controller);
//!
//! // Once per render frame
//! coordinator.update(FrameContext { wall_now, delta });
//! ```

mod coordinator;

pub use coordinator::TickCoordinator;

// Re-export what integrators need to drive a scene
pub use presage_core::{ClockConfig, FrameContext, RuntimeContext, SyncClock, TickDriven};
