//! Presage Core - Shared types for tick-synchronized prediction
//!
//! This crate provides the building blocks the presage engine is assembled
//! from:
//!
//! - **Ticks**: discrete logical time (`Tick`, `Stamped<T>`)
//! - **Identity**: entity and peer identifiers, controller ownership
//! - **Snapshots**: tick-stamped transform + application payload records
//! - **Simulator**: the capability handle the application implements
//! - **Clock**: fixed-step accumulator with server-tick alignment
//! - **Dispatch**: the role model and per-tick dispatch contract
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                     Coordinator (hub)                      │
//! │        frame delta ──▶ SyncClock ──▶ tick batches          │
//! └──────────────┬─────────────────────────────┬───────────────┘
//!                ▼                             ▼
//!        TickDriven::simulate        TickDriven::update_visuals
//!                │                             │
//!                ▼                             ▼
//!        Simulator::step               Simulator::present
//! ```
//!
//! The netcode crate implements controllers on top of these types; the hub
//! crate drives them. Applications only implement [`Simulator`].

mod clock;
mod context;
mod driven;
mod identity;
mod simulator;
mod snapshot;
mod tick;

pub use clock::{ClockConfig, SyncClock, SyncEvent};
pub use context::{FrameContext, RuntimeContext, TickContext};
pub use driven::{Role, TickDriven};
pub use identity::{ControllerIdentity, EntityId, PeerId};
pub use simulator::Simulator;
pub use snapshot::Snapshot;
pub use tick::{Stamped, Tick};
