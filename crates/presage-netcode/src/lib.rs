//! Presage Netcode - Client prediction, server reconciliation, interpolation
//!
//! This crate implements the per-entity controllers of the presage engine:
//!
//! - **Prediction**: the owning client applies its inputs immediately
//! - **Reconciliation**: authoritative snapshots rewind and replay the
//!   local simulation when a prediction was wrong
//! - **Smoothing**: corrections are hidden behind a decaying visual offset
//! - **Interpolation**: observers render remote entities a fixed delay in
//!   the past
//! - **Transport**: role-filtered publish of inputs and states over any
//!   unreliable datagram transport
//!
//! # Architecture
//!
//! ```text
//!      owning client                         host
//! ┌─────────────────────┐      input   ┌──────────────────────┐
//! │ build ─▶ step ─▶ ────┼──{I, I-1}──▶│ InputQueue ─▶ step ─▶│
//! │   InputHistory      │              │        broadcast ────┼──▶ observers
//! │   StateBuffer       │◀── snapshot ─┤  (owner channel)     │   (delayed
//! │ reconcile ─▶ replay │              └──────────────────────┘    lerp)
//! └─────────────────────┘
//! ```
//!
//! Controllers are driven by the scene coordinator through the
//! [`TickDriven`](presage_core::TickDriven) contract and never talk to each
//! other directly.

mod buffers;
mod config;
mod controller;
mod error;
mod interpolation;
mod loopback;
mod smoothing;
mod transport;

pub use buffers::{InputHistory, InputQueue, StateBuffer};
pub use config::ControllerConfig;
pub use controller::{Controller, SharedWire};
pub use error::{Error, Result};
pub use interpolation::RemoteInterpolator;
pub use loopback::{Delivery, LoopbackEndpoint, LoopbackNetwork};
pub use smoothing::VisualSmoother;
pub use transport::{Packet, Route, Wire};

// Re-export the core contract for convenience
pub use presage_core::{Role, Simulator, TickDriven};
