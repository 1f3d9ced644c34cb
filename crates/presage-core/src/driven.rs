//! The role model and the per-tick dispatch contract
//!
//! A controller is in exactly one role at any moment, derived from the local
//! process (host or client) and the replicated owner of its entity. The
//! coordinator drives registered controllers through [`TickDriven`] without
//! knowing their input or state types.

use crate::{ControllerIdentity, EntityId, FrameContext, RuntimeContext, TickContext};

/// What a controller is responsible for on this process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// No owner assigned yet; the controller neither simulates nor sends
    Dormant,
    /// This process controls the entity and is not the host: predict
    /// locally, send inputs, reconcile against authoritative state
    LocalClient,
    /// This process is the host and controls the entity: simulate
    /// authoritatively and broadcast
    LocalHost,
    /// This process is the host but the entity is controlled elsewhere:
    /// drain the owner's input queue, simulate, broadcast
    HostProxy,
    /// This process neither hosts nor controls: buffer received states and
    /// render a delayed interpolation
    RemoteObserver,
}

impl Role {
    /// Derive the role from the process context and the replicated owner
    pub fn determine(ctx: &RuntimeContext, identity: &ControllerIdentity) -> Role {
        match identity.owner {
            None => Role::Dormant,
            Some(owner) if ctx.is_host && owner == ctx.local_peer => Role::LocalHost,
            Some(_) if ctx.is_host => Role::HostProxy,
            Some(owner) if owner == ctx.local_peer => Role::LocalClient,
            Some(_) => Role::RemoteObserver,
        }
    }

    /// Whether this role simulates from locally built inputs
    pub fn is_local(&self) -> bool {
        matches!(self, Role::LocalClient | Role::LocalHost)
    }
}

/// Per-tick dispatch contract between the coordinator and controllers
///
/// Within one tick the coordinator first lets every host proxy drain its
/// input queue, then lets every local controller simulate. After the tick
/// drain it runs the visual pass on all controllers.
pub trait TickDriven {
    /// Entity this controller drives
    fn entity(&self) -> EntityId;

    /// Current role
    fn role(&self) -> Role;

    /// Recompute the role from the replicated owner, reinitializing state
    /// on a transition
    fn refresh_role(&mut self);

    /// Host-proxy phase: consume queued remote inputs and simulate them
    fn process_input_queue(&mut self, tick: &TickContext);

    /// Local phase: build an input, simulate one step, publish
    fn simulate(&mut self, tick: &TickContext);

    /// Per-frame visual pass: interpolation for observers, offset decay for
    /// local controllers
    fn update_visuals(&mut self, frame: &FrameContext);
}
