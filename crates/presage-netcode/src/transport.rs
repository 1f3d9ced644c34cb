//! Transport adapter
//!
//! The engine assumes nothing from the network: messages may be lost,
//! duplicated or reordered, and the controllers repair all of that with
//! tick-monotonic guards. What the transport must provide is routing: every
//! send names a filter so state can go to the owner on one logical channel
//! and to everyone else on another.
//!
//! Users implement [`Wire`] for their chosen stack (UDP, WebRTC, a relay).
//! [`LoopbackNetwork`](crate::LoopbackNetwork) is a ready-made in-process
//! implementation.

use presage_core::{EntityId, PeerId, Snapshot, Stamped};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Routing filter attached to every send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Route {
    /// Deliver to the authoritative host only
    ToHost,
    /// Deliver to one specific peer
    ToPeer(PeerId),
    /// Deliver to every connected peer except one
    Broadcast {
        /// Peer excluded from the broadcast, usually the entity's owner
        except: PeerId,
    },
}

/// A message between processes
///
/// Generic over the application's input and state payloads; the engine
/// never inspects them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Packet<I, S> {
    /// Client to host: one tick's input, with the previous tick's input
    /// attached redundantly so a single lost packet leaves no gap
    Input {
        /// Entity the input drives
        entity: EntityId,
        /// Input for the tick being reported
        input: Stamped<I>,
        /// Input of the tick before, `None` on the very first send
        previous: Option<Stamped<I>>,
    },
    /// Host to peers: the authoritative state after one processed tick
    State {
        /// Entity the snapshot describes
        entity: EntityId,
        /// Authoritative snapshot
        snapshot: Snapshot<S>,
    },
}

impl<I, S> Packet<I, S> {
    /// Entity this packet concerns
    pub fn entity(&self) -> EntityId {
        match self {
            Packet::Input { entity, .. } => *entity,
            Packet::State { entity, .. } => *entity,
        }
    }
}

/// Outbound half of the transport
///
/// Sends are fire-and-forget: implementations must not block, and the
/// engine logs failures instead of surfacing them. Delivery, ordering and
/// deduplication are all optional.
pub trait Wire<I, S> {
    /// Send one packet to the peers selected by `route`
    fn send(&mut self, route: Route, packet: Packet<I, S>) -> Result<()>;
}
