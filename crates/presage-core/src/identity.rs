//! Entity and peer identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a simulated entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Get the raw id value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity:{}", self.0)
    }
}

/// Identifier of a connected peer (a connection id assigned by the host)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId(pub u64);

impl PeerId {
    /// Get the raw id value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer:{}", self.0)
    }
}

/// Identity of a controller: the entity it drives and the peer that owns it
///
/// The owner is assigned once by the host and replicated to every peer. A
/// controller without an owner is dormant: it neither simulates nor sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerIdentity {
    /// Entity this controller drives
    pub entity: EntityId,
    /// Peer that controls the entity, `None` while unassigned
    pub owner: Option<PeerId>,
}

impl ControllerIdentity {
    /// Create an identity with a known owner
    pub fn new(entity: EntityId, owner: PeerId) -> Self {
        Self {
            entity,
            owner: Some(owner),
        }
    }

    /// Create an identity that has not been claimed by any peer yet
    pub fn unowned(entity: EntityId) -> Self {
        Self {
            entity,
            owner: None,
        }
    }

    /// Whether the controller has no owner assigned
    pub fn is_dormant(&self) -> bool {
        self.owner.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(EntityId(7).to_string(), "entity:7");
        assert_eq!(PeerId(3).to_string(), "peer:3");
    }

    #[test]
    fn test_dormant() {
        assert!(ControllerIdentity::unowned(EntityId(1)).is_dormant());
        assert!(!ControllerIdentity::new(EntityId(1), PeerId(2)).is_dormant());
    }
}
