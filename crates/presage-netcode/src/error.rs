//! Error types for presage-netcode

use presage_core::PeerId;
use thiserror::Error;

/// Netcode error type
#[derive(Debug, Error)]
pub enum Error {
    /// Transport failed to send
    ///
    /// Sends are best-effort; controllers log this and continue.
    #[error("transport send failed: {0}")]
    Transport(String),

    /// A directed send named a peer the transport does not know
    #[error("unknown peer {0}")]
    UnknownPeer(PeerId),
}

/// Result type for netcode operations
pub type Result<T> = std::result::Result<T, Error>;
