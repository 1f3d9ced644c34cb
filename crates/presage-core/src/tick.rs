//! Logical time units
//!
//! A tick is one fixed-duration simulation step. Records that travel through
//! histories and over the wire carry the tick they belong to.

use serde::{Deserialize, Serialize};

/// A discrete tick identifier (logical time unit)
pub type Tick = u64;

/// A value stamped with the tick it was produced for
///
/// Inputs are the main user: the controller stamps each built input with the
/// tick it will be simulated at, and the stamp travels with it to the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stamped<T> {
    /// Tick this value belongs to
    pub tick: Tick,
    /// The stamped value
    pub value: T,
}

impl<T> Stamped<T> {
    /// Stamp a value with a tick
    pub fn new(tick: Tick, value: T) -> Self {
        Self { tick, value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamp() {
        let stamped = Stamped::new(42, "input");
        assert_eq!(stamped.tick, 42);
        assert_eq!(stamped.value, "input");
    }
}
