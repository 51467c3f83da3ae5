//! The heartbeat counter shared by endpoint and peer.
//!
//! Both sides keep a copy.  Each heartbeat cycle carries the endpoint's value;
//! the peer echoes its own.  When they disagree the endpoint sends a
//! correction (its value is authoritative) and the cycle still counts, so the
//! counter advances by exactly one per completed cycle.

/// Monotonically increasing heartbeat counter.
///
/// Wraps at `u64::MAX` back to 0 without panicking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeartbeatCounter {
    value: u64,
}

impl HeartbeatCounter {
    /// Creates a counter starting at 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a counter starting at `value`.
    pub fn starting_at(value: u64) -> Self {
        Self { value }
    }

    /// Returns the value to send in the current cycle.
    pub fn current(&self) -> u64 {
        self.value
    }

    /// Returns `true` when the peer's echoed value matches ours.
    pub fn agrees_with(&self, peer: u64) -> bool {
        self.value == peer
    }

    /// Completes a cycle.
    pub fn advance(&mut self) {
        self.value = self.value.wrapping_add(1);
    }
}
