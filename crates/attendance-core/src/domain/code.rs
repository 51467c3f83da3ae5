//! Verification codes and epoch-second conversions.
//!
//! A [`VerificationCode`] starts life carrying its generation instant.  When
//! the peer acknowledges it, the endpoint builds a *new* code with the same
//! value whose timestamp is the peer-assigned expiry; the original is never
//! mutated.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::protocol::messages::CodeMessage;

/// A verification code value paired with an instant.
///
/// Before transmission `timestamp` is the generation time; on an
/// acknowledged code (see [`VerificationCode::acknowledged`]) it is the
/// expiry time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VerificationCode {
    value: u64,
    timestamp: SystemTime,
}

impl VerificationCode {
    /// Creates a code generated at `timestamp`.
    pub fn new(value: u64, timestamp: SystemTime) -> Self {
        Self { value, timestamp }
    }

    /// Creates a code stamped with the current wall-clock time.
    pub fn now(value: u64) -> Self {
        Self::new(value, SystemTime::now())
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    /// Returns a new code with the same value carrying the peer's expiry.
    pub fn acknowledged(&self, valid_to: SystemTime) -> Self {
        Self::new(self.value, valid_to)
    }

    /// Builds the wire payload for this code.
    ///
    /// The wire carries whole seconds, so sub-second precision is dropped.
    pub fn to_message(&self) -> CodeMessage {
        CodeMessage {
            code: self.value,
            generation_time: to_epoch_secs(self.timestamp),
        }
    }
}

/// Converts an instant to whole seconds since the Unix epoch.
///
/// Instants before the epoch clamp to 0.
pub fn to_epoch_secs(instant: SystemTime) -> u64 {
    instant
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Converts whole seconds since the Unix epoch to an instant.
pub fn from_epoch_secs(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
