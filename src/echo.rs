//! Transaction-integrity tracking for write-echoing DACs.
//!
//! The SoftSpan DAC returns, on each transfer, the word it received on the
//! previous transfer (a one-deep pipeline). Comparing each receive word
//! against the tracked word detects dropped, corrupted or misordered
//! transactions on the bus.

use crate::error::{LtcError, Result};

/// Tracks the one-deep readback pipeline of a write-echoing device.
///
/// The check is advisory: a mismatch is reported but the tracker always
/// resynchronizes to the word actually received, so a single bus glitch
/// cannot leave it permanently reporting mismatches.
#[derive(Debug, Default)]
pub struct EchoTracker {
    last: Option<u32>,
}

impl EchoTracker {
    /// Create a tracker with no history, as after a device reset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare `received` against the tracked word and record it.
    ///
    /// Returns [`LtcError::EchoMismatch`] if the words differ. The tracked
    /// word is unconditionally overwritten with `received` either way. The
    /// first call after reset has no prior word and is a vacuous match.
    pub fn check_and_record(&mut self, received: u32) -> Result<()> {
        let verdict = match self.last {
            Some(expected) if expected != received => {
                Err(LtcError::EchoMismatch { expected, received })
            }
            _ => Ok(()),
        };
        self.last = Some(received);
        verdict
    }

    /// Forget all history, as after a device reset.
    pub fn reset(&mut self) {
        self.last = None;
    }

    /// The most recently recorded word, if any transfer has happened yet.
    pub fn last(&self) -> Option<u32> {
        self.last
    }
}
