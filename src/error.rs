//! Error types for the driver core.
//!
//! All fallible operations in this crate return [`LtcError`]. The variants
//! fall into three classes, exposed through [`LtcError::class`]:
//!
//! - **`Logic`**: caller bugs (bad span id, empty calibration interval,
//!   out-of-range channel index). Never worth retrying.
//! - **`DeviceCommunication`**: transport failures, conversion timeouts and
//!   echo mismatches. The caller decides whether to retry; this crate never
//!   retries silently.
//! - **`StateConsistency`**: an "all channels" operation was attempted while
//!   the channels do not share one calibration or span. The caller must
//!   either target channels individually or re-homogenize them first.
//!
//! Device-communication conditions are always reported as values, never as
//! panics.

use std::time::Duration;

use thiserror::Error;

/// Convenience alias for results using the driver error type.
pub type Result<T> = std::result::Result<T, LtcError>;

/// Broad classification of an error, used for retry and reporting policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// A caller bug; fail fast, never retry.
    Logic,
    /// A bus or device failure; the caller may retry.
    DeviceCommunication,
    /// Channel state does not permit the aggregate operation.
    StateConsistency,
}

#[derive(Error, Debug)]
pub enum LtcError {
    /// A span id outside the device's span table.
    #[error("unknown span id: {0}")]
    UnknownSpan(u8),

    /// A channel index outside the device's channel range.
    #[error("channel index {0} out of range")]
    InvalidChannel(u8),

    /// Two-point calibration was requested with identical low and high codes.
    #[error("calibration interval is empty: low and high codes are both {0:#06x}")]
    EmptyCalibrationInterval(u16),

    /// The underlying transport failed to complete an exchange.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The conversion-ready poll exceeded its time budget.
    #[error("conversion not ready within {0:?}")]
    ConversionTimeout(Duration),

    /// The word echoed by the device did not match the tracked word.
    ///
    /// Advisory: the tracker has already resynchronized, so a retry of the
    /// failed write is safe.
    #[error("echo mismatch: expected {expected:#010x}, received {received:#010x}")]
    EchoMismatch {
        /// The word the tracker expected to see echoed.
        expected: u32,
        /// The word actually returned by the device.
        received: u32,
    },

    /// An ADC readback failed while a calibration run was in progress.
    ///
    /// The previous calibration is left untouched.
    #[error("ADC read failed during calibration: {0}")]
    AdcReadFailure(Box<LtcError>),

    /// An "all channels" operation found the channels in divergent state.
    #[error("channels do not share the same {0}; address channels individually")]
    InconsistentChannelState(&'static str),
}

impl LtcError {
    /// Classify this error for retry and reporting decisions.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::UnknownSpan(_) | Self::InvalidChannel(_) | Self::EmptyCalibrationInterval(_) => {
                ErrorClass::Logic
            }
            Self::Transport(_)
            | Self::ConversionTimeout(_)
            | Self::EchoMismatch { .. }
            | Self::AdcReadFailure(_) => ErrorClass::DeviceCommunication,
            Self::InconsistentChannelState(_) => ErrorClass::StateConsistency,
        }
    }
}
