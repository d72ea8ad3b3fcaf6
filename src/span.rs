//! SoftSpan output range table.
//!
//! The SoftSpan DAC selects one of five output ranges per channel. The code
//! width is fixed (full-scale 65535) and shared by all spans, so a span
//! composes directly with [`LinearScale`] via
//! `gain = (max - min) / full_scale`, `offset = min`.
//!
//! Range descriptions assume the 2.5 V internal reference; with an external
//! reference they scale proportionally.

use serde::{Deserialize, Serialize};

use crate::codec::LinearScale;
use crate::error::LtcError;

/// A selectable output range for a SoftSpan DAC channel.
///
/// The discriminants are the device's wire span codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum SoftSpan {
    /// 0 V to 5 V.
    Unipolar5V = 0x00,
    /// 0 V to 10 V.
    Unipolar10V = 0x01,
    /// -5 V to +5 V.
    Bipolar5V = 0x02,
    /// -10 V to +10 V.
    Bipolar10V = 0x03,
    /// -2.5 V to +2.5 V.
    Bipolar2V5 = 0x04,
}

impl SoftSpan {
    /// The wire span code sent to the device.
    pub fn id(self) -> u8 {
        self as u8
    }

    /// The `(min, max)` output voltage of this span.
    pub fn range(self) -> (f64, f64) {
        match self {
            Self::Unipolar5V => (0.0, 5.0),
            Self::Unipolar10V => (0.0, 10.0),
            Self::Bipolar5V => (-5.0, 5.0),
            Self::Bipolar10V => (-10.0, 10.0),
            Self::Bipolar2V5 => (-2.5, 2.5),
        }
    }

    /// The linear scale mapping codes in `[0, full_scale]` onto this span.
    pub fn scale(self, full_scale: u32) -> LinearScale {
        let (min, max) = self.range();
        LinearScale::from_span(min, max, full_scale)
    }
}

impl TryFrom<u8> for SoftSpan {
    type Error = LtcError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        match id {
            0x00 => Ok(Self::Unipolar5V),
            0x01 => Ok(Self::Unipolar10V),
            0x02 => Ok(Self::Bipolar5V),
            0x03 => Ok(Self::Bipolar10V),
            0x04 => Ok(Self::Bipolar2V5),
            other => Err(LtcError::UnknownSpan(other)),
        }
    }
}
