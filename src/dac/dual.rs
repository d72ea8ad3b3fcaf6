//! Dual-channel calibrated 16-bit DAC driver (LTC2607 class).
//!
//! Each channel carries its own [`LinearScale`] calibration. Operations may
//! target channel A, channel B, or both at once; "both" conversions require
//! the channels to share one calibration, tracked by a uniformity flag that
//! is recomputed on every per-channel update.

use tracing::debug;

use crate::codec::LinearScale;
use crate::error::{LtcError, Result};
use crate::transport::Transport;

/// Maximum representable input code (16-bit).
pub const FULL_SCALE: u32 = 65535;

/// Typical factory gain: 5 V full-scale over 65535 codes.
pub const TYPICAL_GAIN: f64 = 7.629_510_9e-5;
/// Typical factory offset.
pub const TYPICAL_OFFSET: f64 = 0.0;

// Command nibbles, OR'd with the channel address to form the command byte.
const CMD_WRITE_INPUT: u8 = 0x00;
const CMD_UPDATE_POWER_UP: u8 = 0x10;
const CMD_WRITE_UPDATE: u8 = 0x30;
const CMD_POWER_DOWN: u8 = 0x40;

/// Channel selector for the dual DAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DacChannel {
    /// Channel A only.
    A,
    /// Channel B only.
    B,
    /// Both channels at once.
    Both,
}

impl DacChannel {
    fn address(self) -> u8 {
        match self {
            Self::A => 0x0,
            Self::B => 0x1,
            Self::Both => 0xF,
        }
    }
}

/// Driver state for one dual DAC.
///
/// Owns its transport; `&mut self` on every device operation serializes use,
/// matching the half-duplex bus underneath.
#[derive(Debug)]
pub struct DualDac<T> {
    transport: T,
    scale_a: LinearScale,
    scale_b: LinearScale,
    same_cal: bool,
}

impl<T: Transport> DualDac<T> {
    /// Create a driver with the typical factory calibration on both
    /// channels. Performs no bus traffic.
    pub fn new(transport: T) -> Self {
        let typical = LinearScale::new(TYPICAL_GAIN, TYPICAL_OFFSET);
        Self {
            transport,
            scale_a: typical,
            scale_b: typical,
            same_cal: true,
        }
    }

    fn write(&mut self, command: u8, channel: DacChannel, code: u16) -> Result<()> {
        let tx = [command | channel.address(), (code >> 8) as u8, code as u8];
        let mut rx = [0u8; 3];
        self.transport.write_read(&tx, &mut rx)?;
        debug!(command, ?channel, code, "dual dac write");
        Ok(())
    }

    /// Write `code` to the input register without updating the output.
    pub fn write_input_register(&mut self, channel: DacChannel, code: u16) -> Result<()> {
        self.write(CMD_WRITE_INPUT, channel, code)
    }

    /// Write `code` and update the output immediately (powers up the
    /// channel if it was down).
    pub fn write_and_update(&mut self, channel: DacChannel, code: u16) -> Result<()> {
        self.write(CMD_WRITE_UPDATE, channel, code)
    }

    /// Update the output from the input register, powering the channel up.
    pub fn update_power_up(&mut self, channel: DacChannel) -> Result<()> {
        self.write(CMD_UPDATE_POWER_UP, channel, 0)
    }

    /// Power the channel down.
    pub fn power_down(&mut self, channel: DacChannel) -> Result<()> {
        self.write(CMD_POWER_DOWN, channel, 0)
    }

    /// Replace the calibration of the selected channel(s).
    ///
    /// A single-channel update recomputes the uniformity flag by comparing
    /// both channels; a `Both` update sets it unconditionally.
    pub fn set_calibration(&mut self, channel: DacChannel, scale: LinearScale) {
        match channel {
            DacChannel::A => self.scale_a = scale,
            DacChannel::B => self.scale_b = scale,
            DacChannel::Both => {
                self.scale_a = scale;
                self.scale_b = scale;
                self.same_cal = true;
                return;
            }
        }
        self.same_cal = self.scale_a == self.scale_b;
    }

    /// Store independently fitted per-channel calibrations.
    ///
    /// Marks the channels non-uniform unconditionally: two independent fits
    /// are not guaranteed numerically identical even when the channels are
    /// physically matched, so aggregate conversions must fail until the
    /// caller re-asserts uniformity or queries per channel.
    pub fn set_channel_calibrations(&mut self, scale_a: LinearScale, scale_b: LinearScale) {
        self.scale_a = scale_a;
        self.scale_b = scale_b;
        self.same_cal = false;
    }

    /// Restore the typical factory calibration on both channels.
    pub fn clear_calibration(&mut self) {
        self.set_calibration(DacChannel::Both, LinearScale::new(TYPICAL_GAIN, TYPICAL_OFFSET));
    }

    /// The calibration of the selected channel(s).
    ///
    /// For `Both`, fails with [`LtcError::InconsistentChannelState`] when
    /// the channels do not share one calibration.
    pub fn calibration(&self, channel: DacChannel) -> Result<LinearScale> {
        match channel {
            DacChannel::A => Ok(self.scale_a),
            DacChannel::B => Ok(self.scale_b),
            DacChannel::Both => {
                if self.same_cal {
                    Ok(self.scale_a)
                } else {
                    Err(LtcError::InconsistentChannelState("calibration"))
                }
            }
        }
    }

    /// Whether both channels currently share one calibration.
    pub fn is_uniform(&self) -> bool {
        self.same_cal
    }

    /// Convert a code to volts using the selected channel's calibration.
    pub fn code_to_volts(&self, channel: DacChannel, code: u16) -> Result<f64> {
        Ok(self.calibration(channel)?.code_to_volts(code as u32))
    }

    /// Convert volts to the nearest achievable code for the selected
    /// channel, saturating to `[0, 65535]`.
    pub fn volts_to_code(&self, channel: DacChannel, volts: f64) -> Result<u16> {
        Ok(self.calibration(channel)?.volts_to_code(volts, FULL_SCALE) as u16)
    }

    /// Access the underlying transport (primarily for tests).
    pub fn transport(&self) -> &T {
        &self.transport
    }
}
