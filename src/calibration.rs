//! Two-point auto-calibration engine.
//!
//! Drives the dual DAC to two known codes, reads the settled output voltage
//! of each channel back through the reference ADC, and fits a per-channel
//! `(gain, offset)` pair through the two measured points:
//!
//! ```text
//! gain   = (v_high - v_low) / (high_code - low_code)
//! offset = v_low - gain * low_code
//! ```
//!
//! Calibration is atomic-on-success: any failure along the way leaves the
//! DAC's previous calibration untouched.

use tracing::info;

use crate::adc::InterleavedAdc;
use crate::codec::LinearScale;
use crate::dac::dual::{DacChannel, DualDac};
use crate::error::{LtcError, Result};
use crate::transport::Transport;

/// Demo-board default low calibration code.
pub const CAL_LOW_CODE: u16 = 0x00FF;
/// Demo-board default high calibration code.
pub const CAL_HIGH_CODE: u16 = 0xFF00;

/// Run a two-point calibration of both DAC channels against the reference
/// ADC.
///
/// Writes `low_code` to both channels with update-immediately semantics,
/// reads back one settled sample per channel, repeats at `high_code`, then
/// stores the fitted scales and clears the DAC's uniformity flag
/// unconditionally. Two independent fits are not guaranteed numerically
/// identical, so aggregate operations must fail until the caller re-asserts
/// uniformity.
///
/// # Errors
///
/// - [`LtcError::EmptyCalibrationInterval`] if `low_code == high_code`,
///   rejected before any device traffic (the fit would divide by zero).
/// - [`LtcError::AdcReadFailure`] wrapping the cause if a readback fails;
///   the previous calibration remains in effect.
/// - Any DAC write error, propagated unchanged.
pub fn two_point_calibrate<D, A>(
    dac: &mut DualDac<D>,
    adc: &mut InterleavedAdc<A>,
    low_code: u16,
    high_code: u16,
) -> Result<()>
where
    D: Transport,
    A: Transport,
{
    if low_code == high_code {
        return Err(LtcError::EmptyCalibrationInterval(low_code));
    }

    dac.write_and_update(DacChannel::Both, low_code)?;
    let low = adc
        .read_pair()
        .map_err(|e| LtcError::AdcReadFailure(Box::new(e)))?;

    dac.write_and_update(DacChannel::Both, high_code)?;
    let high = adc
        .read_pair()
        .map_err(|e| LtcError::AdcReadFailure(Box::new(e)))?;

    let scale_a =
        LinearScale::from_two_points(low_code as u32, low.a.volts, high_code as u32, high.a.volts);
    let scale_b =
        LinearScale::from_two_points(low_code as u32, low.b.volts, high_code as u32, high.b.volts);

    dac.set_channel_calibrations(scale_a, scale_b);
    info!(
        gain_a = scale_a.gain(),
        offset_a = scale_a.offset(),
        gain_b = scale_b.gain(),
        offset_b = scale_b.offset(),
        "two-point calibration complete"
    );
    Ok(())
}
