//! Precision conversion and calibration core for LTC multi-channel DAC/ADC
//! boards.
//!
//! This crate sits between raw device transactions and engineering units
//! (volts) for a family of multi-channel DAC and ADC peripherals:
//!
//! - a stateless linear code/volts codec and a SoftSpan range table;
//! - per-channel calibration and span state with cross-channel uniformity
//!   tracking, so "all channels" operations cannot silently miscalibrate;
//! - a two-point auto-calibration engine fitting per-channel gain/offset
//!   pairs against a reference ADC;
//! - transaction-integrity checking for a DAC whose readback echoes the
//!   previous command word on every transfer.
//!
//! Bus electrical details stay behind the [`transport::Transport`] seam; the
//! command-dispatch front end passes already-parsed numeric arguments, so
//! this crate never parses text. The model is single-threaded, synchronous
//! and blocking, with bounded polls in place of infinite waits.
//!
//! # Example
//!
//! ```rust,ignore
//! use daq_driver_ltc::{two_point_calibrate, DacChannel, DualDac, InterleavedAdc};
//!
//! let mut dac = DualDac::new(dac_transport);
//! let mut adc = InterleavedAdc::new(adc_transport, 5.0);
//!
//! // Fit per-channel gain/offset against the reference ADC.
//! two_point_calibrate(&mut dac, &mut adc, 0x00FF, 0xFF00)?;
//!
//! // Command 2.5 V on channel A using the fresh calibration.
//! let code = dac.volts_to_code(DacChannel::A, 2.5)?;
//! dac.write_and_update(DacChannel::A, code)?;
//! ```

pub mod adc;
pub mod calibration;
pub mod codec;
pub mod dac;
pub mod echo;
pub mod error;
pub mod span;
pub mod transport;

pub use adc::{AdcChannel, AdcPair, AdcSample, InterleavedAdc};
pub use calibration::{two_point_calibrate, CAL_HIGH_CODE, CAL_LOW_CODE};
pub use codec::LinearScale;
pub use dac::dual::{DacChannel, DualDac};
pub use dac::softspan::{DacSelect, SoftSpanDac};
pub use echo::EchoTracker;
pub use error::{ErrorClass, LtcError, Result};
pub use span::SoftSpan;
pub use transport::{MockTransport, Transport};
